//! Reasoning engines
//!
//! A reasoning engine is consulted once per session. While it works it may
//! call [`Clarifier::ask`] any number of times, one question at a time, and
//! finally returns the terminal result text.
//!
//! - [`ScriptedEngine`]: fixed question list, used for demos and tests
//! - [`LlmEngine`]: business-analyst loop driven by a language model

pub mod llm;
pub mod prompts;
pub mod scripted;

pub use llm::LlmEngine;
pub use scripted::ScriptedEngine;

use crate::coordination::clarifier::Clarifier;
use crate::coordination::session::Exchange;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Everything an engine is seeded with at launch
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineInput {
    /// Background the operator supplied for the whole session
    pub static_context: String,

    /// The material to clarify (e.g. a user story)
    pub subject_material: String,

    /// Exchanges recorded before the engine was launched
    pub conversation_so_far: Vec<Exchange>,
}

impl EngineInput {
    pub fn new(static_context: impl Into<String>, subject_material: impl Into<String>) -> Self {
        Self {
            static_context: static_context.into(),
            subject_material: subject_material.into(),
            conversation_so_far: Vec::new(),
        }
    }
}

/// Multi-step decision process that may ask before concluding
#[async_trait]
pub trait ReasoningEngine: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    /// Run to completion, returning the final result text
    async fn run(&self, input: EngineInput, clarifier: Arc<dyn Clarifier>) -> Result<String>;
}
