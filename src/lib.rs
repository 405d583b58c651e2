//! Elicit - Human-in-the-Loop Clarification for Reasoning Agents
//!
//! Lets a long-running reasoning engine pause mid-execution to ask a human
//! operator a question, then resume once the operator answers:
//! - Per-session clarification channel with bounded, cancellable waits
//! - Session coordinator with an explicit state machine
//! - Pluggable reasoning engines (scripted, LLM-backed)
//!
//! # Architecture
//!
//! - **Coordination**: channel, engine-side clarifier, session coordinator
//! - **Engine**: the reasoning engine contract and its implementations
//! - **Services**: LLM client
//! - **Config**: TOML/environment configuration
//!
//! # Example
//!
//! ```ignore
//! use elicit_core::{ScriptedEngine, SessionCoordinator, SessionTimeouts};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> elicit_core::Result<()> {
//!     let engine = Arc::new(ScriptedEngine::new(["Who initiates enrollment?"]));
//!     let mut session = SessionCoordinator::new(
//!         engine,
//!         SessionTimeouts::default(),
//!         "The enrollment system is a web application.",
//!         "As a faculty member, I want students to enroll with their offer.",
//!     )?;
//!
//!     let question = session.submit("hi").await?;
//!     let result = session.submit("The student, using the offer reference.").await?;
//!     assert!(result.is_final());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod coordination;
pub mod engine;
pub mod error;
pub mod services;

// Re-export commonly used types
pub use config::ElicitConfig;
pub use coordination::{
    ChannelClarifier, ClarificationChannel, Clarifier, EngineMessage, Exchange, Response,
    Session, SessionCoordinator, SessionId, SessionState, SessionTimeouts,
};
pub use engine::{EngineInput, LlmEngine, ReasoningEngine, ScriptedEngine};
pub use error::{ElicitError, Result};
pub use services::{Completion, LlmConfig, LlmService};
