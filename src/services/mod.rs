//! Services layer for Elicit
//!
//! Provides the language model integration used by the LLM engine.

pub mod llm;

pub use llm::{Completion, LlmConfig, LlmService};
