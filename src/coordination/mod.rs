//! Coordination between a reasoning engine and a human operator
//!
//! The engine runs as its own task and pauses whenever it needs an answer:
//! 1. Engine posts a question on the session's channel and waits for a reply
//! 2. Coordinator takes the question and shows it to the operator
//! 3. Operator submits an answer; coordinator posts it as the reply
//! 4. Engine resumes, then posts its next question or the final result

pub mod channel;
pub mod clarifier;
pub mod session;

pub use channel::{ClarificationChannel, EngineMessage, LedgerSnapshot};
pub use clarifier::{ChannelClarifier, Clarifier};
pub use session::{
    Exchange, Response, Session, SessionCoordinator, SessionId, SessionState, SessionTimeouts,
};
