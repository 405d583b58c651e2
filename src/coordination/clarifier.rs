//! Engine-side capability for asking the operator a question

use crate::coordination::channel::{ClarificationChannel, EngineMessage};
use crate::error::{ElicitError, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Ask the operator a question and wait for the answer
///
/// Reasoning engines receive this as an injected capability. Calls must be
/// sequential: at most one question is outstanding at any time.
#[async_trait]
pub trait Clarifier: Send + Sync {
    async fn ask(&self, question: &str) -> Result<String>;
}

/// [`Clarifier`] backed by a session's [`ClarificationChannel`]
///
/// Each `ask` posts exactly one request and blocks on exactly one reply.
pub struct ChannelClarifier {
    channel: Arc<ClarificationChannel>,
    operator_timeout: Duration,
    in_flight: AtomicBool,
}

impl ChannelClarifier {
    pub fn new(channel: Arc<ClarificationChannel>, operator_timeout: Duration) -> Self {
        Self {
            channel,
            operator_timeout,
            in_flight: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl Clarifier for ChannelClarifier {
    async fn ask(&self, question: &str) -> Result<String> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            return Err(ElicitError::ProtocolViolation(
                "ask called while another question is outstanding".to_string(),
            ));
        }
        let _reset = InFlightReset(&self.in_flight);

        info!("Engine asks: {}", question);
        self.channel
            .offer_request(EngineMessage::Question(question.to_string()))?;

        let answer = self.channel.take_reply_within(self.operator_timeout).await?;
        debug!("Operator answered ({} chars)", answer.len());
        Ok(answer)
    }
}

/// Clears the in-flight flag even when the ask future is dropped mid-wait
struct InFlightReset<'a>(&'a AtomicBool);

impl Drop for InFlightReset<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
