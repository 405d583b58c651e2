//! Clarification Channel between a reasoning engine and its operator
//!
//! Two independent unbounded FIFO directions:
//! - **requests**: engine → operator (questions, the final result, failure notices)
//! - **replies**: operator → engine (answers)
//!
//! The raw `post_*`/`take_*` primitives never fail on their own. The guarded
//! `offer_*` operations consult the exchange ledger and refuse posts that would
//! break the request/reply alternation.

use crate::coordination::session::SessionId;
use crate::error::{ElicitError, Result};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Payload travelling from the engine to the operator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum EngineMessage {
    /// A clarification request awaiting one reply
    Question(String),

    /// Terminal result; never followed by a reply
    FinalResult(String),

    /// The engine failed internally and will post nothing else
    Failed(String),
}

impl EngineMessage {
    pub fn text(&self) -> &str {
        match self {
            EngineMessage::Question(text)
            | EngineMessage::FinalResult(text)
            | EngineMessage::Failed(text) => text,
        }
    }

    pub(crate) fn label(&self) -> &'static str {
        match self {
            EngineMessage::Question(_) => "question",
            EngineMessage::FinalResult(_) => "final result",
            EngineMessage::Failed(_) => "failure notice",
        }
    }
}

/// Counts of posts and takes in each direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerSnapshot {
    pub requests_posted: u64,
    pub requests_taken: u64,
    pub replies_posted: u64,
    pub replies_taken: u64,
}

#[derive(Debug, Default)]
struct ExchangeLedger {
    requests_posted: AtomicU64,
    requests_taken: AtomicU64,
    replies_posted: AtomicU64,
    replies_taken: AtomicU64,
}

impl ExchangeLedger {
    fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            requests_posted: self.requests_posted.load(Ordering::SeqCst),
            requests_taken: self.requests_taken.load(Ordering::SeqCst),
            replies_posted: self.replies_posted.load(Ordering::SeqCst),
            replies_taken: self.replies_taken.load(Ordering::SeqCst),
        }
    }
}

/// Per-session hand-off between the engine task and the operator handler
///
/// Receivers sit behind async mutexes so the channel can be shared through an
/// `Arc` by both sides.
pub struct ClarificationChannel {
    request_tx: mpsc::UnboundedSender<EngineMessage>,
    request_rx: Mutex<mpsc::UnboundedReceiver<EngineMessage>>,
    reply_tx: mpsc::UnboundedSender<String>,
    reply_rx: Mutex<mpsc::UnboundedReceiver<String>>,
    ledger: ExchangeLedger,
    /// Set once a final result has been offered
    terminal: AtomicBool,
    /// Session that owns this channel
    owner: std::sync::Mutex<Option<SessionId>>,
    shutdown: CancellationToken,
}

impl ClarificationChannel {
    pub fn new() -> Self {
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (reply_tx, reply_rx) = mpsc::unbounded_channel();
        Self {
            request_tx,
            request_rx: Mutex::new(request_rx),
            reply_tx,
            reply_rx: Mutex::new(reply_rx),
            ledger: ExchangeLedger::default(),
            terminal: AtomicBool::new(false),
            owner: std::sync::Mutex::new(None),
            shutdown: CancellationToken::new(),
        }
    }

    /// Convenience constructor for sharing between tasks
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Claim this channel for a session
    ///
    /// A channel serves exactly one session; binding it a second time is a
    /// protocol violation rather than a silent cross-delivery of messages.
    pub fn bind(&self, session: SessionId) -> Result<()> {
        let mut owner = self
            .owner
            .lock()
            .map_err(|_| ElicitError::Other("channel owner lock poisoned".to_string()))?;

        match owner.as_ref() {
            Some(existing) => Err(ElicitError::ProtocolViolation(format!(
                "channel already serves session {}; session {} needs a fresh channel",
                existing, session
            ))),
            None => {
                debug!("Channel bound to session {}", session);
                *owner = Some(session);
                Ok(())
            }
        }
    }

    /// Session currently bound to this channel, if any
    pub fn bound_session(&self) -> Option<SessionId> {
        self.owner.lock().ok().and_then(|owner| owner.clone())
    }

    /// Enqueue a payload for the operator side. Never blocks.
    pub fn post_request(&self, message: EngineMessage) {
        debug!("Posting {}", message.label());
        self.ledger.requests_posted.fetch_add(1, Ordering::SeqCst);
        if self.request_tx.send(message).is_err() {
            warn!("Request slot closed, payload dropped");
        }
    }

    /// Enqueue an answer for the engine side. Never blocks.
    pub fn post_reply(&self, reply: impl Into<String>) {
        debug!("Posting reply");
        self.ledger.replies_posted.fetch_add(1, Ordering::SeqCst);
        if self.reply_tx.send(reply.into()).is_err() {
            warn!("Reply slot closed, payload dropped");
        }
    }

    /// Wait for the next engine payload, in post order
    ///
    /// Only shutdown ends the wait early. Dropping the returned future never
    /// loses a payload.
    pub async fn take_request(&self) -> Result<EngineMessage> {
        let mut rx = self.request_rx.lock().await;
        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => {
                Err(ElicitError::Cancelled("waiting for engine request".to_string()))
            }
            message = rx.recv() => {
                let message = message.ok_or_else(|| {
                    ElicitError::ChannelClosed("request slot".to_string())
                })?;
                self.ledger.requests_taken.fetch_add(1, Ordering::SeqCst);
                debug!("Took {}", message.label());
                Ok(message)
            }
        }
    }

    /// Wait for the next operator reply, in post order
    pub async fn take_reply(&self) -> Result<String> {
        let mut rx = self.reply_rx.lock().await;
        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => {
                Err(ElicitError::Cancelled("waiting for operator reply".to_string()))
            }
            reply = rx.recv() => {
                let reply = reply.ok_or_else(|| {
                    ElicitError::ChannelClosed("reply slot".to_string())
                })?;
                self.ledger.replies_taken.fetch_add(1, Ordering::SeqCst);
                debug!("Took reply");
                Ok(reply)
            }
        }
    }

    /// [`take_request`](Self::take_request) bounded by a deadline
    pub async fn take_request_within(&self, wait: Duration) -> Result<EngineMessage> {
        tokio::time::timeout(wait, self.take_request())
            .await
            .map_err(|_| ElicitError::timeout("the reasoning engine", wait))?
    }

    /// [`take_reply`](Self::take_reply) bounded by a deadline
    pub async fn take_reply_within(&self, wait: Duration) -> Result<String> {
        tokio::time::timeout(wait, self.take_reply())
            .await
            .map_err(|_| ElicitError::timeout("the operator", wait))?
    }

    /// Post a question or final result if the alternation allows it
    ///
    /// Every earlier request must have been answered and its reply consumed,
    /// and no final result may have been posted before.
    pub fn offer_request(&self, message: EngineMessage) -> Result<()> {
        if self.is_terminal() {
            return Err(ElicitError::ProtocolViolation(format!(
                "{} posted after the final result",
                message.label()
            )));
        }

        let ledger = self.ledger();
        if ledger.requests_posted != ledger.replies_taken {
            return Err(ElicitError::ProtocolViolation(format!(
                "{} posted while an earlier request is unanswered ({} posted, {} answered)",
                message.label(),
                ledger.requests_posted,
                ledger.replies_taken
            )));
        }

        if matches!(message, EngineMessage::FinalResult(_)) {
            self.terminal.store(true, Ordering::SeqCst);
        }
        self.post_request(message);
        Ok(())
    }

    /// Post a reply if exactly one consumed request is awaiting it
    pub fn offer_reply(&self, reply: impl Into<String>) -> Result<()> {
        let ledger = self.ledger();
        if ledger.requests_taken != ledger.replies_posted + 1 {
            return Err(ElicitError::ProtocolViolation(format!(
                "reply posted without a pending request ({} taken, {} replied)",
                ledger.requests_taken, ledger.replies_posted
            )));
        }
        if ledger.requests_posted != ledger.requests_taken {
            return Err(ElicitError::ProtocolViolation(format!(
                "engine posted {} extra request(s) before receiving a reply",
                ledger.requests_posted - ledger.requests_taken
            )));
        }

        self.post_reply(reply);
        Ok(())
    }

    pub fn ledger(&self) -> LedgerSnapshot {
        self.ledger.snapshot()
    }

    /// True once a final result has been offered
    pub fn is_terminal(&self) -> bool {
        self.terminal.load(Ordering::SeqCst)
    }

    /// Cancel every pending and future wait on this channel
    pub fn shutdown(&self) {
        if !self.shutdown.is_cancelled() {
            debug!("Shutting down clarification channel");
            self.shutdown.cancel();
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

impl Default for ClarificationChannel {
    fn default() -> Self {
        Self::new()
    }
}
