//! Session data model and the Session Coordinator
//!
//! The coordinator drives one conversation. Each operator message triggers
//! exactly one of:
//! - **first turn**: launch the reasoning engine and wait for its first question
//! - **later turns**: deliver the message as a reply and wait for the next
//!   question or the final result
//!
//! State machine:
//!
//! ```text
//! Uninitialized ──submit──▶ AwaitingFirstQuestion ──question──▶ AwaitingReply ⟲
//!                                   │                               │
//!                                   └──────── final result ─────────┴──▶ Terminated
//!
//! any wait that times out, fails, or breaks the protocol ──▶ Failed
//! ```

use crate::config::SessionSettings;
use crate::coordination::channel::{ClarificationChannel, EngineMessage};
use crate::coordination::clarifier::{ChannelClarifier, Clarifier};
use crate::engine::{EngineInput, ReasoningEngine};
use crate::error::{ElicitError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Unique session identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Coordinator lifecycle state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    /// No reasoning engine task running yet
    Uninitialized,

    /// Engine launched, first question not yet received
    AwaitingFirstQuestion,

    /// A question was shown to the operator
    AwaitingReply,

    /// The final result was delivered
    Terminated,

    /// A wait expired, the engine failed, or the protocol was broken
    Failed { reason: String },
}

impl SessionState {
    /// True once no further operator message can be accepted
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Terminated | SessionState::Failed { .. })
    }
}

/// What the operator sees after a turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum Response {
    Question(String),
    FinalResult(String),
}

impl Response {
    pub fn text(&self) -> &str {
        match self {
            Response::Question(text) | Response::FinalResult(text) => text,
        }
    }

    pub fn is_final(&self) -> bool {
        matches!(self, Response::FinalResult(_))
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

/// One operator turn and the response shown for it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exchange {
    pub operator_message: String,
    pub response: Response,
    pub responded_at: DateTime<Utc>,
}

impl Exchange {
    pub fn new(operator_message: impl Into<String>, response: Response) -> Self {
        Self {
            operator_message: operator_message.into(),
            response,
            responded_at: Utc::now(),
        }
    }
}

/// One conversation from startup to final result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,

    /// Background material, fixed for the session
    pub static_context: String,

    /// The material being clarified, fixed for the session
    pub subject_material: String,

    /// Ordered (operator message, displayed response) pairs
    pub history: Vec<Exchange>,

    pub state: SessionState,

    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(static_context: impl Into<String>, subject_material: impl Into<String>) -> Self {
        Self {
            id: SessionId::new(),
            static_context: static_context.into(),
            subject_material: subject_material.into(),
            history: Vec::new(),
            state: SessionState::Uninitialized,
            created_at: Utc::now(),
        }
    }

    /// Pretty JSON transcript of the session
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Wait bounds used by a coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTimeouts {
    pub first_question: Duration,
    pub reply: Duration,
    pub operator: Duration,
}

impl From<&SessionSettings> for SessionTimeouts {
    fn from(settings: &SessionSettings) -> Self {
        Self {
            first_question: settings.first_question_timeout(),
            reply: settings.reply_timeout(),
            operator: settings.operator_timeout(),
        }
    }
}

impl Default for SessionTimeouts {
    fn default() -> Self {
        Self::from(&SessionSettings::default())
    }
}

/// Drives one session between the operator and a reasoning engine
pub struct SessionCoordinator {
    session: Session,
    channel: Arc<ClarificationChannel>,
    engine: Arc<dyn ReasoningEngine>,
    timeouts: SessionTimeouts,
    engine_task: Option<JoinHandle<()>>,
}

impl SessionCoordinator {
    /// Create a session with its own fresh channel
    pub fn new(
        engine: Arc<dyn ReasoningEngine>,
        timeouts: SessionTimeouts,
        static_context: impl Into<String>,
        subject_material: impl Into<String>,
    ) -> Result<Self> {
        Self::with_channel(
            ClarificationChannel::shared(),
            engine,
            timeouts,
            static_context,
            subject_material,
        )
    }

    /// Create a session on a supplied channel
    ///
    /// Fails with a protocol violation if the channel already serves another
    /// session.
    pub fn with_channel(
        channel: Arc<ClarificationChannel>,
        engine: Arc<dyn ReasoningEngine>,
        timeouts: SessionTimeouts,
        static_context: impl Into<String>,
        subject_material: impl Into<String>,
    ) -> Result<Self> {
        let session = Session::new(static_context, subject_material);
        channel.bind(session.id.clone())?;

        info!(
            "Created session {} with engine '{}'",
            session.id,
            engine.name()
        );

        Ok(Self {
            session,
            channel,
            engine,
            timeouts,
            engine_task: None,
        })
    }

    /// Handle one operator message and return what to display
    pub async fn submit(&mut self, message: &str) -> Result<Response> {
        match self.session.state.clone() {
            SessionState::Uninitialized => self.start(message).await,
            SessionState::AwaitingReply => self.answer(message).await,
            SessionState::AwaitingFirstQuestion => Err(ElicitError::InvalidState(
                "reasoning engine already started; its first question is still pending"
                    .to_string(),
            )),
            SessionState::Terminated => Err(ElicitError::SessionTerminated),
            SessionState::Failed { reason } => Err(ElicitError::SessionFailed(reason)),
        }
    }

    /// First turn: the message only triggers engine startup
    async fn start(&mut self, message: &str) -> Result<Response> {
        self.launch_engine();
        self.transition(SessionState::AwaitingFirstQuestion);

        let outcome = self
            .channel
            .take_request_within(self.timeouts.first_question)
            .await;
        self.deliver(message, outcome)
    }

    /// Later turns: the message answers the outstanding question
    async fn answer(&mut self, message: &str) -> Result<Response> {
        // The engine may have given up (e.g. timed out waiting for us) and
        // posted a failure notice before this reply was typed
        let ledger = self.channel.ledger();
        if ledger.requests_posted > ledger.requests_taken {
            let outcome = match self.channel.take_request_within(self.timeouts.reply).await {
                Ok(EngineMessage::Failed(reason)) => Ok(EngineMessage::Failed(reason)),
                Ok(unexpected) => Err(ElicitError::ProtocolViolation(format!(
                    "engine posted a {} before receiving a reply",
                    unexpected.label()
                ))),
                Err(e) => Err(e),
            };
            return self.deliver(message, outcome);
        }

        if let Err(e) = self.channel.offer_reply(message) {
            return Err(self.fail(e));
        }

        let outcome = self.channel.take_request_within(self.timeouts.reply).await;
        self.deliver(message, outcome)
    }

    fn deliver(&mut self, message: &str, outcome: Result<EngineMessage>) -> Result<Response> {
        let response = match outcome {
            Ok(EngineMessage::Question(question)) => {
                self.transition(SessionState::AwaitingReply);
                Response::Question(question)
            }
            Ok(EngineMessage::FinalResult(result)) => {
                self.transition(SessionState::Terminated);
                Response::FinalResult(result)
            }
            Ok(EngineMessage::Failed(reason)) => {
                return Err(self.fail(ElicitError::EngineFailed(reason)));
            }
            Err(e) => return Err(self.fail(e)),
        };

        self.session
            .history
            .push(Exchange::new(message, response.clone()));
        Ok(response)
    }

    fn launch_engine(&mut self) {
        let engine = self.engine.clone();
        let channel = self.channel.clone();
        let clarifier: Arc<dyn Clarifier> = Arc::new(ChannelClarifier::new(
            channel.clone(),
            self.timeouts.operator,
        ));
        let input = EngineInput {
            static_context: self.session.static_context.clone(),
            subject_material: self.session.subject_material.clone(),
            conversation_so_far: self.session.history.clone(),
        };
        let span = info_span!("engine", session = %self.session.id, name = engine.name());

        info!("Launching reasoning engine '{}'", engine.name());
        let task = async move {
            match engine.run(input, clarifier).await {
                Ok(result) => {
                    info!("Reasoning engine finished");
                    if let Err(e) = channel.offer_request(EngineMessage::FinalResult(result)) {
                        error!("Final result rejected: {}", e);
                        channel.post_request(EngineMessage::Failed(e.to_string()));
                    }
                }
                Err(ElicitError::Cancelled(reason)) => {
                    debug!("Reasoning engine cancelled: {}", reason);
                }
                Err(e) => {
                    warn!("Reasoning engine failed: {}", e);
                    channel.post_request(EngineMessage::Failed(e.to_string()));
                }
            }
        };

        self.engine_task = Some(tokio::spawn(task.instrument(span)));
    }

    fn transition(&mut self, next: SessionState) {
        debug!(
            "Session {}: {:?} -> {:?}",
            self.session.id, self.session.state, next
        );
        self.session.state = next;
    }

    /// Mark the session failed and tear down the engine
    fn fail(&mut self, err: ElicitError) -> ElicitError {
        error!("Session {} failed: {}", self.session.id, err);
        self.transition(SessionState::Failed {
            reason: err.to_string(),
        });
        self.shutdown();
        err
    }

    /// Cancel pending waits and stop the engine task
    pub fn shutdown(&mut self) {
        self.channel.shutdown();
        if let Some(task) = self.engine_task.take() {
            if !task.is_finished() {
                debug!("Aborting reasoning engine task");
            }
            task.abort();
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.session.id
    }

    pub fn state(&self) -> &SessionState {
        &self.session.state
    }

    pub fn history(&self) -> &[Exchange] {
        &self.session.history
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn channel(&self) -> &Arc<ClarificationChannel> {
        &self.channel
    }

    pub fn is_terminated(&self) -> bool {
        self.session.state == SessionState::Terminated
    }
}

impl Drop for SessionCoordinator {
    fn drop(&mut self) {
        self.shutdown();
    }
}
