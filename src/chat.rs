//! Chat Client
//!
//! Session-scoped chat state machine.
//!
//! # State Machine
//!
//! ```text
//! Idle ──submit(text)──▶ Sending ──settle(Ok)──▶ Idle   (assistant turn, "ready")
//!                           └──────settle(Err)──▶ Idle   (error turn, "connection error")
//! ```
//!
//! There is no terminal error state: every failure lands back in `Idle` so
//! the user can retry. `Sending` doubles as the input lock, so a second
//! submission while a request is in flight is rejected, not queued.
//!
//! Transitions are plain methods that mutate state; effects (the HTTP call,
//! the fire-and-forget reset) are performed by the async helpers or by the
//! caller. Rendering reads [`ChatClient::view`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::{AssistantApi, ChatReply, ChatRequest};
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::session::SessionManager;
use crate::view::ChatView;

pub const WELCOME_MESSAGE: &str = "¡Hola! Soy GROZY, tu asistente de compras. \
Puedo buscar productos, armar un carro según tu dieta y presupuesto, \
y validar tus listas. ¿En qué te ayudo?";

pub const STATUS_READY: &str = "ready";
pub const STATUS_CONNECTION_ERROR: &str = "connection error";
pub const STATUS_CONNECTED: &str = "connected";
pub const STATUS_DISCONNECTED: &str = "disconnected";
pub const STATUS_SENDING: &str = "sending";
pub const STATUS_RESET: &str = "conversation reset";

/// Who wrote a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// One message in the visible transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub id: Uuid,
    pub role: Role,
    pub text: String,
    pub rendered_at: DateTime<Utc>,
    /// Agent latency reported by the backend, seconds
    pub latency: Option<f64>,
    pub tools_used: Vec<String>,
    /// Synthetic turn carrying a client-side diagnostic
    pub is_error: bool,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text.into())
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text.into())
    }

    fn new(role: Role, text: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            text,
            rendered_at: Utc::now(),
            latency: None,
            tools_used: Vec::new(),
            is_error: false,
        }
    }

    fn from_reply(reply: ChatReply) -> Self {
        Self {
            latency: reply.latency,
            tools_used: reply.tools_used,
            ..Self::assistant(reply.response)
        }
    }

    fn diagnostic(text: String) -> Self {
        Self {
            is_error: true,
            ..Self::assistant(text)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChatState {
    #[default]
    Idle,
    /// A request is in flight; input is locked and the typing placeholder shows
    Sending,
}

impl std::fmt::Display for ChatState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatState::Idle => write!(f, "idle"),
            ChatState::Sending => write!(f, "sending"),
        }
    }
}

/// Result of the startup health probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connection {
    #[default]
    Unknown,
    Connected,
    Disconnected,
}

/// Status line under the chat. Transient messages revert to "ready".
#[derive(Debug, Clone, PartialEq)]
pub struct StatusLine {
    pub text: String,
    revert_at: Option<Instant>,
}

impl StatusLine {
    fn steady(text: &str) -> Self {
        Self {
            text: text.to_string(),
            revert_at: None,
        }
    }

    fn transient(text: &str, revert_at: Instant) -> Self {
        Self {
            text: text.to_string(),
            revert_at: Some(revert_at),
        }
    }

    pub fn is_transient(&self) -> bool {
        self.revert_at.is_some()
    }
}

/// The chat client: transcript, input lock, status and session
#[derive(Debug)]
pub struct ChatClient {
    session: SessionManager,
    transcript: Vec<ChatTurn>,
    state: ChatState,
    input: String,
    status: StatusLine,
    connection: Connection,
    awaiting_reset_confirmation: bool,
    status_revert: Duration,
    backend_url: String,
}

impl ChatClient {
    pub fn new(session: SessionManager, config: &ClientConfig) -> Self {
        Self::with_welcome(session, config, WELCOME_MESSAGE)
    }

    pub fn with_welcome(
        session: SessionManager,
        config: &ClientConfig,
        welcome: impl Into<String>,
    ) -> Self {
        Self {
            session,
            transcript: vec![ChatTurn::assistant(welcome)],
            state: ChatState::Idle,
            input: String::new(),
            status: StatusLine::steady(STATUS_READY),
            connection: Connection::Unknown,
            awaiting_reset_confirmation: false,
            status_revert: config.status_revert,
            backend_url: config.base_url.clone(),
        }
    }

    pub fn state(&self) -> ChatState {
        self.state
    }

    pub fn transcript(&self) -> &[ChatTurn] {
        &self.transcript
    }

    pub fn session_id(&self) -> &str {
        self.session.current()
    }

    pub fn status(&self) -> &StatusLine {
        &self.status
    }

    pub fn connection(&self) -> Connection {
        self.connection
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    pub fn awaiting_reset_confirmation(&self) -> bool {
        self.awaiting_reset_confirmation
    }

    /// Accept a user message. Returns the request to send, or `None` when
    /// the text is blank or a request is already in flight.
    pub fn submit(&mut self, text: &str) -> Option<ChatRequest> {
        let message = text.trim();
        if message.is_empty() || self.state == ChatState::Sending {
            tracing::debug!(state = %self.state, "Submission rejected");
            return None;
        }

        self.transcript.push(ChatTurn::user(message));
        self.input.clear();
        self.state = ChatState::Sending;
        self.status = StatusLine::steady(STATUS_SENDING);

        Some(ChatRequest {
            message: message.to_string(),
            session_id: self.session.current().to_string(),
        })
    }

    /// Submit whatever is in the input buffer
    pub fn submit_input(&mut self) -> Option<ChatRequest> {
        let text = std::mem::take(&mut self.input);
        let request = self.submit(&text);
        if request.is_none() {
            self.input = text;
        }
        request
    }

    /// Apply the outcome of the in-flight request. Ignored when idle.
    pub fn settle(&mut self, outcome: Result<ChatReply>) {
        if self.state != ChatState::Sending {
            tracing::warn!("Chat reply arrived with no request in flight, ignoring");
            return;
        }

        match outcome {
            Ok(reply) => {
                tracing::debug!(
                    latency = ?reply.latency,
                    tools = ?reply.tools_used,
                    "Assistant replied"
                );
                self.transcript.push(ChatTurn::from_reply(reply));
                self.status = StatusLine::steady(STATUS_READY);
            }
            Err(err) => {
                tracing::warn!("Chat request failed: {}", err);
                self.transcript
                    .push(ChatTurn::diagnostic(chat_failure_text(&err)));
                self.status = StatusLine::steady(STATUS_CONNECTION_ERROR);
            }
        }
        self.state = ChatState::Idle;
    }

    /// Submit `text` and wait for the backend. Returns `false` if the
    /// submission was rejected.
    pub async fn send(&mut self, api: &dyn AssistantApi, text: &str) -> bool {
        let Some(request) = self.submit(text) else {
            return false;
        };
        let outcome = api.chat(&request).await;
        self.settle(outcome);
        true
    }

    /// First step of a reset: ask for confirmation. Refused while sending,
    /// so an in-flight reply can't land in the new conversation.
    pub fn request_reset(&mut self) -> bool {
        if self.state == ChatState::Sending {
            return false;
        }
        self.awaiting_reset_confirmation = true;
        true
    }

    pub fn cancel_reset(&mut self) {
        self.awaiting_reset_confirmation = false;
    }

    /// Confirmed reset: rotate the session id, keep only the welcome turn
    /// and show a transient status. Returns the old session id, which the
    /// caller should pass to the backend reset endpoint.
    pub fn confirm_reset(&mut self, now: Instant) -> Option<String> {
        if !self.awaiting_reset_confirmation || self.state == ChatState::Sending {
            return None;
        }
        self.awaiting_reset_confirmation = false;

        let old_id = self.session.current().to_string();
        self.session.reset();
        self.transcript.truncate(1);
        self.status = StatusLine::transient(STATUS_RESET, now + self.status_revert);
        tracing::info!(old_session = %old_id, "Conversation reset");
        Some(old_id)
    }

    /// Confirmed reset plus the backend call, fired in the background.
    /// The UI does not wait for the backend; failures are only logged.
    pub fn confirm_reset_with(&mut self, api: Arc<dyn AssistantApi>, now: Instant) -> bool {
        match self.confirm_reset(now) {
            Some(old_id) => {
                spawn_backend_reset(api, old_id);
                true
            }
            None => false,
        }
    }

    /// Revert an expired transient status to "ready"
    pub fn tick(&mut self, now: Instant) {
        if matches!(self.status.revert_at, Some(at) if now >= at) {
            self.status = StatusLine::steady(STATUS_READY);
        }
    }

    /// Apply the startup health probe. Earlier turns are never rewritten,
    /// and nothing lands between a pending user turn and its reply.
    pub fn apply_probe(&mut self, outcome: Result<()>) {
        match outcome {
            Ok(()) => {
                tracing::info!("Backend reachable at {}", self.backend_url);
                self.connection = Connection::Connected;
                if self.state == ChatState::Idle {
                    self.status = StatusLine::steady(STATUS_CONNECTED);
                }
            }
            Err(err) => {
                tracing::warn!("Backend health probe failed: {}", err);
                self.connection = Connection::Disconnected;
                if self.state == ChatState::Idle {
                    self.status = StatusLine::steady(STATUS_DISCONNECTED);
                    self.transcript
                        .push(ChatTurn::diagnostic(startup_instructions(&self.backend_url)));
                }
            }
        }
    }

    pub async fn probe(&mut self, api: &dyn AssistantApi) {
        let outcome = api.health().await;
        self.apply_probe(outcome);
    }

    /// Pure projection for rendering
    pub fn view(&self) -> ChatView {
        ChatView::project(self)
    }
}

/// Call the backend reset endpoint without blocking the caller
pub fn spawn_backend_reset(api: Arc<dyn AssistantApi>, session_id: String) {
    tokio::spawn(async move {
        match api.reset_session(&session_id).await {
            Ok(()) => tracing::debug!(session = %session_id, "Backend session reset"),
            Err(err) => tracing::warn!(session = %session_id, "Backend reset failed: {}", err),
        }
    });
}

fn chat_failure_text(err: &ClientError) -> String {
    format!("⚠️ Connection error. {}", err.diagnostic())
}

fn startup_instructions(backend_url: &str) -> String {
    format!(
        "⚠️ Could not connect to the GROZY backend at {backend_url}.\n\
         To start it:\n\
         • Activate the backend's Python environment\n\
         • Run: python grozy_api.py\n\
         • Make sure it listens on {backend_url}, or set GROZY_API_URL"
    )
}
