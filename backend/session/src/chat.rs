//! Chat session: one request/response exchange at a time.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use parley_core::{
    classify, ApiRequest, CancelHandle, Classification, ClassifiedError, ConversationEntry,
    ConversationLog, Role, Transport,
};

/// Default deadline for one chat exchange.
pub const DEFAULT_CHAT_DEADLINE: Duration = Duration::from_secs(60);

pub const DEFAULT_CHAT_PATH: &str = "/chat";

pub const DEFAULT_CHAT_MODEL: &str = "mistral-small";

pub const DEFAULT_GREETING: &str = "Hi! I'm your AI study assistant. How can I help?";

/// Agent text used when a successful reply carries no `response`.
pub const REPLY_PLACEHOLDER: &str = "Sorry, I could not get a response.";

const APOLOGY_PREFIX: &str = "Sorry, an error occurred: ";

#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub path: String,
    pub model: String,
    pub deadline: Duration,
    pub greeting: Option<String>,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            path: DEFAULT_CHAT_PATH.to_string(),
            model: DEFAULT_CHAT_MODEL.to_string(),
            deadline: DEFAULT_CHAT_DEADLINE,
            greeting: Some(DEFAULT_GREETING.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatPhase {
    Idle,
    AwaitingReply,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    EmptyMessage,
    ReplyPending,
}

/// What happened to one `send` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Nothing was appended.
    Rejected(RejectReason),
    /// The agent reply that was appended.
    Replied(ConversationEntry),
    /// An apology entry was appended for this error.
    Failed(ClassifiedError),
    /// The exchange was abandoned; nothing was appended for it.
    Superseded,
}

#[derive(Debug, Clone)]
struct Exchange {
    id: u64,
    cancel: CancelHandle,
}

#[derive(Debug)]
struct ChatState {
    log: ConversationLog,
    phase: ChatPhase,
    in_flight: Option<Exchange>,
    exchanges: u64,
}

pub struct ChatSession {
    transport: Arc<dyn Transport>,
    settings: ChatSettings,
    state: Mutex<ChatState>,
}

impl ChatSession {
    pub fn new(transport: Arc<dyn Transport>, settings: ChatSettings) -> Self {
        let log = match settings.greeting.as_deref() {
            Some(greeting) if !greeting.trim().is_empty() => ConversationLog::with_greeting(greeting),
            _ => ConversationLog::new(),
        };
        Self {
            transport,
            settings,
            state: Mutex::new(ChatState {
                log,
                phase: ChatPhase::Idle,
                in_flight: None,
                exchanges: 0,
            }),
        }
    }

    pub fn settings(&self) -> &ChatSettings {
        &self.settings
    }

    /// Send one user message and wait for the agent's reply.
    ///
    /// Empty input and a send while another reply is pending are no-ops.
    pub async fn send(&self, text: &str) -> SendOutcome {
        let message = text.trim();
        if message.is_empty() {
            return SendOutcome::Rejected(RejectReason::EmptyMessage);
        }

        let exchange = {
            let mut state = self.state.lock().await;
            if state.phase == ChatPhase::AwaitingReply {
                debug!("Chat message rejected: reply pending");
                return SendOutcome::Rejected(RejectReason::ReplyPending);
            }
            state.log.append(Role::User, message);
            state.phase = ChatPhase::AwaitingReply;
            state.exchanges += 1;
            let exchange = Exchange {
                id: state.exchanges,
                cancel: CancelHandle::new(),
            };
            state.in_flight = Some(exchange.clone());
            exchange
        };
        info!(exchange = exchange.id, chars = message.chars().count(), "Chat message accepted");

        let request = ApiRequest::post(
            &self.settings.path,
            json!({ "message": message, "model": self.settings.model }),
        );
        let result = self
            .transport
            .execute(&request, self.settings.deadline, &exchange.cancel)
            .await;

        let mut state = self.state.lock().await;
        if state.in_flight.as_ref().map(|e| e.id) != Some(exchange.id) {
            debug!(exchange = exchange.id, "Discarding result of abandoned chat exchange");
            return SendOutcome::Superseded;
        }
        state.in_flight = None;
        state.phase = ChatPhase::Idle;

        match result {
            Ok(body) => {
                let entry = state.log.append(Role::Agent, reply_text(&body));
                info!(exchange = exchange.id, "Chat reply received");
                SendOutcome::Replied(entry)
            }
            Err(failure) => match classify(&failure) {
                Classification::Failed(error) => {
                    warn!(exchange = exchange.id, kind = %error.kind(), detail = error.detail(), "Chat exchange failed");
                    state.log.append(Role::Agent, apology(&error));
                    SendOutcome::Failed(error)
                }
                Classification::Superseded => SendOutcome::Superseded,
            },
        }
    }

    /// Cancel the pending exchange, if any. Its result will not be recorded.
    pub async fn abandon(&self) {
        let mut state = self.state.lock().await;
        if let Some(exchange) = state.in_flight.take() {
            exchange.cancel.cancel();
            state.phase = ChatPhase::Idle;
            info!(exchange = exchange.id, "Chat exchange abandoned");
        }
    }

    pub async fn phase(&self) -> ChatPhase {
        self.state.lock().await.phase
    }

    pub async fn conversation(&self) -> Vec<ConversationEntry> {
        self.state.lock().await.log.snapshot()
    }
}

fn reply_text(body: &Value) -> &str {
    body.get("response")
        .and_then(Value::as_str)
        .filter(|text| !text.trim().is_empty())
        .unwrap_or(REPLY_PLACEHOLDER)
}

fn apology(error: &ClassifiedError) -> String {
    format!("{APOLOGY_PREFIX}{}", error.detail())
}
