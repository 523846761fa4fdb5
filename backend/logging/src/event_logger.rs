//! Session Event Logger
//!
//! One structured record per session transition, emitted under the
//! `session_events` target.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::redact::redact_sensitive_data;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    ChatSent {
        text: String,
    },
    ChatReplied {
        text: String,
    },
    ChatFailed {
        kind: String,
        detail: String,
    },
    ChatRejected {
        reason: String,
    },
    GenerationSubmitted {
        profile_name: String,
    },
    GenerationSucceeded {
        article_chars: usize,
        topics: usize,
    },
    GenerationFailed {
        kind: String,
        detail: String,
    },
    Superseded {
        operation: String,
    },
    Reset,
    Closed,
}

impl SessionEvent {
    fn redacted(mut self) -> Self {
        match &mut self {
            SessionEvent::ChatSent { text } | SessionEvent::ChatReplied { text } => {
                *text = redact_sensitive_data(text);
            }
            SessionEvent::ChatFailed { detail, .. } | SessionEvent::GenerationFailed { detail, .. } => {
                *detail = redact_sensitive_data(detail);
            }
            _ => {}
        }
        self
    }
}

#[derive(Debug, Serialize)]
pub struct EventLogEntry {
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    pub event: SessionEvent,
}

impl EventLogEntry {
    pub fn new(session_id: impl Into<String>, event: SessionEvent) -> Self {
        Self {
            session_id: session_id.into(),
            timestamp: Utc::now(),
            event: event.redacted(),
        }
    }
}

pub struct EventLogger;

impl EventLogger {
    /// Redact and record one session event.
    pub fn log_event(session_id: &str, event: SessionEvent) {
        let entry = EventLogEntry::new(session_id, event);
        let record = serde_json::to_string(&entry).unwrap_or_else(|_| format!("{entry:?}"));
        info!(target: "session_events", session = %entry.session_id, event = %record, "Session event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_redacts_message_text() {
        let entry = EventLogEntry::new(
            "s-1",
            SessionEvent::ChatSent {
                text: "my key is sk-abcdefghijklmnopqrstuvwx".into(),
            },
        );
        assert_eq!(
            entry.event,
            SessionEvent::ChatSent {
                text: "my key is [REDACTED_TOKEN]".into()
            }
        );
    }

    #[test]
    fn serializes_with_type_tag() {
        let entry = EventLogEntry::new(
            "s-1",
            SessionEvent::GenerationFailed {
                kind: "TIMEOUT".into(),
                detail: "request exceeded deadline".into(),
            },
        );
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["event"]["type"], "generation_failed");
        assert_eq!(value["event"]["kind"], "TIMEOUT");
        assert_eq!(value["session_id"], "s-1");
    }

    #[test]
    fn log_event_does_not_panic_without_subscriber() {
        EventLogger::log_event("s-2", SessionEvent::Reset);
    }
}
