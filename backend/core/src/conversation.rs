use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who authored a conversation entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Agent,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Agent => "agent",
        }
    }
}

/// One line of the conversation. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversationEntry {
    role: Role,
    text: String,
    created_at: DateTime<Utc>,
}

impl ConversationEntry {
    pub fn role(&self) -> Role {
        self.role
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Append-only, ordered conversation.
///
/// `created_at` is non-decreasing across entries even if the wall clock
/// steps backwards.
#[derive(Debug, Clone, Default)]
pub struct ConversationLog {
    entries: Vec<ConversationEntry>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A log seeded with one synthetic agent greeting.
    pub fn with_greeting(greeting: impl Into<String>) -> Self {
        let mut log = Self::new();
        log.append(Role::Agent, greeting);
        log
    }

    /// Append an entry stamped with the current time and return a copy of it.
    pub fn append(&mut self, role: Role, text: impl Into<String>) -> ConversationEntry {
        self.append_at(role, text, Utc::now())
    }

    fn append_at(
        &mut self,
        role: Role,
        text: impl Into<String>,
        now: DateTime<Utc>,
    ) -> ConversationEntry {
        let created_at = match self.entries.last() {
            Some(last) if last.created_at > now => last.created_at,
            _ => now,
        };
        let entry = ConversationEntry {
            role,
            text: text.into(),
            created_at,
        };
        self.entries.push(entry.clone());
        entry
    }

    pub fn entries(&self) -> &[ConversationEntry] {
        &self.entries
    }

    pub fn last(&self) -> Option<&ConversationEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn snapshot(&self) -> Vec<ConversationEntry> {
        self.entries.clone()
    }
}
