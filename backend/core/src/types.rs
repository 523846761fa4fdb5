use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::classify::ClassifiedError;
use crate::traits::CancelHandle;

/// Learner profile sent to the generation endpoint.
///
/// Validated by whoever collected it; the core treats it as opaque.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSnapshot {
    pub name: String,
    pub age: u32,
    pub profession: String,
    pub interests: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub education: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

/// A suggested follow-up reading attached to a generated article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub title: String,
    pub url: String,
}

/// Identity of one generation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A submitted profile together with the handle that can abandon it.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub id: RequestId,
    pub profile: ProfileSnapshot,
    pub submitted_at: DateTime<Utc>,
    pub cancellation: CancelHandle,
}

impl GenerationRequest {
    pub fn new(profile: ProfileSnapshot) -> Self {
        Self {
            id: RequestId::new(),
            profile,
            submitted_at: Utc::now(),
            cancellation: CancelHandle::new(),
        }
    }
}

/// Result of a generation request. `Pending` moves once, to a terminal variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    Pending,
    Succeeded { article: String, topics: Vec<Topic> },
    Failed(ClassifiedError),
}

impl GenerationOutcome {
    pub fn is_pending(&self) -> bool {
        matches!(self, GenerationOutcome::Pending)
    }

    pub fn phase(&self) -> GenerationPhase {
        match self {
            GenerationOutcome::Pending => GenerationPhase::Running,
            GenerationOutcome::Succeeded { .. } => GenerationPhase::Succeeded,
            GenerationOutcome::Failed(_) => GenerationPhase::Failed,
        }
    }
}

/// Coarse state of a generation task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationPhase {
    Idle,
    Running,
    Succeeded,
    Failed,
}

impl fmt::Display for GenerationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GenerationPhase::Idle => "idle",
            GenerationPhase::Running => "running",
            GenerationPhase::Succeeded => "succeeded",
            GenerationPhase::Failed => "failed",
        };
        f.write_str(s)
    }
}
