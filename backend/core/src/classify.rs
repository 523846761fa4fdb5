//! Error classifier.
//!
//! Maps every [`RawFailure`] onto the fixed user-facing taxonomy. The mapping
//! is pure: the same failure always yields the same classification.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::RawFailure;

/// Detail attached to every timeout.
pub const TIMEOUT_DETAIL: &str = "request exceeded deadline";

/// Detail attached to every malformed 2xx response.
pub const MALFORMED_DETAIL: &str = "the server returned a response that could not be understood";

/// Hint used when a connectivity failure looks like an unreachable backend.
pub const UNREACHABLE_HINT: &str = "could not reach the server; make sure the backend is running";

/// Lower-cased fragments that identify an unreachable backend.
const UNREACHABLE_MARKERS: &[&str] = &[
    "failed to fetch",
    "empty response",
    "err_empty_response",
    "connection refused",
    "connection reset",
    "connection closed",
    "dns error",
    "tcp connect error",
];

/// User-facing failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Timeout,
    Connectivity,
    ServerMessage,
    MalformedResponse,
    Unknown,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Timeout => "TIMEOUT",
            ErrorKind::Connectivity => "CONNECTIVITY",
            ErrorKind::ServerMessage => "SERVER_MESSAGE",
            ErrorKind::MalformedResponse => "MALFORMED_RESPONSE",
            ErrorKind::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized failure, safe to render to a user.
///
/// Only [`classify`] can build one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifiedError {
    kind: ErrorKind,
    detail: String,
}

impl ClassifiedError {
    pub(crate) fn new(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }

    /// Sentence suitable for an error banner.
    pub fn user_message(&self) -> String {
        match self.kind {
            ErrorKind::Timeout => {
                "The server took too long to respond. Please wait a moment and try again."
                    .to_string()
            }
            ErrorKind::Connectivity => format!("Connection problem: {}.", self.detail),
            ErrorKind::ServerMessage => self.detail.clone(),
            ErrorKind::MalformedResponse => {
                "The server sent an unexpected response. Please try again.".to_string()
            }
            ErrorKind::Unknown => format!("Something went wrong: {}", self.detail),
        }
    }
}

impl fmt::Display for ClassifiedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.detail)
    }
}

/// Result of classifying a raw failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// A failure the user must see.
    Failed(ClassifiedError),
    /// The request was cancelled because something newer replaced it.
    Superseded,
}

impl Classification {
    pub fn into_error(self) -> Option<ClassifiedError> {
        match self {
            Classification::Failed(err) => Some(err),
            Classification::Superseded => None,
        }
    }
}

/// Classify a raw transport failure. Total over [`RawFailure`].
pub fn classify(failure: &RawFailure) -> Classification {
    let error = match failure {
        RawFailure::Cancelled => return Classification::Superseded,
        RawFailure::Timeout { .. } => ClassifiedError::new(ErrorKind::Timeout, TIMEOUT_DETAIL),
        RawFailure::Connectivity { raw } => {
            ClassifiedError::new(ErrorKind::Connectivity, connectivity_detail(raw))
        }
        RawFailure::ServerMessage {
            status_code,
            message,
            ..
        } => {
            let detail = message
                .as_deref()
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| format!("HTTP {status_code}"));
            ClassifiedError::new(ErrorKind::ServerMessage, detail)
        }
        RawFailure::MalformedResponse { .. } => {
            ClassifiedError::new(ErrorKind::MalformedResponse, MALFORMED_DETAIL)
        }
        RawFailure::Unrecognized(cause) => ClassifiedError::new(ErrorKind::Unknown, cause.clone()),
    };
    Classification::Failed(error)
}

fn connectivity_detail(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    if UNREACHABLE_MARKERS.iter().any(|m| lowered.contains(m)) {
        UNREACHABLE_HINT.to_string()
    } else if raw.trim().is_empty() {
        "network error".to_string()
    } else {
        format!("network error: {}", raw.trim())
    }
}
