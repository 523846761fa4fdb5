//! Structured logging for Parley.
//!
//! Console and rolling-file output, redaction of credentials and phone
//! numbers, and the session event record.

pub mod event_logger;
pub mod logger;
pub mod redact;

pub use event_logger::{EventLogEntry, EventLogger, SessionEvent};
pub use logger::{init_logger, LoggerOptions};
pub use redact::redact_sensitive_data;
