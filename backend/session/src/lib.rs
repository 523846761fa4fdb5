pub mod chat;
pub mod error;
pub mod facade;
pub mod generation;

pub use chat::{ChatPhase, ChatSession, ChatSettings, RejectReason, SendOutcome, REPLY_PLACEHOLDER};
pub use error::SessionError;
pub use facade::{Session, SessionSettings};
pub use generation::{
    parse_article, GenerationSettings, GenerationSnapshot, GenerationTask, SubmitReport,
};
