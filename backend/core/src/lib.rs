pub mod classify;
pub mod conversation;
pub mod error;
pub mod traits;
pub mod types;

pub use classify::{classify, Classification, ClassifiedError, ErrorKind};
pub use conversation::{ConversationEntry, ConversationLog, Role};
pub use error::{ParleyError, RawFailure};
pub use traits::{ApiRequest, CancelHandle, Credential, HttpMethod, Transport};
pub use types::{
    GenerationOutcome, GenerationPhase, GenerationRequest, ProfileSnapshot, RequestId, Topic,
};
