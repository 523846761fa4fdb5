use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no profile has been submitted yet, nothing to regenerate")]
    NothingToRegenerate,

    #[error("could not encode profile: {0}")]
    Encode(#[from] serde_json::Error),
}
