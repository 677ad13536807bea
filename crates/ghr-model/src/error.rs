use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid target url '{url}': {reason}")]
    InvalidTarget { url: String, reason: String },

    #[error("worker name must not be empty")]
    EmptyWorkerName,

    #[error("invalid retry policy: {0}")]
    InvalidRetry(String),

    #[error("invalid lifecycle transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
}

pub type ModelResult<T> = Result<T, ModelError>;
