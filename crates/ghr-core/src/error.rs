use std::path::PathBuf;

use ghr_model::ModelError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error(
        "no credential available: secret file {} has no usable {key} entry and {key} is not set in the environment",
        .secret_file.display()
    )]
    MissingCredential { secret_file: PathBuf, key: String },

    #[error("registration token was not issued ({raw})")]
    TokenAcquisition { raw: String },

    #[error("worker release unavailable: {0}")]
    Asset(String),

    #[error("worker configure failed: {0}")]
    Configure(String),

    #[error("lifecycle error: {0}")]
    Lifecycle(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Process exit code reported when this error aborts startup.
    pub fn exit_code(&self) -> u8 {
        match self {
            CoreError::Io(_) | CoreError::Lifecycle(_) => 1,
            CoreError::Configuration(_) => 2,
            CoreError::MissingCredential { .. } => 3,
            CoreError::TokenAcquisition { .. } => 4,
            CoreError::Asset(_) => 5,
            CoreError::Configure(_) => 6,
        }
    }
}

impl From<ModelError> for CoreError {
    fn from(e: ModelError) -> Self {
        match e {
            ModelError::InvalidTransition { .. } => CoreError::Lifecycle(e.to_string()),
            other => CoreError::Configuration(other.to_string()),
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_errors_map_to_configuration() {
        let err: CoreError = ModelError::EmptyWorkerName.into();
        assert!(matches!(err, CoreError::Configuration(_)));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn missing_credential_names_both_sources() {
        let err = CoreError::MissingCredential {
            secret_file: PathBuf::from("/run/secrets/github_token"),
            key: "GITHUB_TOKEN".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("/run/secrets/github_token"));
        assert!(msg.contains("environment"));
        assert_eq!(err.exit_code(), 3);
    }
}
