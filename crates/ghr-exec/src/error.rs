use ghr_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("privilege reconciliation failed: {0}")]
    Privilege(String),

    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to wait for worker: {0}")]
    Wait(std::io::Error),

    #[error("signal handler setup failed: {0}")]
    Signal(std::io::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl ExecError {
    /// Process exit code reported when this error aborts the supervisor.
    pub fn exit_code(&self) -> u8 {
        match self {
            ExecError::Privilege(_) => 7,
            ExecError::Spawn { .. } => 8,
            ExecError::Wait(_) | ExecError::Signal(_) | ExecError::Io(_) => 1,
            ExecError::Core(e) => e.exit_code(),
        }
    }
}

pub type ExecResult<T> = Result<T, ExecError>;
