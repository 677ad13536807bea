use async_trait::async_trait;
use ghr_model::{Credential, LabelSet, WorkerName};

use crate::CoreResult;

/// Arguments for the worker's one-time configure entry point.
#[derive(Debug, Clone)]
pub struct ConfigureRequest {
    pub url: String,
    pub token: Credential,
    pub name: WorkerName,
    pub work_dir: String,
    pub labels: LabelSet,
    pub ephemeral: bool,
    /// Replace any same-named registration.
    pub replace: bool,
}

/// Runs the external worker's configure step.
#[async_trait]
pub trait WorkerSetup: Send + Sync {
    async fn configure(&self, request: &ConfigureRequest) -> CoreResult<()>;
}
