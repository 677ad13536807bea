mod domain;
pub use domain::{Credential, LabelSet, TargetRef, TargetScope, WorkerName};
pub use domain::{MANDATORY_LABELS, MASK_MARKER, PREVIEW_LEN};

mod error;
pub use error::{ModelError, ModelResult};

mod api;
pub use api::{ApiMessage, RegistrationToken, RunnerList, RunnerRecord};

mod release;
pub use release::{Fingerprint, RecordAsset, Release, ReleaseAsset, ReleaseRecord};

mod state;
pub use state::LifecycleState;

mod strategy;
pub use strategy::RetryPolicy;
