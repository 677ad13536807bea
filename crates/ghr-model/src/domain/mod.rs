mod target;
pub use target::{TargetRef, TargetScope};

mod credential;
pub use credential::{Credential, MASK_MARKER, PREVIEW_LEN};

mod identity;
pub use identity::WorkerName;

mod labels;
pub use labels::{LabelSet, MANDATORY_LABELS};
