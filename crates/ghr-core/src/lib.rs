//! Registration lifecycle for a single ephemeral worker.
//!
//! Components, in startup order:
//! - [`CredentialResolver`]: secret file first, environment value second;
//! - [`AssetCache`]: downloads and unpacks the worker release once per upstream fingerprint;
//! - [`Controller`]: token acquisition, stale eviction, configure, and exactly-once deregistration.
mod error;
pub use error::{CoreError, CoreResult};

mod credential;
pub use credential::{CredentialResolver, TOKEN_KEY};

mod asset;
pub use asset::{ASSET_PREFIX, ASSET_SUFFIX, AssetCache, ENTRY_POINTS, FINGERPRINT_MARKER};

mod lifecycle;
pub use lifecycle::{
    CONFIGURED_MARKER, ConfigureRequest, Controller, ControllerConfig, Registration, WorkerSetup,
};
