mod config;
pub use config::{CONFIGURED_MARKER, ControllerConfig};

mod setup;
pub use setup::{ConfigureRequest, WorkerSetup};

mod controller;
pub use controller::{Controller, Registration};
