mod log;

mod security;
pub use security::{WorkerSecurity, attach_security};
