//! Logging bootstrap for the runner agent.
//!
//! One call to [`init_logger`] installs the global `tracing` subscriber; everything else in the
//! workspace only uses `tracing` macros.
mod clock;
mod config;
mod error;
mod format;
mod install;
mod level;

pub use clock::{LogClock, LoggerTimeZone, init_local_offset};
pub use config::LoggerConfig;
pub use error::{LoggerError, LoggerResult};
pub use format::LoggerFormat;
pub use level::LoggerLevel;

/// Install the global subscriber described by `cfg`.
///
/// When `cfg.tz` is [`LoggerTimeZone::Local`], call [`init_local_offset`] first, while the
/// process is still single-threaded.
pub fn init_logger(cfg: &LoggerConfig) -> LoggerResult<()> {
    match cfg.format {
        LoggerFormat::Text => install::text(cfg),
        LoggerFormat::Json => install::json(cfg),
        LoggerFormat::Journald => install::journald(cfg),
    }
}
