use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use ghr_model::{LabelSet, TargetRef, WorkerName};

use crate::CoreResult;

/// Written after a successful non-ephemeral configure; removed on deregistration.
pub const CONFIGURED_MARKER: &str = ".configured";

/// Deregistration listing polls before giving up.
const DEREGISTER_ATTEMPTS: u32 = 6;
/// Pause between deregistration listing polls.
const DEREGISTER_PAUSE: Duration = Duration::from_secs(5);

/// Validated settings for one [`crate::Controller`].
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub target: TargetRef,
    pub name: WorkerName,
    pub labels: LabelSet,
    /// Work directory handed to the worker; relative paths resolve against `install_dir`.
    pub work_dir: String,
    pub install_dir: PathBuf,
    pub ephemeral: bool,
    pub deregister_attempts: u32,
    pub deregister_pause: Duration,
}

impl ControllerConfig {
    /// Parse and validate raw settings. Every failure is a configuration error.
    pub fn new(
        repo_url: &str,
        name: &str,
        extra_labels: &str,
        work_dir: &str,
        install_dir: impl Into<PathBuf>,
        ephemeral: bool,
    ) -> CoreResult<Self> {
        let target = TargetRef::parse(repo_url)?;
        let name = WorkerName::new(name)?;
        let work_dir = match work_dir.trim() {
            "" => "_work".to_string(),
            dir => dir.to_string(),
        };

        Ok(Self {
            target,
            name,
            labels: LabelSet::with_extra(extra_labels),
            work_dir,
            install_dir: install_dir.into(),
            ephemeral,
            deregister_attempts: DEREGISTER_ATTEMPTS,
            deregister_pause: DEREGISTER_PAUSE,
        })
    }

    pub fn with_deregister_polling(mut self, attempts: u32, pause: Duration) -> Self {
        self.deregister_attempts = attempts.max(1);
        self.deregister_pause = pause;
        self
    }

    pub fn configured_marker(&self) -> PathBuf {
        self.install_dir.join(CONFIGURED_MARKER)
    }

    pub fn install_dir(&self) -> &Path {
        &self.install_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CoreError;

    #[test]
    fn validation_rejects_bad_target_and_blank_name() {
        let bad_url = ControllerConfig::new("https://control.example/", "r1", "", "", "/tmp/x", true);
        assert!(matches!(bad_url, Err(CoreError::Configuration(_))));

        let blank = ControllerConfig::new("https://control.example/o/r", "  ", "", "", "/tmp/x", true);
        assert!(matches!(blank, Err(CoreError::Configuration(_))));
    }

    #[test]
    fn defaults_are_filled_in() {
        let cfg =
            ControllerConfig::new("https://control.example/o/r", "runner-01", "gpu", " ", "/opt/w", true)
                .unwrap();
        assert_eq!(cfg.work_dir, "_work");
        assert_eq!(cfg.labels.to_delimited(), "self-hosted,linux,x64,gpu");
        assert_eq!(cfg.configured_marker(), PathBuf::from("/opt/w/.configured"));
        assert_eq!(cfg.deregister_attempts, 6);
    }
}
