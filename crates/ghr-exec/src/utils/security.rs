//! Hardening applied to the worker process inside a `pre_exec` hook.
//!
//! `no_new_privs` keeps the worker and everything it starts from gaining privilege through
//! set-user-ID binaries or file capabilities. It needs no privilege to set, so a failure
//! aborts the spawn.
use tokio::process::Command;

/// Opt-in hardening knobs for the worker.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkerSecurity {
    /// Set `PR_SET_NO_NEW_PRIVS` in the child before exec.
    pub no_new_privs: bool,
}

impl WorkerSecurity {
    #[inline]
    pub fn is_empty(&self) -> bool {
        !self.no_new_privs
    }
}

pub fn attach_security(cmd: &mut Command, security: WorkerSecurity) {
    if security.is_empty() {
        return;
    }

    #[cfg(target_os = "linux")]
    linux_impl::attach(cmd, security);

    #[cfg(not(target_os = "linux"))]
    tracing::warn!(
        ?security,
        os = std::env::consts::OS,
        "worker hardening is only enforced on Linux; ignoring"
    );
}

#[cfg(target_os = "linux")]
mod linux_impl {
    use std::io;

    use tokio::process::Command;

    use super::WorkerSecurity;
    use crate::utils::log::{pre_exec_log, pre_exec_log_errno};

    const PR_SET_NO_NEW_PRIVS: libc::c_int = 38;

    pub fn attach(cmd: &mut Command, security: WorkerSecurity) {
        // SAFETY: the hook only calls async-signal-safe libc functions.
        unsafe {
            cmd.pre_exec(move || {
                if security.no_new_privs {
                    let rc = libc::prctl(PR_SET_NO_NEW_PRIVS, 1, 0, 0, 0);
                    if rc != 0 {
                        let err = io::Error::last_os_error();
                        pre_exec_log(b"ghr-exec: failed to set no_new_privs: ");
                        pre_exec_log_errno(err.raw_os_error().unwrap_or(0));
                        return Err(err);
                    }
                }
                Ok(())
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_noop() {
        let security = WorkerSecurity::default();
        assert!(security.is_empty());

        let mut cmd = Command::new("true");
        attach_security(&mut cmd, security);
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn no_new_privs_is_visible_in_child() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "grep -q '^NoNewPrivs:[[:space:]]*1' /proc/self/status"]);
        attach_security(&mut cmd, WorkerSecurity { no_new_privs: true });

        let status = cmd.status().await.unwrap();
        assert!(status.success());
    }
}
