//! Worker supervision.
//!
//! ```text
//! register ──► spawn ──► wait ─┬─ worker exits ──────────────► shutdown ─► worker's code
//!    │                         └─ cancel: SIGTERM, grace, KILL ► shutdown ─► 0
//!    └─ cancel before spawn ─────────────────────────────────► shutdown ─► 0
//! ```
//!
//! Every path ends in [`Controller::shutdown`], which deregisters at most once.
use std::{io, os::unix::process::ExitStatusExt, process::ExitStatus, sync::Arc, time::Duration};

use ghr_core::{Controller, WorkerSetup};
use ghr_model::LifecycleState;
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{ExecError, ExecResult};

/// Time the worker gets to exit after SIGTERM before it is killed.
pub const DEFAULT_GRACE: Duration = Duration::from_secs(30);

/// How a supervised run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The worker exited on its own with this code.
    Exited(i32),
    /// The worker was killed by this signal without being asked to stop.
    Signaled(i32),
    /// A shutdown was requested and carried out.
    Stopped,
}

impl Outcome {
    fn from_status(status: ExitStatus) -> Self {
        match (status.code(), status.signal()) {
            (Some(code), _) => Outcome::Exited(code),
            (None, Some(sig)) => Outcome::Signaled(sig),
            (None, None) => Outcome::Exited(1),
        }
    }

    /// Process exit code for this outcome.
    pub fn exit_code(self) -> u8 {
        match self {
            Outcome::Exited(code) => u8::try_from(code).unwrap_or(1),
            Outcome::Signaled(sig) => u8::try_from(128 + sig).unwrap_or(1),
            Outcome::Stopped => 0,
        }
    }
}

pub struct Supervisor {
    controller: Arc<Controller>,
    cancel: CancellationToken,
    grace: Duration,
}

impl Supervisor {
    pub fn new(controller: Arc<Controller>, cancel: CancellationToken) -> Self {
        Self {
            controller,
            cancel,
            grace: DEFAULT_GRACE,
        }
    }

    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    pub fn controller(&self) -> &Arc<Controller> {
        &self.controller
    }

    /// Register, launch `worker`, supervise it and clean up.
    pub async fn run(&self, setup: &dyn WorkerSetup, mut worker: Command) -> ExecResult<Outcome> {
        let registered = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                info!("shutdown requested before worker launch");
                self.controller.shutdown().await;
                return Ok(Outcome::Stopped);
            }
            res = self.controller.register(setup) => res,
        };
        match registered {
            Ok(registration) => debug!(?registration, "registration complete"),
            Err(e) => {
                error!(error = %e, "worker registration failed");
                // Once configuring has begun a registration may exist on the control plane.
                if self.controller.state() != LifecycleState::Unconfigured {
                    self.controller.shutdown().await;
                }
                return Err(e.into());
            }
        }

        // A signal that raced the end of registration still wins over launching.
        if self.cancel.is_cancelled() {
            info!("shutdown requested before worker launch");
            self.controller.shutdown().await;
            return Ok(Outcome::Stopped);
        }

        worker.process_group(0).kill_on_drop(true);
        let program = format!("{:?}", worker.as_std().get_program());
        let mut child = match worker.spawn() {
            Ok(child) => child,
            Err(source) => {
                error!(%program, error = %source, "worker spawn failed");
                self.controller.shutdown().await;
                return Err(ExecError::Spawn { program, source });
            }
        };
        if let Err(e) = self.controller.mark_running() {
            warn!(error = %e, "unexpected lifecycle state at launch");
        }
        info!(pid = ?child.id(), %program, "worker started");

        let outcome = tokio::select! {
            biased;
            res = child.wait() => match res {
                Ok(status) => {
                    let outcome = Outcome::from_status(status);
                    info!(%status, ?outcome, "worker exited");
                    Ok(outcome)
                }
                Err(e) => {
                    error!(error = %e, "waiting for worker failed");
                    Err(ExecError::Wait(e))
                }
            },
            _ = self.cancel.cancelled() => Ok(stop_worker(&mut child, self.grace).await),
        };

        self.controller.shutdown().await;
        outcome
    }
}

/// SIGTERM the worker's process group, then SIGKILL once the grace period is over.
///
/// A worker that had already exited when the stop arrived keeps its own status.
async fn stop_worker(child: &mut Child, grace: Duration) -> Outcome {
    match child.try_wait() {
        Ok(Some(status)) => {
            let outcome = Outcome::from_status(status);
            info!(%status, ?outcome, "worker exited before shutdown was forwarded");
            return outcome;
        }
        Ok(None) => {}
        Err(e) => debug!(error = %e, "worker status check failed"),
    }
    let Some(pid) = child.id() else {
        debug!("worker already reaped");
        return Outcome::Stopped;
    };

    info!(pid, grace_secs = grace.as_secs_f64(), "forwarding SIGTERM to worker");
    if let Err(e) = signal_group(pid, libc::SIGTERM) {
        warn!(pid, error = %e, "SIGTERM delivery failed");
    }

    match tokio::time::timeout(grace, child.wait()).await {
        Ok(Ok(status)) => info!(%status, "worker stopped"),
        Ok(Err(e)) => warn!(error = %e, "waiting for worker failed"),
        Err(_) => {
            warn!(pid, "grace period elapsed, killing worker");
            if let Err(e) = signal_group(pid, libc::SIGKILL) {
                debug!(pid, error = %e, "group SIGKILL failed");
            }
            match child.kill().await {
                Ok(()) => info!("worker killed"),
                Err(e) => warn!(error = %e, "failed to kill worker"),
            }
        }
    }
    Outcome::Stopped
}

/// The worker leads its own process group, so `-pid` reaches its descendants too.
fn signal_group(pid: u32, sig: libc::c_int) -> io::Result<()> {
    let pgid = libc::pid_t::try_from(pid).map_err(|_| io::Error::from(io::ErrorKind::InvalidInput))?;
    // SAFETY: kill has no memory preconditions.
    if unsafe { libc::kill(-pgid, sig) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}
