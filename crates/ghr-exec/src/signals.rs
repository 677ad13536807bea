use tokio::signal::unix::{SignalKind, signal};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{ExecError, ExecResult};

/// Capture SIGTERM and SIGINT into a [`CancellationToken`].
///
/// Handlers are registered before this returns, so a signal delivered at any later point
/// is observed. The first signal cancels the token; later ones are only logged.
pub fn install_shutdown_handler() -> ExecResult<CancellationToken> {
    let mut sigterm = signal(SignalKind::terminate()).map_err(ExecError::Signal)?;
    let mut sigint = signal(SignalKind::interrupt()).map_err(ExecError::Signal)?;

    let token = CancellationToken::new();
    let trigger = token.clone();

    tokio::spawn(async move {
        let mut received = 0u32;
        loop {
            let name = tokio::select! {
                Some(()) = sigterm.recv() => "SIGTERM",
                Some(()) = sigint.recv() => "SIGINT",
                else => break,
            };
            received += 1;
            if received == 1 {
                info!(signal = name, "shutdown requested");
                trigger.cancel();
            } else {
                warn!(signal = name, received, "shutdown already in progress");
            }
        }
    });

    Ok(token)
}
