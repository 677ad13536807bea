use std::{process::ExitCode, sync::Arc};

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use ghr_api::{ApiClient, Endpoints, HttpTransport};
use ghr_core::{AssetCache, Controller, CredentialResolver};
use ghr_exec::{
    PrivilegeReconciler, RunnerScripts, Supervisor, WorkerSecurity, install_shutdown_handler,
    is_elevated,
};
use ghr_observe::{LoggerTimeZone, init_local_offset, init_logger};

mod args;
mod exit;

use args::Args;

fn main() -> ExitCode {
    let args = Args::parse();

    // Local offset detection must happen while the process is single-threaded.
    if args.log_tz == LoggerTimeZone::Local {
        init_local_offset();
    }
    if let Err(e) = init_logger(&args.logger_config()) {
        eprintln!("ghr-agentd: {e}");
        return ExitCode::from(2);
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            error!(error = %e, "failed to start runtime");
            return ExitCode::from(1);
        }
    };

    match runtime.block_on(run(args)) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            let code = exit::exit_code(&e);
            error!(error = %format!("{e:#}"), code, "agent failed");
            ExitCode::from(code)
        }
    }
}

async fn run(args: Args) -> anyhow::Result<u8> {
    info!(version = env!("CARGO_PKG_VERSION"), "ghr-agentd starting");

    // 1) validate
    let config = args.controller_config()?;
    let policy = args.retry_policy().context("invalid retry settings")?;

    // 2) signals are captured from here on
    let cancel = install_shutdown_handler()?;

    // 3) privilege reconciliation (root only)
    let identity = if is_elevated() {
        let reconciler = PrivilegeReconciler::new(&args.runner_user, &args.docker_socket);
        Some(reconciler.reconcile().await?)
    } else {
        info!("not started as root, running as the current user");
        None
    };

    // 4) credential, resolved while still privileged
    let credential = CredentialResolver::new(&args.secret_file, args.token.clone()).resolve()?;

    // 5) drop privileges
    if let Some(identity) = &identity {
        identity.own_tree(&config.install_dir)?;
        identity.apply()?;
    }

    // 6) worker release
    let transport = Arc::new(HttpTransport::new().context("building http client")?);
    let api = ApiClient::new(transport, policy);
    let cache = AssetCache::new(api.clone(), &args.release_url, &config.install_dir);
    let install_dir = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            info!("shutdown requested before registration, nothing to clean up");
            return Ok(0);
        }
        res = cache.ensure(Some(&credential)) => res?,
    };

    // 7) register, run, supervise
    let endpoints = Endpoints::new(&config.target, args.api_url.as_deref());
    let controller = Arc::new(Controller::new(config, api, endpoints, credential));

    let mut scripts = RunnerScripts::new(&install_dir).with_security(WorkerSecurity {
        no_new_privs: args.no_new_privs,
    });
    if let Some(identity) = &identity {
        scripts = scripts.with_identity(identity);
    }

    let supervisor = Supervisor::new(controller, cancel).with_grace(args.shutdown_grace());
    let outcome = supervisor.run(&scripts, scripts.run_command()).await?;
    info!(?outcome, code = outcome.exit_code(), "ghr-agentd exiting");
    Ok(outcome.exit_code())
}
