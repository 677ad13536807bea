//! The worker's own entry points.
use std::{
    path::{Path, PathBuf},
    process::Stdio,
};

use async_trait::async_trait;
use ghr_core::{ConfigureRequest, CoreError, CoreResult, WorkerSetup};
use ghr_model::Credential;
use tokio::process::Command;
use tracing::{info, instrument};

use crate::{RuntimeIdentity, WorkerSecurity, attach_security};

pub const CONFIGURE_SCRIPT: &str = "config.sh";
pub const RUN_SCRIPT: &str = "run.sh";

/// Variables the supervisor's environment must not leak into the worker.
const SCRUBBED_ENV: &[&str] = &["RUNNER_ALLOW_RUNASROOT", "GITHUB_TOKEN"];

/// Builds commands for the unpacked worker scripts.
#[derive(Debug, Clone)]
pub struct RunnerScripts {
    install_dir: PathBuf,
    env: Vec<(String, String)>,
    security: WorkerSecurity,
}

impl RunnerScripts {
    pub fn new(install_dir: impl Into<PathBuf>) -> Self {
        Self {
            install_dir: install_dir.into(),
            env: Vec::new(),
            security: WorkerSecurity::default(),
        }
    }

    pub fn with_identity(mut self, identity: &RuntimeIdentity) -> Self {
        self.env.extend(identity.env());
        self
    }

    pub fn with_security(mut self, security: WorkerSecurity) -> Self {
        self.security = security;
        self
    }

    pub fn install_dir(&self) -> &Path {
        &self.install_dir
    }

    /// Arguments for the configure entry point, token included.
    pub fn configure_args(request: &ConfigureRequest) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "--unattended".into(),
            "--url".into(),
            request.url.clone(),
            "--token".into(),
            request.token.expose().to_string(),
            "--name".into(),
            request.name.to_string(),
            "--work".into(),
            request.work_dir.clone(),
            "--labels".into(),
            request.labels.to_delimited(),
        ];
        if request.replace {
            args.push("--replace".into());
        }
        if request.ephemeral {
            args.push("--ephemeral".into());
        }
        args
    }

    /// The long-running worker command. No token is passed.
    pub fn run_command(&self) -> Command {
        self.command(RUN_SCRIPT)
    }

    fn command(&self, script: &str) -> Command {
        let mut cmd = Command::new(self.install_dir.join(script));
        cmd.current_dir(&self.install_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        for key in SCRUBBED_ENV {
            cmd.env_remove(key);
        }
        cmd.envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        attach_security(&mut cmd, self.security);
        cmd
    }
}

/// Command line with the token value replaced by a masked preview.
fn masked(args: &[String]) -> String {
    let mut out = Vec::with_capacity(args.len());
    let mut hide_next = false;
    for arg in args {
        if hide_next {
            out.push(Credential::new(arg.as_str()).preview());
            hide_next = false;
        } else {
            hide_next = arg == "--token";
            out.push(arg.clone());
        }
    }
    out.join(" ")
}

#[async_trait]
impl WorkerSetup for RunnerScripts {
    #[instrument(skip_all, fields(name = %request.name))]
    async fn configure(&self, request: &ConfigureRequest) -> CoreResult<()> {
        let args = Self::configure_args(request);
        info!(command = %format!("{CONFIGURE_SCRIPT} {}", masked(&args)), "configuring worker");

        let status = self
            .command(CONFIGURE_SCRIPT)
            .args(&args)
            .status()
            .await
            .map_err(|e| CoreError::Configure(format!("cannot start {CONFIGURE_SCRIPT}: {e}")))?;

        if !status.success() {
            return Err(CoreError::Configure(format!("{CONFIGURE_SCRIPT} {status}")));
        }
        Ok(())
    }
}
