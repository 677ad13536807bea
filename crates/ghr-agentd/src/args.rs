use std::{path::PathBuf, time::Duration};

use clap::{ArgAction, Parser, builder::BoolishValueParser};
use ghr_api::LATEST_RELEASE_URL;
use ghr_core::{ControllerConfig, CoreResult};
use ghr_model::{ModelError, ModelResult, RetryPolicy};
use ghr_observe::{LoggerConfig, LoggerFormat, LoggerLevel, LoggerTimeZone};

/// Registers one ephemeral worker, runs it, and deregisters it on the way out.
#[derive(Debug, Clone, Parser)]
#[command(name = "ghr-agentd", version, about)]
pub struct Args {
    /// Repository or organization URL the worker registers under.
    #[arg(long, env = "REPO_URL")]
    pub repo_url: String,

    /// Worker name; must be unique under the target.
    #[arg(long, env = "RUNNER_NAME")]
    pub runner_name: String,

    /// Extra comma-separated labels.
    #[arg(long, env = "RUNNER_LABELS", default_value = "")]
    pub labels: String,

    #[arg(long, env = "RUNNER_WORKDIR", default_value = "_work")]
    pub work_dir: String,

    /// Directory holding the unpacked worker and its markers.
    #[arg(long, env = "RUNNER_HOME", default_value = "/home/runner/actions-runner")]
    pub install_dir: PathBuf,

    /// REST API base; derived from the target host when unset.
    #[arg(long, env = "GITHUB_API_URL")]
    pub api_url: Option<String>,

    #[arg(long, env = "RUNNER_RELEASE_URL", default_value = LATEST_RELEASE_URL)]
    pub release_url: String,

    #[arg(long, env = "GITHUB_TOKEN_FILE", default_value = "/run/secrets/github_token")]
    pub secret_file: PathBuf,

    /// Used when the secret file yields nothing.
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    #[arg(long, env = "API_RETRIES", default_value_t = 6)]
    pub api_retries: u32,

    /// Seconds before the first retry.
    #[arg(long, env = "API_RETRY_DELAY", default_value_t = 1.0)]
    pub api_retry_delay: f64,

    #[arg(long, env = "API_RETRY_BACKOFF", default_value_t = 2.0)]
    pub api_retry_backoff: f64,

    #[arg(
        long,
        env = "RUNNER_EPHEMERAL",
        default_value_t = true,
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new()
    )]
    pub ephemeral: bool,

    /// Unprivileged identity the worker runs as when started as root.
    #[arg(long, env = "RUNNER_USER", default_value = "runner")]
    pub runner_user: String,

    #[arg(long, env = "DOCKER_SOCKET", default_value = "/var/run/docker.sock")]
    pub docker_socket: PathBuf,

    /// Seconds between SIGTERM and SIGKILL on shutdown.
    #[arg(long = "shutdown-grace", env = "SHUTDOWN_GRACE_SECS", default_value_t = 30)]
    pub shutdown_grace_secs: u64,

    #[arg(
        long,
        env = "RUNNER_NO_NEW_PRIVS",
        default_value_t = false,
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new()
    )]
    pub no_new_privs: bool,

    #[arg(long, env = "LOG_FORMAT", default_value = "text")]
    pub log_format: LoggerFormat,

    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: LoggerLevel,

    #[arg(long, env = "LOG_TZ", default_value = "utc")]
    pub log_tz: LoggerTimeZone,
}

impl Args {
    pub fn logger_config(&self) -> LoggerConfig {
        LoggerConfig {
            format: self.log_format,
            level: self.log_level.clone(),
            tz: self.log_tz,
            ..Default::default()
        }
    }

    pub fn retry_policy(&self) -> ModelResult<RetryPolicy> {
        let delay = Duration::try_from_secs_f64(self.api_retry_delay).map_err(|_| {
            ModelError::InvalidRetry(format!(
                "delay must be a non-negative number of seconds, got {}",
                self.api_retry_delay
            ))
        })?;
        RetryPolicy::new(self.api_retries, delay, self.api_retry_backoff)
    }

    pub fn controller_config(&self) -> CoreResult<ControllerConfig> {
        ControllerConfig::new(
            &self.repo_url,
            &self.runner_name,
            &self.labels,
            &self.work_dir,
            &self.install_dir,
            self.ephemeral,
        )
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec![
            "ghr-agentd",
            "--repo-url",
            "https://control.example/owner/repo",
            "--runner-name",
            "runner-01",
        ];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn flags_override_defaults() {
        let args = parse(&[
            "--ephemeral",
            "false",
            "--api-retries",
            "3",
            "--shutdown-grace",
            "5",
            "--log-format",
            "json",
        ]);
        assert!(!args.ephemeral);
        assert_eq!(args.retry_policy().unwrap().attempts, 3);
        assert_eq!(args.shutdown_grace(), Duration::from_secs(5));
        assert_eq!(args.logger_config().format, LoggerFormat::Json);
    }

    #[test]
    fn invalid_retry_settings_are_rejected() {
        assert!(parse(&["--api-retries", "0"]).retry_policy().is_err());
        assert!(parse(&["--api-retry-delay=-1"]).retry_policy().is_err());
        assert!(parse(&["--api-retry-backoff", "NaN"]).retry_policy().is_err());
    }

    #[test]
    fn controller_config_is_validated() {
        let cfg = parse(&["--labels", "gpu, docker"]).controller_config().unwrap();
        assert_eq!(cfg.labels.to_delimited(), "self-hosted,linux,x64,gpu,docker");
        assert!(cfg.target.is_repository());

        let args = Args::try_parse_from([
            "ghr-agentd",
            "--repo-url",
            "https://control.example/a/b/c",
            "--runner-name",
            "r",
        ])
        .unwrap();
        assert!(args.controller_config().is_err());
    }
}
