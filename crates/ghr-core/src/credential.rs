use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use ghr_model::Credential;
use tracing::{info, warn};

use crate::{CoreError, CoreResult};

/// Key looked up in the secret file; also the name of the environment fallback.
pub const TOKEN_KEY: &str = "GITHUB_TOKEN";

/// Resolves the access token, secret file first.
///
/// The environment value is injected by the caller rather than read here, so resolution
/// stays a pure function of its inputs.
#[derive(Debug, Clone)]
pub struct CredentialResolver {
    secret_file: PathBuf,
    key: String,
    env_value: Option<String>,
}

impl CredentialResolver {
    pub fn new(secret_file: impl Into<PathBuf>, env_value: Option<String>) -> Self {
        Self {
            secret_file: secret_file.into(),
            key: TOKEN_KEY.to_string(),
            env_value,
        }
    }

    /// Look up a different key in the secret file.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn resolve(&self) -> CoreResult<Credential> {
        if let Some(credential) = self.from_file() {
            info!(
                source = "file",
                path = %self.secret_file.display(),
                preview = %credential.preview(),
                "credential resolved"
            );
            return Ok(credential);
        }

        let from_env = self
            .env_value
            .as_deref()
            .map(Credential::new)
            .filter(|c| !c.is_empty());
        match from_env {
            Some(credential) => {
                info!(
                    source = "env",
                    key = %self.key,
                    preview = %credential.preview(),
                    "credential resolved from environment fallback"
                );
                Ok(credential)
            }
            None => Err(CoreError::MissingCredential {
                secret_file: self.secret_file.clone(),
                key: self.key.clone(),
            }),
        }
    }

    fn from_file(&self) -> Option<Credential> {
        let path = self.secret_file.as_path();
        let meta = match fs::metadata(path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %path.display(), "secret file not present");
                return None;
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "secret file not accessible");
                return None;
            }
        };
        if !meta.is_file() {
            warn!(path = %path.display(), "secret file is not a regular file");
            return None;
        }

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "secret file unreadable");
                return None;
            }
        };
        if content.trim().is_empty() {
            warn!(path = %path.display(), "secret file is empty");
            return None;
        }

        match find_entry(&content, &self.key) {
            Some(value) => Some(Credential::new(value)),
            None => {
                warn!(path = %path.display(), key = %self.key, "secret file has no matching entry");
                None
            }
        }
    }

    pub fn secret_file(&self) -> &Path {
        &self.secret_file
    }
}

/// Value of the last `KEY=value` or `KEY:value` line, if any.
fn find_entry(content: &str, key: &str) -> Option<String> {
    content
        .lines()
        .filter_map(|line| parse_line(line, key))
        .last()
}

fn parse_line(line: &str, key: &str) -> Option<String> {
    let line = line.trim_end_matches('\r').trim();
    let rest = line.strip_prefix(key)?.trim_start();
    let value = rest
        .strip_prefix('=')
        .or_else(|| rest.strip_prefix(':'))?
        .trim();
    (!value.is_empty()).then(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn secret(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn last_matching_line_wins() {
        let file = secret("GITHUB_TOKEN=ghp_first\nOTHER=x\nGITHUB_TOKEN=ghp_second\n");
        let cred = CredentialResolver::new(file.path(), Some("ghp_env".into()))
            .resolve()
            .unwrap();
        assert_eq!(cred.expose(), "ghp_second");
    }

    #[test]
    fn colon_form_whitespace_and_crlf() {
        let file = secret("  GITHUB_TOKEN :  ghp_colon  \r\n");
        let cred = CredentialResolver::new(file.path(), None).resolve().unwrap();
        assert_eq!(cred.expose(), "ghp_colon");
    }

    #[test]
    fn key_is_exact_and_case_sensitive() {
        assert_eq!(parse_line("GITHUB_TOKEN_OLD=abc", TOKEN_KEY), None);
        assert_eq!(parse_line("github_token=abc", TOKEN_KEY), None);
        assert_eq!(parse_line("GITHUB_TOKEN=", TOKEN_KEY), None);
        assert_eq!(parse_line("GITHUB_TOKEN=abc", TOKEN_KEY).as_deref(), Some("abc"));
    }

    #[test]
    fn env_only_setup() {
        let dir = tempfile::tempdir().unwrap();
        let cred = CredentialResolver::new(dir.path().join("absent"), Some("ghp_env".into()))
            .resolve()
            .unwrap();
        assert_eq!(cred.expose(), "ghp_env");
    }

    #[test]
    fn file_without_entry_falls_back_to_env() {
        let file = secret("SOMETHING_ELSE=1\n");
        let cred = CredentialResolver::new(file.path(), Some("ghp_env".into()))
            .resolve()
            .unwrap();
        assert_eq!(cred.expose(), "ghp_env");
    }

    #[test]
    fn directory_is_not_a_secret_file() {
        let dir = tempfile::tempdir().unwrap();
        let cred = CredentialResolver::new(dir.path(), Some("ghp_env".into()))
            .resolve()
            .unwrap();
        assert_eq!(cred.expose(), "ghp_env");
    }

    #[test]
    fn neither_source_is_fatal() {
        let file = secret("\n\n");
        let err = CredentialResolver::new(file.path(), Some("   ".into()))
            .resolve()
            .unwrap_err();
        assert!(matches!(err, CoreError::MissingCredential { .. }));
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn custom_key() {
        let file = secret("GH_PAT=ghp_custom\n");
        let cred = CredentialResolver::new(file.path(), None)
            .with_key("GH_PAT")
            .resolve()
            .unwrap();
        assert_eq!(cred.expose(), "ghp_custom");
    }
}
