use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// Public host whose REST API lives on a dedicated `api.` subdomain.
const PUBLIC_HOSTS: &[&str] = &["github.com", "www.github.com"];
const PUBLIC_API_BASE: &str = "https://api.github.com";

/// Control-plane resource group a worker registers under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum TargetScope {
    /// `https://<host>/<owner>/<repo>`
    Repository { owner: String, repo: String },
    /// `https://<host>/<org>`
    Organization { org: String },
}

/// Parsed target reference.
///
/// Built from the URL-shaped `REPO_URL` setting. Exactly two shapes are accepted:
/// one path segment (organization) or two path segments (repository).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetRef {
    scheme: String,
    host: String,
    scope: TargetScope,
}

impl TargetRef {
    /// Parse a target URL.
    ///
    /// A trailing slash and a `.git` suffix on the repository are tolerated;
    /// query strings and fragments are ignored.
    pub fn parse(raw: &str) -> ModelResult<Self> {
        let invalid = |reason: &str| ModelError::InvalidTarget {
            url: raw.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(invalid("value is empty"));
        }
        let (scheme, rest) = trimmed
            .split_once("://")
            .ok_or_else(|| invalid("missing scheme"))?;
        let scheme = scheme.to_ascii_lowercase();
        if scheme != "https" && scheme != "http" {
            return Err(invalid("scheme must be http or https"));
        }

        let rest = rest.split(['?', '#']).next().unwrap_or_default();
        let (host, path) = rest.split_once('/').unwrap_or((rest, ""));
        if host.is_empty() {
            return Err(invalid("missing host"));
        }

        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if let Some(bad) = segments.iter().find(|s| !is_valid_segment(s)) {
            return Err(invalid(&format!("unexpected path segment '{bad}'")));
        }

        let scope = match segments.as_slice() {
            [org] => TargetScope::Organization {
                org: (*org).to_string(),
            },
            [owner, repo] => {
                let repo = repo.strip_suffix(".git").unwrap_or(repo);
                if repo.is_empty() {
                    return Err(invalid("repository name is empty"));
                }
                TargetScope::Repository {
                    owner: (*owner).to_string(),
                    repo: repo.to_string(),
                }
            }
            [] => return Err(invalid("expected /<org> or /<owner>/<repo>, got no path")),
            _ => {
                return Err(invalid(&format!(
                    "expected /<org> or /<owner>/<repo>, got {} path segments",
                    segments.len()
                )));
            }
        };

        Ok(Self {
            scheme,
            host: host.to_ascii_lowercase(),
            scope,
        })
    }

    pub fn scope(&self) -> &TargetScope {
        &self.scope
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns `true` for the repository-scoped endpoint family.
    pub fn is_repository(&self) -> bool {
        matches!(self.scope, TargetScope::Repository { .. })
    }

    /// Canonical URL handed to the worker's configure step.
    pub fn url(&self) -> String {
        match &self.scope {
            TargetScope::Repository { owner, repo } => {
                format!("{}://{}/{}/{}", self.scheme, self.host, owner, repo)
            }
            TargetScope::Organization { org } => format!("{}://{}/{}", self.scheme, self.host, org),
        }
    }

    /// REST path prefix for the endpoint family (`repos/<owner>/<repo>` or `orgs/<org>`).
    pub fn scope_path(&self) -> String {
        match &self.scope {
            TargetScope::Repository { owner, repo } => format!("repos/{owner}/{repo}"),
            TargetScope::Organization { org } => format!("orgs/{org}"),
        }
    }

    /// Default REST API base for this host.
    ///
    /// Public hosts use the `api.` subdomain, self-hosted servers expose `/api/v3`.
    pub fn api_base(&self) -> String {
        if PUBLIC_HOSTS.contains(&self.host.as_str()) {
            PUBLIC_API_BASE.to_string()
        } else {
            format!("{}://{}/api/v3", self.scheme, self.host)
        }
    }
}

impl fmt::Display for TargetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url())
    }
}

fn is_valid_segment(s: &str) -> bool {
    s.chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}
