//! Upstream release listing and the fingerprint derived from it.
use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Release listing document (only the fields the cache needs).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Release {
    pub tag_name: String,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseAsset {
    pub name: String,
    pub browser_download_url: String,
}

impl Release {
    /// Canonical `{tag, assets}` record with assets sorted by name.
    pub fn record(&self) -> ReleaseRecord {
        let mut assets: Vec<RecordAsset> = self
            .assets
            .iter()
            .map(|a| RecordAsset {
                name: a.name.clone(),
                url: a.browser_download_url.clone(),
            })
            .collect();
        assets.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.url.cmp(&b.url)));

        ReleaseRecord {
            tag: self.tag_name.clone(),
            assets,
        }
    }

    /// First asset whose name is `<prefix>*<suffix>`.
    pub fn find_asset(&self, prefix: &str, suffix: &str) -> Option<&ReleaseAsset> {
        self.assets.iter().find(|a| {
            a.name.len() > prefix.len() + suffix.len()
                && a.name.starts_with(prefix)
                && a.name.ends_with(suffix)
        })
    }
}

/// Canonicalized view of a release; its JSON form is what gets hashed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseRecord {
    pub tag: String,
    pub assets: Vec<RecordAsset>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordAsset {
    pub name: String,
    pub url: String,
}

impl ReleaseRecord {
    pub fn fingerprint(&self) -> Fingerprint {
        // Field order is fixed by the struct definition, so the encoding is stable.
        let canonical = serde_json::to_vec(self).unwrap_or_default();
        Fingerprint(hex::encode(Sha256::digest(&canonical)))
    }
}

/// Hex-encoded SHA-256 of a [`ReleaseRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Parse a persisted marker; `None` when the content is not a fingerprint.
    pub fn from_marker(content: &str) -> Option<Self> {
        let value = content.trim();
        let valid = value.len() == 64 && value.chars().all(|c| c.is_ascii_hexdigit());
        valid.then(|| Self(value.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
