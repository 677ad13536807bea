//! Worker release cache.
//!
//! The unpacked release lives directly in the install directory next to a
//! [`FINGERPRINT_MARKER`] file. A matching marker means the install is current and nothing
//! is fetched; anything else triggers a clean re-install.
use std::{
    io::{Cursor, ErrorKind},
    path::{Path, PathBuf},
};

use flate2::read::GzDecoder;
use ghr_api::{ApiClient, Method};
use ghr_model::{Credential, Fingerprint, Release};
use tracing::{info, instrument, warn};

use crate::{CoreError, CoreResult};

pub const ASSET_PREFIX: &str = "actions-runner-linux-x64-";
pub const ASSET_SUFFIX: &str = ".tar.gz";
pub const FINGERPRINT_MARKER: &str = ".release-fingerprint";

/// Scripts that must exist after unpacking.
pub const ENTRY_POINTS: &[&str] = &["config.sh", "run.sh"];

/// Directories owned by the release archive.
const RELEASE_DIRS: &[&str] = &["bin", "externals"];

#[derive(Debug, Clone)]
pub struct AssetCache {
    api: ApiClient,
    release_url: String,
    install_dir: PathBuf,
}

impl AssetCache {
    pub fn new(api: ApiClient, release_url: impl Into<String>, install_dir: impl Into<PathBuf>) -> Self {
        Self {
            api,
            release_url: release_url.into(),
            install_dir: install_dir.into(),
        }
    }

    pub fn install_dir(&self) -> &Path {
        &self.install_dir
    }

    pub fn marker_path(&self) -> PathBuf {
        self.install_dir.join(FINGERPRINT_MARKER)
    }

    /// Make sure the current upstream release is unpacked in the install directory.
    #[instrument(skip_all, fields(dir = %self.install_dir.display()))]
    pub async fn ensure(&self, credential: Option<&Credential>) -> CoreResult<PathBuf> {
        let release = self.latest(credential).await?;
        let asset = release
            .find_asset(ASSET_PREFIX, ASSET_SUFFIX)
            .ok_or_else(|| {
                CoreError::Asset(format!(
                    "release {} has no asset matching {ASSET_PREFIX}*{ASSET_SUFFIX}",
                    release.tag_name
                ))
            })?;
        let fingerprint = release.record().fingerprint();

        if self.cached().await.as_ref() == Some(&fingerprint) && self.entry_points_present() {
            info!(tag = %release.tag_name, %fingerprint, "worker release unchanged, skipping download");
            return Ok(self.install_dir.clone());
        }

        info!(
            tag = %release.tag_name,
            asset = %asset.name,
            %fingerprint,
            "installing worker release"
        );
        tokio::fs::create_dir_all(&self.install_dir).await?;
        self.clear().await?;

        let archive = self
            .api
            .download(&asset.browser_download_url)
            .await
            .ok_or_else(|| CoreError::Asset(format!("download of {} failed", asset.name)))?;

        let dir = self.install_dir.clone();
        tokio::task::spawn_blocking(move || unpack(&archive, &dir))
            .await
            .map_err(|e| CoreError::Asset(format!("unpack task failed: {e}")))??;

        if let Some(missing) = ENTRY_POINTS
            .iter()
            .find(|name| !self.install_dir.join(name).is_file())
        {
            return Err(CoreError::Asset(format!(
                "{} does not contain {missing}",
                asset.name
            )));
        }

        tokio::fs::write(self.marker_path(), format!("{fingerprint}\n")).await?;
        info!(tag = %release.tag_name, "worker release installed");
        Ok(self.install_dir.clone())
    }

    async fn latest(&self, credential: Option<&Credential>) -> CoreResult<Release> {
        let resp = self.api.json(Method::Get, &self.release_url, credential).await;
        if let Some(release) = resp.parse::<Release>() {
            return Ok(release);
        }

        // A rejected credential must not block the public listing.
        if credential.is_some() {
            warn!(
                response = %resp.describe(),
                "authenticated release lookup failed, retrying anonymously"
            );
            let anon = self.api.json(Method::Get, &self.release_url, None).await;
            if let Some(release) = anon.parse::<Release>() {
                return Ok(release);
            }
            return Err(CoreError::Asset(format!(
                "release listing {} unusable: {}",
                self.release_url,
                anon.describe()
            )));
        }

        Err(CoreError::Asset(format!(
            "release listing {} unusable: {}",
            self.release_url,
            resp.describe()
        )))
    }

    async fn cached(&self) -> Option<Fingerprint> {
        let content = tokio::fs::read_to_string(self.marker_path()).await.ok()?;
        Fingerprint::from_marker(&content)
    }

    fn entry_points_present(&self) -> bool {
        ENTRY_POINTS
            .iter()
            .all(|name| self.install_dir.join(name).is_file())
    }

    /// Remove everything a previous release unpacked, plus the stale marker.
    async fn clear(&self) -> CoreResult<()> {
        remove_file(&self.marker_path()).await?;
        for dir in RELEASE_DIRS {
            let path = self.install_dir.join(dir);
            match tokio::fs::remove_dir_all(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        let mut entries = tokio::fs::read_dir(&self.install_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_script = path.extension().is_some_and(|ext| ext == "sh");
            if is_script && entry.file_type().await?.is_file() {
                remove_file(&path).await?;
            }
        }
        Ok(())
    }
}

async fn remove_file(path: &Path) -> CoreResult<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn unpack(archive: &[u8], dir: &Path) -> CoreResult<()> {
    let mut tar = tar::Archive::new(GzDecoder::new(Cursor::new(archive)));
    tar.set_preserve_permissions(true);
    tar.unpack(dir)
        .map_err(|e| CoreError::Asset(format!("unpack into {} failed: {e}", dir.display())))
}
