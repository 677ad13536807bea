use std::{io::ErrorKind, sync::Mutex};

use ghr_api::{ApiClient, Endpoints, Method, RUNNERS_PAGE_SIZE};
use ghr_model::{Credential, LifecycleState, RegistrationToken, RunnerList, RunnerRecord};
use tokio::sync::OnceCell;
use tracing::{debug, error, info, instrument, warn};

use crate::{ConfigureRequest, ControllerConfig, CoreError, CoreResult, WorkerSetup};

/// Upper bound on listing pages read per lookup.
const MAX_LIST_PAGES: u32 = 50;

/// Outcome of [`Controller::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// Fresh token, eviction, configure.
    Configured,
    /// Non-ephemeral restart: the configured marker was found and configure was skipped.
    Reused,
}

/// Owns the registration of one worker from token acquisition to deregistration.
pub struct Controller {
    config: ControllerConfig,
    api: ApiClient,
    endpoints: Endpoints,
    credential: Credential,
    state: Mutex<LifecycleState>,
    shutdown: OnceCell<usize>,
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("target", &self.config.target.url())
            .field("name", &self.config.name)
            .field("state", &self.state())
            .finish()
    }
}

impl Controller {
    pub fn new(
        config: ControllerConfig,
        api: ApiClient,
        endpoints: Endpoints,
        credential: Credential,
    ) -> Self {
        Self {
            config,
            api,
            endpoints,
            credential,
            state: Mutex::new(LifecycleState::default()),
            shutdown: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn state(&self) -> LifecycleState {
        match self.state.lock() {
            Ok(state) => *state,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn advance(&self, next: LifecycleState) -> CoreResult<()> {
        let mut state = match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        let from = *state;
        *state = from.transition(next)?;
        debug!(%from, to = %next, "lifecycle transition");
        Ok(())
    }

    /// Acquire a token, evict stale registrations and configure the worker.
    #[instrument(skip_all, fields(target = %self.config.target, name = %self.config.name))]
    pub async fn register(&self, setup: &dyn WorkerSetup) -> CoreResult<Registration> {
        let marker = self.config.configured_marker();
        if !self.config.ephemeral && tokio::fs::try_exists(&marker).await.unwrap_or(false) {
            info!(marker = %marker.display(), "worker already configured, skipping registration");
            return Ok(Registration::Reused);
        }

        self.advance(LifecycleState::Configuring)?;
        let token = self.acquire_token().await?;
        self.evict_stale().await;

        let request = ConfigureRequest {
            url: self.config.target.url(),
            token: token.secret(),
            name: self.config.name.clone(),
            work_dir: self.config.work_dir.clone(),
            labels: self.config.labels.clone(),
            ephemeral: self.config.ephemeral,
            replace: true,
        };
        setup.configure(&request).await?;

        if !self.config.ephemeral {
            tokio::fs::write(&marker, b"1\n").await?;
        }
        info!(labels = %self.config.labels, ephemeral = self.config.ephemeral, "worker configured");
        Ok(Registration::Configured)
    }

    /// Record that the worker process has been launched.
    pub fn mark_running(&self) -> CoreResult<()> {
        self.advance(LifecycleState::Running)
    }

    async fn acquire_token(&self) -> CoreResult<RegistrationToken> {
        let url = self.endpoints.registration_token();
        let resp = self
            .api
            .json(Method::Post, &url, Some(&self.credential))
            .await;

        match resp.parse::<RegistrationToken>().filter(|t| t.is_usable()) {
            Some(token) => {
                info!(
                    token = %token.secret().preview(),
                    expires_at = token.expires_at.as_deref().unwrap_or("unknown"),
                    "registration token acquired"
                );
                Ok(token)
            }
            None => {
                error!(
                    credential = %self.credential.preview(),
                    message = resp.message().as_deref().unwrap_or("-"),
                    response = %resp.describe(),
                    "registration token request failed"
                );
                Err(CoreError::TokenAcquisition {
                    raw: resp.describe(),
                })
            }
        }
    }

    async fn evict_stale(&self) {
        let Some(list) = self.list().await else {
            warn!("could not list registrations, skipping stale eviction");
            return;
        };
        let stale: Vec<RunnerRecord> = list.named(self.config.name.as_str()).cloned().collect();
        if stale.is_empty() {
            debug!("no stale registrations");
            return;
        }
        for record in &stale {
            info!(id = record.id, status = record.status.as_deref().unwrap_or("-"), "evicting stale registration");
            self.delete(record).await;
        }
    }

    /// All registrations, following pages until `total_count` is reached.
    ///
    /// `None` only when the first page cannot be read; a failing later page yields
    /// the records collected so far.
    async fn list(&self) -> Option<RunnerList> {
        let mut all = self.list_page(1).await?;
        let mut last_len = all.runners.len();
        let mut page = 1;
        while last_len >= RUNNERS_PAGE_SIZE as usize
            && (all.runners.len() as u64) < all.total_count
            && page < MAX_LIST_PAGES
        {
            page += 1;
            let Some(next) = self.list_page(page).await else {
                warn!(page, collected = all.runners.len(), "registration listing incomplete");
                break;
            };
            last_len = next.runners.len();
            all.runners.extend(next.runners);
        }
        Some(all)
    }

    async fn list_page(&self, page: u32) -> Option<RunnerList> {
        let resp = self
            .api
            .json(Method::Get, &self.endpoints.runners_page(page), Some(&self.credential))
            .await;
        let list = resp.parse::<RunnerList>();
        if list.is_none() {
            warn!(
                page,
                message = resp.message().as_deref().unwrap_or("-"),
                response = %resp.describe(),
                "registration listing failed"
            );
        }
        list
    }

    async fn delete(&self, record: &RunnerRecord) -> bool {
        let status = self
            .api
            .status(Method::Delete, &self.endpoints.runner(record.id), Some(&self.credential))
            .await;
        match status {
            Some(code) if (200..300).contains(&code) => {
                info!(id = record.id, "registration deleted");
                true
            }
            other => {
                warn!(id = record.id, status = ?other, "registration delete failed");
                false
            }
        }
    }

    /// Find this worker's registrations and delete them. Never fails.
    ///
    /// The lookup is polled because a freshly stopped worker can take a moment to appear
    /// in, or settle within, the listing. Returns the number of deleted registrations.
    #[instrument(skip_all, fields(name = %self.config.name))]
    pub async fn deregister(&self) -> usize {
        let attempts = self.config.deregister_attempts.max(1);
        let mut matches = Vec::new();
        for attempt in 1..=attempts {
            if let Some(list) = self.list().await {
                matches = list.named(self.config.name.as_str()).cloned().collect();
            }
            if !matches.is_empty() {
                break;
            }
            if attempt < attempts {
                debug!(attempt, attempts, "registration not listed yet, polling again");
                tokio::time::sleep(self.config.deregister_pause).await;
            }
        }

        if matches.is_empty() {
            info!("no registration found, nothing to deregister");
            return 0;
        }

        let mut deleted = 0;
        for record in &matches {
            if self.delete(record).await {
                deleted += 1;
            }
        }
        deleted
    }

    /// Deregister and terminate. Runs once; concurrent and later callers wait for the
    /// first run and get its result.
    pub async fn shutdown(&self) -> usize {
        *self
            .shutdown
            .get_or_init(|| async {
                if let Err(e) = self.advance(LifecycleState::Deregistering) {
                    debug!(error = %e, "deregistering from unexpected state");
                }
                let deleted = self.deregister().await;

                let marker = self.config.configured_marker();
                match tokio::fs::remove_file(&marker).await {
                    Ok(()) => debug!(marker = %marker.display(), "configured marker removed"),
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => warn!(marker = %marker.display(), error = %e, "could not remove configured marker"),
                }

                if let Err(e) = self.advance(LifecycleState::Terminated) {
                    debug!(error = %e, "terminate from unexpected state");
                }
                info!(deleted, "shutdown complete");
                deleted
            })
            .await
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.initialized()
    }
}
