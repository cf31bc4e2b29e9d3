//! The offline shell cache controller.
//!
//! Ties the cache storage, the injected network fetcher, and the injected
//! client registry together behind the four operations a host dispatches:
//! `install`, `activate`, `handle_fetch`, and `handle_message`.
//!
//! Each operation is an async method; the awaiting caller is the event scope,
//! so an event is not finished until its method completes. Work the response
//! path does not wait on (write-backs, revalidations) runs on spawned tasks
//! tracked by the controller; [`ShellCacheController::wait_idle`] is the join
//! point, and failures surface on the event stream rather than vanishing.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};
use url::Url;

use shellkit_common::with_timeout;

use crate::cache::{CacheKey, CacheStorage};
use crate::clients::ClientRegistry;
use crate::config::ControllerConfig;
use crate::fetch::{NetworkFetcher, Request, Response};
use crate::message::{Command, Notification};
use crate::strategy::FetchStrategy;
use crate::ControllerError;

/// Controller lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Constructed, no events dispatched yet.
    Parsed,
    /// Install in progress (shell being populated).
    Installing,
    /// Shell cached; eligible for activation immediately (skip-waiting).
    Installed,
    /// Activation in progress (stale namespaces being evicted).
    Activating,
    /// Active and controlling pages.
    Activated,
    /// Install failed or controller superseded.
    Redundant,
}

impl LifecycleState {
    /// Check if the controller is active.
    pub fn is_active(&self) -> bool {
        *self == LifecycleState::Activated
    }
}

/// Observability events emitted by the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerEvent {
    /// Lifecycle state changed.
    StateChange {
        from: LifecycleState,
        to: LifecycleState,
    },
    /// A stale cache namespace was deleted during activation.
    CacheEvicted { name: String },
    /// A background cache write landed.
    RefreshCompleted { url: Url },
    /// A background cache write did not land.
    RefreshFailed { url: Url, error: String },
}

/// The offline shell cache controller.
pub struct ShellCacheController {
    config: ControllerConfig,
    caches: Arc<RwLock<CacheStorage>>,
    fetcher: Arc<dyn NetworkFetcher>,
    clients: Arc<dyn ClientRegistry>,
    state: RwLock<LifecycleState>,
    pending: Mutex<Vec<JoinHandle<()>>>,
    event_tx: mpsc::UnboundedSender<ControllerEvent>,
}

impl ShellCacheController {
    /// Create a controller.
    pub fn new(
        config: ControllerConfig,
        fetcher: Arc<dyn NetworkFetcher>,
        clients: Arc<dyn ClientRegistry>,
    ) -> Result<(Self, mpsc::UnboundedReceiver<ControllerEvent>), ControllerError> {
        config.validate()?;
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        Ok((
            Self {
                config,
                caches: Arc::new(RwLock::new(CacheStorage::new())),
                fetcher,
                clients,
                state: RwLock::new(LifecycleState::Parsed),
                pending: Mutex::new(Vec::new()),
                event_tx,
            },
            event_rx,
        ))
    }

    /// The configuration this controller runs with.
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Shared handle to the cache storage.
    pub fn storage(&self) -> Arc<RwLock<CacheStorage>> {
        self.caches.clone()
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> LifecycleState {
        *self.state.read().await
    }

    async fn set_state(&self, to: LifecycleState) {
        let from = {
            let mut state = self.state.write().await;
            std::mem::replace(&mut *state, to)
        };
        trace!(?from, ?to, "state change");
        let _ = self.event_tx.send(ControllerEvent::StateChange { from, to });
    }

    // ==================== Lifecycle ====================

    /// Populate the current namespace with the full asset set.
    ///
    /// Population is atomic: responses are collected first and written only
    /// once every asset has fetched with a success status. Any failure fails
    /// the whole install; no retry is attempted here.
    pub async fn install(&self) -> Result<(), ControllerError> {
        self.set_state(LifecycleState::Installing).await;

        match self.populate_shell().await {
            Ok(()) => {
                // Skip-waiting: eligible to supersede a prior version at once.
                self.set_state(LifecycleState::Installed).await;
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "failed to cache app shell");
                self.set_state(LifecycleState::Redundant).await;
                Err(e)
            }
        }
    }

    async fn populate_shell(&self) -> Result<(), ControllerError> {
        let fetches = self.config.shell_assets.iter().map(|url| {
            let request = Request::get(url.clone());
            async move {
                let result = self.fetch_network(&request).await;
                (url.clone(), result)
            }
        });

        let mut staged = Vec::with_capacity(self.config.shell_assets.len());
        for (url, result) in futures::future::join_all(fetches).await {
            let response = result.map_err(|e| {
                ControllerError::InstallFailed(format!("{url}: {e}"))
            })?;
            if !response.is_success() {
                return Err(ControllerError::InstallFailed(format!(
                    "{url} returned {}",
                    response.status
                )));
            }
            staged.push((CacheKey::get(url), response));
        }

        let mut storage = self.caches.write().await;
        let cache = storage.open(&self.config.cache_name);
        for (key, response) in staged {
            cache.put(key, response)?;
        }
        info!(
            cache = %self.config.cache_name,
            assets = self.config.shell_assets.len(),
            "app shell cached"
        );
        Ok(())
    }

    /// Evict every stale cache namespace, then take control of open pages.
    ///
    /// Eviction completes before clients are claimed, so no stale shell is
    /// ever served to a newly controlled page.
    pub async fn activate(&self) -> Result<(), ControllerError> {
        self.set_state(LifecycleState::Activating).await;

        {
            let mut storage = self.caches.write().await;
            let stale: Vec<String> = storage
                .keys()
                .into_iter()
                .filter(|name| *name != self.config.cache_name)
                .map(str::to_string)
                .collect();
            for name in stale {
                info!(cache = %name, "deleting old cache");
                storage.delete(&name);
                let _ = self.event_tx.send(ControllerEvent::CacheEvicted { name });
            }
        }

        self.clients.claim().await?;
        self.set_state(LifecycleState::Activated).await;
        Ok(())
    }

    // ==================== Fetch interception ====================

    /// Answer an intercepted request according to the configured strategy.
    ///
    /// Only GET requests are intercepted; anything else returns `None` and
    /// passes through untouched. Under network-first, `None` can also mean
    /// "offline with nothing cached", which the caller treats as a failure.
    pub async fn handle_fetch(&self, request: &Request) -> Option<Response> {
        if !request.is_get() {
            trace!(method = %request.method, url = %request.url, "passing through");
            return None;
        }

        match self.config.strategy {
            FetchStrategy::CacheFirst => self.cache_first(request).await,
            FetchStrategy::NetworkFirst => self.network_first(request).await,
            FetchStrategy::StaleWhileRevalidate => self.stale_while_revalidate(request).await,
        }
    }

    async fn cache_first(&self, request: &Request) -> Option<Response> {
        let key = CacheKey::for_request(request);
        if let Some(hit) = self.lookup(&key).await {
            trace!(url = %request.url, "serving from cache");
            return Some(hit);
        }

        match self.fetch_network(request).await {
            Ok(response) => Some(response),
            Err(e) => {
                debug!(url = %request.url, error = %e, "cache miss and network failed");
                Some(Response::service_unavailable())
            }
        }
    }

    async fn network_first(&self, request: &Request) -> Option<Response> {
        match self.fetch_network(request).await {
            Ok(response) => {
                if response.is_success() {
                    self.spawn_cache_write(CacheKey::for_request(request), response.clone());
                }
                Some(response)
            }
            Err(e) => {
                debug!(url = %request.url, error = %e, "network failed; falling back to cache");
                self.lookup(&CacheKey::for_request(request)).await
            }
        }
    }

    async fn stale_while_revalidate(&self, request: &Request) -> Option<Response> {
        let key = CacheKey::for_request(request);

        if let Some(hit) = self.lookup(&key).await {
            trace!(url = %request.url, "serving stale; revalidating in background");
            self.spawn_revalidate(request.clone());
            return Some(hit);
        }

        match self.fetch_network(request).await {
            Ok(response) => {
                if response.is_success() {
                    self.spawn_cache_write(key, response.clone());
                }
                Some(response)
            }
            Err(e) => {
                debug!(url = %request.url, error = %e, "nothing cached and network failed");
                Some(Response::service_unavailable())
            }
        }
    }

    async fn lookup(&self, key: &CacheKey) -> Option<Response> {
        self.caches
            .read()
            .await
            .get(&self.config.cache_name)?
            .match_request(key)
            .cloned()
    }

    async fn fetch_network(&self, request: &Request) -> Result<Response, ControllerError> {
        fetch_via(
            self.fetcher.as_ref(),
            self.config.fetch_timeout,
            request,
        )
        .await
    }

    /// Write a response to the current cache on a detached task.
    fn spawn_cache_write(&self, key: CacheKey, response: Response) {
        let caches = self.caches.clone();
        let cache_name = self.config.cache_name.clone();
        let event_tx = self.event_tx.clone();

        let handle = tokio::spawn(async move {
            let url = key.url.clone();
            let mut storage = caches.write().await;
            match storage.open(&cache_name).put(key, response) {
                Ok(()) => {
                    let _ = event_tx.send(ControllerEvent::RefreshCompleted { url });
                }
                Err(e) => {
                    warn!(url = %url, error = %e, "background cache write failed");
                    let _ = event_tx.send(ControllerEvent::RefreshFailed {
                        url,
                        error: e.to_string(),
                    });
                }
            }
        });
        self.track(handle);
    }

    /// Refresh a cached entry from the network on a detached task.
    fn spawn_revalidate(&self, request: Request) {
        let caches = self.caches.clone();
        let cache_name = self.config.cache_name.clone();
        let fetcher = self.fetcher.clone();
        let timeout = self.config.fetch_timeout;
        let event_tx = self.event_tx.clone();

        let handle = tokio::spawn(async move {
            let url = request.url.clone();
            match fetch_via(fetcher.as_ref(), timeout, &request).await {
                Ok(response) if response.is_success() => {
                    let key = CacheKey::for_request(&request);
                    let mut storage = caches.write().await;
                    match storage.open(&cache_name).put(key, response) {
                        Ok(()) => {
                            let _ = event_tx.send(ControllerEvent::RefreshCompleted { url });
                        }
                        Err(e) => {
                            warn!(url = %url, error = %e, "revalidation write failed");
                            let _ = event_tx.send(ControllerEvent::RefreshFailed {
                                url,
                                error: e.to_string(),
                            });
                        }
                    }
                }
                Ok(response) => {
                    debug!(url = %url, status = %response.status, "revalidation returned non-success; cache kept");
                    let _ = event_tx.send(ControllerEvent::RefreshFailed {
                        url,
                        error: format!("non-success status {}", response.status),
                    });
                }
                Err(e) => {
                    debug!(url = %url, error = %e, "revalidation fetch failed; cache kept");
                    let _ = event_tx.send(ControllerEvent::RefreshFailed {
                        url,
                        error: e.to_string(),
                    });
                }
            }
        });
        self.track(handle);
    }

    fn track(&self, handle: JoinHandle<()>) {
        let mut pending = self
            .pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        // Reap handles whose task already finished; the list must stay
        // bounded by in-flight work, not by requests served between joins.
        pending.retain(|tracked| !tracked.is_finished());
        pending.push(handle);
    }

    /// Number of tracked background tasks not yet reaped.
    pub fn pending_tasks(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Join point for detached background work.
    ///
    /// Hosts call this before tearing the controller down, mirroring the
    /// lifetime extension an event scope grants its spawned work. Between
    /// joins, finished tasks are reaped as new ones are tracked.
    pub async fn wait_idle(&self) {
        loop {
            let handles: Vec<JoinHandle<()>> = {
                let mut pending = self
                    .pending
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                pending.drain(..).collect()
            };
            if handles.is_empty() {
                return;
            }
            for handle in handles {
                if let Err(e) = handle.await {
                    warn!(error = %e, "background task panicked");
                }
            }
        }
    }

    // ==================== Update channel ====================

    /// Handle a message posted by a controlled page.
    ///
    /// Only the tagged `FORCE_UPDATE` command is recognized; every other
    /// shape is ignored. The method does not return until the update (success
    /// or failure path) has completed.
    pub async fn handle_message(&self, message: &serde_json::Value) {
        match Command::parse(message) {
            Some(Command::ForceUpdate) => self.force_update().await,
            None => trace!("ignoring unrecognized message"),
        }
    }

    async fn force_update(&self) {
        info!(document = %self.config.document_url, "forced shell update requested");

        let request = Request::get_bypassing_cache(self.config.document_url.clone());
        let notification = match self.fetch_network(&request).await {
            Ok(response) if response.is_success() => {
                let root_key = CacheKey::get(self.config.root_url.clone());
                let document_key = CacheKey::get(self.config.document_url.clone());

                let mut storage = self.caches.write().await;
                let cache = storage.open(&self.config.cache_name);
                // Both access patterns must see the refresh.
                let wrote = cache
                    .put(root_key, response.clone())
                    .and(cache.put(document_key, response));
                match wrote {
                    Ok(()) => {
                        info!(cache = %self.config.cache_name, "forced update applied");
                        Notification::UpdateComplete
                    }
                    Err(e) => {
                        warn!(error = %e, "forced update could not write cache");
                        Notification::UpdateFailed
                    }
                }
            }
            Ok(response) => {
                warn!(status = %response.status, "forced update fetch returned non-success");
                Notification::UpdateFailed
            }
            Err(e) => {
                warn!(error = %e, "forced update fetch failed");
                Notification::UpdateFailed
            }
        };

        self.broadcast(notification).await;
    }

    async fn broadcast(&self, notification: Notification) {
        for client in self.clients.match_all().await {
            if let Err(e) = self.clients.post_message(client, notification).await {
                debug!(client = ?client, error = %e, "notification not delivered");
            }
        }
    }
}

async fn fetch_via(
    fetcher: &dyn NetworkFetcher,
    timeout: Option<Duration>,
    request: &Request,
) -> Result<Response, ControllerError> {
    match timeout {
        Some(limit) => match with_timeout(limit, || fetcher.fetch(request)).await {
            Ok(result) => result,
            Err(e) => Err(ControllerError::Network(e.to_string())),
        },
        None => fetcher.fetch(request).await,
    }
}
