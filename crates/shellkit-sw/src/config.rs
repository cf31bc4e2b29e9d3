//! Controller configuration.

use std::time::Duration;

use url::Url;

use crate::strategy::FetchStrategy;
use crate::ControllerError;

/// Configuration for a [`ShellCacheController`](crate::ShellCacheController).
///
/// The cache namespace is injected here rather than read from a global, so
/// tests can point a controller at a disposable namespace. Asset and shell
/// paths are full URLs; whatever subpath the host serves the application
/// under is the host's concern.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Current cache namespace, e.g. `"activity-tracker-shell-v3"`.
    ///
    /// Bump the version suffix when the shell changes; every other namespace
    /// found at activation is deleted.
    pub cache_name: String,
    /// The application shell: assets populated atomically at install.
    pub shell_assets: Vec<Url>,
    /// Root path of the application.
    pub root_url: Url,
    /// Canonical shell document.
    pub document_url: Url,
    /// Strategy for intercepted GET requests.
    pub strategy: FetchStrategy,
    /// Optional bound on each network fetch. `None` preserves the original
    /// behavior of waiting indefinitely.
    pub fetch_timeout: Option<Duration>,
}

impl ControllerConfig {
    /// Create a configuration caching the root path and canonical document.
    pub fn new(cache_name: impl Into<String>, root_url: Url, document_url: Url) -> Self {
        Self {
            cache_name: cache_name.into(),
            shell_assets: vec![root_url.clone(), document_url.clone()],
            root_url,
            document_url,
            strategy: FetchStrategy::default(),
            fetch_timeout: None,
        }
    }

    /// Select a fetch strategy.
    pub fn with_strategy(mut self, strategy: FetchStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Bound each network fetch by a timeout.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = Some(timeout);
        self
    }

    /// Add a shell asset beyond the root and canonical document.
    pub fn with_extra_asset(mut self, url: Url) -> Self {
        self.shell_assets.push(url);
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ControllerError> {
        if self.cache_name.is_empty() {
            return Err(ControllerError::Config("cache name is empty".to_string()));
        }
        if self.shell_assets.is_empty() {
            return Err(ControllerError::Config("asset set is empty".to_string()));
        }
        Ok(())
    }
}
