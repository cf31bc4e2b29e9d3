//! # ShellKit Service Worker
//!
//! Offline shell cache controller for a single-page application.
//!
//! The controller keeps an application's HTML shell usable without a network
//! connection by caching it under a versioned namespace and answering
//! intercepted requests from cache, network, or a blend of both. A host (a
//! browser engine, an embedder, a test harness) dispatches lifecycle, fetch,
//! and message events into it.
//!
//! ## Features
//!
//! - **Lifecycle**: install (atomic shell population), activate (stale
//!   namespace eviction, client claiming)
//! - **Fetch interception**: cache-first, network-first, and
//!   stale-while-revalidate strategies, swappable via configuration
//! - **Update channel**: a `FORCE_UPDATE` command from a controlled page pulls
//!   the latest shell and notifies every open page of the outcome
//!
//! ## Architecture
//!
//! ```text
//! ShellCacheController
//!     ├── ControllerConfig      (cache namespace, asset set, strategy)
//!     ├── CacheStorage          (namespace → Cache → key → Response)
//!     ├── dyn NetworkFetcher    (injected network seam)
//!     └── dyn ClientRegistry    (injected view of open pages)
//! ```

use thiserror::Error;

pub mod cache;
pub mod clients;
pub mod config;
pub mod controller;
pub mod fetch;
pub mod message;
pub mod strategy;

pub use cache::{Cache, CacheKey, CacheStorage};
pub use clients::{ClientId, ClientRegistry, PageClients};
pub use config::ControllerConfig;
pub use controller::{ControllerEvent, LifecycleState, ShellCacheController};
pub use fetch::{CacheMode, NetworkFetcher, Request, Response};
pub use message::{Command, Notification};
pub use strategy::FetchStrategy;

/// Errors that can occur in controller operations.
#[derive(Error, Debug, Clone)]
pub enum ControllerError {
    #[error("Install failed: {0}")]
    InstallFailed(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Client error: {0}")]
    Client(String),
}
