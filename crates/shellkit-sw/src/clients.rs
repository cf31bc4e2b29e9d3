//! Views of the open pages the controller can talk to.
//!
//! The controller never touches a real page directly; it depends on
//! [`ClientRegistry`], so hosts and tests can supply their own view of what
//! "open pages" means. Connections are ephemeral runtime handles: nothing
//! about a client survives a restart, and the set is queried fresh on every
//! broadcast.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use hashbrown::HashMap;
use tokio::sync::{mpsc, RwLock};
use tracing::trace;

use crate::message::Notification;
use crate::ControllerError;

/// Unique identifier for an open controlled page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(u64);

impl ClientId {
    fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// The injected view of open pages.
#[async_trait]
pub trait ClientRegistry: Send + Sync {
    /// Enumerate all open pages.
    async fn match_all(&self) -> Vec<ClientId>;

    /// Post a notification to one page.
    async fn post_message(
        &self,
        client: ClientId,
        notification: Notification,
    ) -> Result<(), ControllerError>;

    /// Take immediate control of all open pages.
    async fn claim(&self) -> Result<(), ControllerError>;
}

struct ClientHandle {
    tx: mpsc::UnboundedSender<Notification>,
    controlled: bool,
}

/// In-memory registry delivering notifications over per-client channels.
///
/// Each connected page holds the receiving half of an unbounded channel;
/// notifications posted to it arrive there. This is the registry hosts use
/// when they own the page set themselves, and the one the tests fake against.
#[derive(Default)]
pub struct PageClients {
    inner: RwLock<HashMap<ClientId, ClientHandle>>,
}

impl PageClients {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an open page; returns its id and the notification stream.
    pub async fn connect(&self) -> (ClientId, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = ClientId::new();
        self.inner.write().await.insert(
            id,
            ClientHandle {
                tx,
                controlled: false,
            },
        );
        trace!(client = ?id, "client connected");
        (id, rx)
    }

    /// Remove a page that has closed.
    pub async fn disconnect(&self, client: ClientId) {
        self.inner.write().await.remove(&client);
        trace!(client = ?client, "client disconnected");
    }

    /// Whether a page is currently controlled.
    pub async fn is_controlled(&self, client: ClientId) -> bool {
        self.inner
            .read()
            .await
            .get(&client)
            .map(|handle| handle.controlled)
            .unwrap_or(false)
    }

    /// Number of open pages.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Check if no pages are open.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[async_trait]
impl ClientRegistry for PageClients {
    async fn match_all(&self) -> Vec<ClientId> {
        self.inner.read().await.keys().copied().collect()
    }

    async fn post_message(
        &self,
        client: ClientId,
        notification: Notification,
    ) -> Result<(), ControllerError> {
        let inner = self.inner.read().await;
        let handle = inner.get(&client).ok_or_else(|| {
            ControllerError::Client(format!("no such client: {:?}", client))
        })?;
        handle
            .tx
            .send(notification)
            .map_err(|_| ControllerError::Client(format!("client gone: {:?}", client)))
    }

    async fn claim(&self) -> Result<(), ControllerError> {
        let mut inner = self.inner.write().await;
        for handle in inner.values_mut() {
            handle.controlled = true;
        }
        Ok(())
    }
}
