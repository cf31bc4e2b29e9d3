//! End-to-end walkthrough of the controller against an in-memory network.
//!
//! Run with `cargo run -p shellkit-sw --example offline_shell`.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;
use url::Url;

use shellkit_common::{init_logging, LogConfig};
use shellkit_sw::{
    ControllerConfig, ControllerError, FetchStrategy, NetworkFetcher, PageClients, Request,
    Response, ShellCacheController,
};

/// A toy origin server: a mutable document body behind a flaky switch.
struct ToyNetwork {
    document: Mutex<String>,
    online: Mutex<bool>,
}

impl ToyNetwork {
    fn new(document: &str) -> Self {
        Self {
            document: Mutex::new(document.to_string()),
            online: Mutex::new(true),
        }
    }

    fn set_document(&self, body: &str) {
        *self.document.lock().unwrap() = body.to_string();
    }

    fn set_online(&self, online: bool) {
        *self.online.lock().unwrap() = online;
    }
}

#[async_trait]
impl NetworkFetcher for ToyNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, ControllerError> {
        if !*self.online.lock().unwrap() {
            return Err(ControllerError::Network("network unreachable".to_string()));
        }
        tracing::debug!(url = %request.url, mode = ?request.cache_mode, "origin hit");
        Ok(Response::ok(self.document.lock().unwrap().clone()))
    }
}

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    init_logging(LogConfig::default().with_filter("shellkit=debug"));

    let root = Url::parse("https://tracker.example/app/").expect("static url");
    let document = Url::parse("https://tracker.example/app/index.html").expect("static url");

    let network = Arc::new(ToyNetwork::new("<html>activity tracker v1</html>"));
    let clients = Arc::new(PageClients::new());
    let (page, mut notifications) = clients.connect().await;

    let config = ControllerConfig::new("activity-tracker-shell-v1", root.clone(), document)
        .with_strategy(FetchStrategy::StaleWhileRevalidate);
    let (controller, _events) =
        ShellCacheController::new(config, network.clone(), clients.clone())?;

    controller.install().await?;
    controller.activate().await?;
    tracing::info!(client = ?page, "controller active");

    // Offline navigation is served from the cached shell.
    network.set_online(false);
    let offline = controller
        .handle_fetch(&Request::get(root.clone()))
        .await
        .expect("shell is cached");
    tracing::info!(status = %offline.status, "offline navigation answered");

    // The page forces an update once the network is back.
    network.set_online(true);
    network.set_document("<html>activity tracker v2</html>");
    controller
        .handle_message(&json!({ "action": "FORCE_UPDATE" }))
        .await;
    if let Some(note) = notifications.recv().await {
        tracing::info!(?note, "page notified");
    }

    let refreshed = controller
        .handle_fetch(&Request::get(root))
        .await
        .expect("shell is cached");
    tracing::info!(body = %refreshed.text().unwrap_or_default(), "post-update shell");

    controller.wait_idle().await;
    Ok(())
}
