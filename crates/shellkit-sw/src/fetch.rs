//! Request/response types and the network seam.

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};
use url::Url;

use crate::ControllerError;

/// How a fetch may be satisfied by intermediate HTTP caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    /// Normal HTTP caching semantics.
    #[default]
    Default,
    /// Bypass every intermediate cache and force a true round-trip.
    Bypass,
}

/// A request as seen by the interceptor.
#[derive(Debug, Clone)]
pub struct Request {
    /// Request method.
    pub method: Method,
    /// Request URL.
    pub url: Url,
    /// Intermediate-cache behavior for this fetch.
    pub cache_mode: CacheMode,
}

impl Request {
    /// Create a GET request.
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            cache_mode: CacheMode::Default,
        }
    }

    /// Create a GET request that bypasses intermediate HTTP caches.
    pub fn get_bypassing_cache(url: Url) -> Self {
        Self {
            cache_mode: CacheMode::Bypass,
            ..Self::get(url)
        }
    }

    /// Check if this is a GET request.
    pub fn is_get(&self) -> bool {
        self.method == Method::GET
    }
}

/// A response, either live from the network or replayed from cache.
///
/// Cloning is cheap: the body is a reference-counted `Bytes`. This is what
/// lets one copy go to the caller and one copy go to storage.
#[derive(Debug, Clone)]
pub struct Response {
    /// HTTP status code.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Response body.
    pub body: Bytes,
}

impl Response {
    /// Create a response with the given status and body.
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// Create a 200 OK response.
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self::new(StatusCode::OK, body)
    }

    /// Synthetic 503 returned when neither cache nor network can answer.
    pub fn service_unavailable() -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, Bytes::new())
    }

    /// Check if response is success (2xx).
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Get a header value as a string.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Get body as text.
    pub fn text(&self) -> Result<String, std::string::FromUtf8Error> {
        String::from_utf8(self.body.to_vec())
    }
}

/// The injected network collaborator.
///
/// Implementations perform the actual network round-trip; the controller only
/// decides when to ask for one. `CacheMode::Bypass` requests must not be
/// satisfied from any intermediate cache.
#[async_trait]
pub trait NetworkFetcher: Send + Sync {
    /// Fetch a resource from the network.
    async fn fetch(&self, request: &Request) -> Result<Response, ControllerError>;
}
