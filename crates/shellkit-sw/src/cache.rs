//! Named cache stores keyed by request identity.

use hashbrown::HashMap;
use http::Method;
use url::Url;

use crate::fetch::{Request, Response};
use crate::ControllerError;

/// Identity of a cache entry: method plus URL. Effectively GET-only, since
/// the interceptor never stores anything else.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Request method.
    pub method: Method,
    /// Request URL.
    pub url: Url,
}

impl CacheKey {
    /// Key for a GET of the given URL.
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
        }
    }

    /// Key identifying a request.
    pub fn for_request(request: &Request) -> Self {
        Self {
            method: request.method.clone(),
            url: request.url.clone(),
        }
    }
}

/// A single named cache store.
///
/// Entries are opaque response blobs; writes are overwrite-only, so concurrent
/// writers to the same key are safe (last write wins). `put` refuses
/// non-success responses, which makes the "never persist an error response"
/// invariant structural rather than a caller convention.
#[derive(Debug, Default)]
pub struct Cache {
    name: String,
    entries: HashMap<CacheKey, Response>,
}

impl Cache {
    /// Create a new cache.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            entries: HashMap::new(),
        }
    }

    /// Cache name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Match a request key against stored entries.
    pub fn match_request(&self, key: &CacheKey) -> Option<&Response> {
        self.entries.get(key)
    }

    /// Store a response, overwriting any existing entry for the key.
    ///
    /// Only HTTP-ok responses may be stored.
    pub fn put(&mut self, key: CacheKey, response: Response) -> Result<(), ControllerError> {
        if !response.is_success() {
            return Err(ControllerError::Cache(format!(
                "refusing to cache non-success response ({}) for {}",
                response.status, key.url
            )));
        }
        self.entries.insert(key, response);
        Ok(())
    }

    /// Delete an entry.
    pub fn delete(&mut self, key: &CacheKey) -> bool {
        self.entries.remove(key).is_some()
    }

    /// All stored keys.
    pub fn keys(&self) -> Vec<&CacheKey> {
        self.entries.keys().collect()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// All named caches known to the runtime.
#[derive(Debug, Default)]
pub struct CacheStorage {
    caches: HashMap<String, Cache>,
}

impl CacheStorage {
    /// Create new cache storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a cache, creating it if absent.
    pub fn open(&mut self, name: &str) -> &mut Cache {
        self.caches
            .entry(name.to_string())
            .or_insert_with(|| Cache::new(name))
    }

    /// Borrow a cache without creating it.
    pub fn get(&self, name: &str) -> Option<&Cache> {
        self.caches.get(name)
    }

    /// Check if a cache exists.
    pub fn has(&self, name: &str) -> bool {
        self.caches.contains_key(name)
    }

    /// Delete a cache and all its entries.
    pub fn delete(&mut self, name: &str) -> bool {
        self.caches.remove(name).is_some()
    }

    /// Names of all caches.
    pub fn keys(&self) -> Vec<&str> {
        self.caches.keys().map(|s| s.as_str()).collect()
    }
}
