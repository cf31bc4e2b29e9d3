//! Strategies for answering intercepted GET requests.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ControllerError;

/// How the interceptor answers a GET request.
///
/// Swapping the strategy never touches the lifecycle or update-channel code;
/// it only changes how `handle_fetch` routes between cache and network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FetchStrategy {
    /// Serve cache hits immediately; go to network on a miss; synthesize a
    /// 503 when both fail. Misses are not written back.
    CacheFirst,
    /// Ask the network first and write successful responses back in the
    /// background; fall back to cache when offline.
    NetworkFirst,
    /// Serve the cached entry immediately and refresh it from the network in
    /// the background.
    #[default]
    StaleWhileRevalidate,
}

impl fmt::Display for FetchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchStrategy::CacheFirst => write!(f, "cache-first"),
            FetchStrategy::NetworkFirst => write!(f, "network-first"),
            FetchStrategy::StaleWhileRevalidate => write!(f, "stale-while-revalidate"),
        }
    }
}

impl FromStr for FetchStrategy {
    type Err = ControllerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cache-first" => Ok(FetchStrategy::CacheFirst),
            "network-first" => Ok(FetchStrategy::NetworkFirst),
            "stale-while-revalidate" => Ok(FetchStrategy::StaleWhileRevalidate),
            other => Err(ControllerError::Config(format!(
                "unknown fetch strategy: {other}"
            ))),
        }
    }
}
