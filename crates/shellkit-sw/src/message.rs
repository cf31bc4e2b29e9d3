//! Page ↔ controller message protocol.
//!
//! Pages send tagged command objects; the controller broadcasts tagged
//! notification objects back. Any message that does not deserialize as a
//! known command is ignored.

use serde::{Deserialize, Serialize};

/// Command sent from a controlled page to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum Command {
    /// Pull the latest shell, bypassing caches, and report the outcome.
    #[serde(rename = "FORCE_UPDATE")]
    ForceUpdate,
}

impl Command {
    /// Parse a raw page message. Unrecognized shapes yield `None`.
    pub fn parse(message: &serde_json::Value) -> Option<Self> {
        serde_json::from_value(message.clone()).ok()
    }
}

/// Notification broadcast from the controller to every open page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Notification {
    /// A forced update landed; the cached shell is fresh.
    #[serde(rename = "UPDATE_COMPLETE")]
    UpdateComplete,
    /// A forced update could not fetch the shell; the cache is unchanged.
    #[serde(rename = "UPDATE_FAILED")]
    UpdateFailed,
}
