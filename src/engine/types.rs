// src/engine/types.rs
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;
use url::Url;
use uuid::Uuid;

use crate::data::Resource;

/// Ties a fetch result back to the fetch that asked for it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Correlation(pub Uuid);

impl Correlation {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for Correlation {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Correlation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outbound request to the network collaborator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchRequest {
    pub correlation: Correlation,
    pub resource: Resource,
    pub url: Url,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshReason {
    /// A read found nothing to serve.
    Missing,
    /// Somebody asked for it.
    Requested,
    /// Snapshot older than the configured max age.
    Expired,
    Startup,
}

/// What a refresh trigger did.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    Issued(Correlation),
    /// A fetch or apply for this resource is already running.
    Coalesced,
    /// The network collaborator is gone; nothing was sent.
    Unavailable,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    FetchInFlight,
    Applying,
}

/// Operator view of one resource.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LaneStatus {
    pub resource: Resource,
    pub phase: Phase,
    pub in_flight: Option<Correlation>,
    pub last_refreshed: Option<DateTime<Utc>>,
    pub last_failure: Option<String>,
    pub fetches_issued: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("fetch sink closed")]
pub struct SinkClosed;

/// Where outbound fetch requests go. Sends must not block.
pub trait FetchSink: Send + Sync {
    fn submit(&self, request: FetchRequest) -> Result<(), SinkClosed>;
}

impl FetchSink for UnboundedSender<FetchRequest> {
    fn submit(&self, request: FetchRequest) -> Result<(), SinkClosed> {
        self.send(request).map_err(|_| SinkClosed)
    }
}
