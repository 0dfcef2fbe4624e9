//! Error types for ranger-sync-engine.
//!
//! Three layers, innermost first:
//! - [`ClientError`]: one failed call to the policy engine
//! - [`SyncError`]: a classified synchronization failure
//! - [`DispatchError`]: a synchronization failure triggered by an event

use std::fmt;

use thiserror::Error;

use ranger_sync_core::{FeedIdentity, ResourceKind};

/// Failure of a single call through the [`crate::PolicyClient`] port.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The policy engine answered with a non-success status.
    #[error("HTTP {status} from {url}: {body}")]
    Status {
        status: u16,
        url: String,
        body: String,
    },

    /// The request never produced a response (DNS, connect, timeout, TLS).
    #[error("transport error calling {url}: {message}")]
    Transport { url: String, message: String },

    /// The response body did not match the expected shape.
    #[error("failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },

    /// The engine refused the request without an HTTP exchange
    /// (in-memory clients).
    #[error("policy engine rejected request: {0}")]
    Rejected(String),
}

/// Mutation attempted against the policy engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOp {
    Create,
    Update,
    Delete,
}

impl fmt::Display for WriteOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteOp::Create => f.write_str("create"),
            WriteOp::Update => f.write_str("update"),
            WriteOp::Delete => f.write_str("delete"),
        }
    }
}

/// All classified failures of a synchronization attempt. None are retried.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A required registration property is missing or empty.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Search found no policy where exactly one was required.
    #[error("no {kind} policy named '{policy_name}' found")]
    PolicyNotFound {
        policy_name: String,
        kind: ResourceKind,
    },

    /// Search found several policies where exactly one was required.
    #[error("{count} {kind} policies named '{policy_name}' found; expected exactly one")]
    AmbiguousPolicy {
        policy_name: String,
        kind: ResourceKind,
        count: usize,
    },

    /// A create / update / delete call failed. Later resource kinds in the
    /// same operation were skipped.
    #[error("failed to {op} {kind} policy '{policy_name}': {source}")]
    RemoteWrite {
        op: WriteOp,
        kind: ResourceKind,
        policy_name: String,
        #[source]
        source: ClientError,
    },

    /// A search or group lookup failed.
    #[error("policy engine lookup failed: {0}")]
    RemoteRead(#[source] ClientError),
}

impl SyncError {
    /// Resource kind the failure is attributed to, when there is one.
    pub fn kind(&self) -> Option<ResourceKind> {
        match self {
            SyncError::PolicyNotFound { kind, .. }
            | SyncError::AmbiguousPolicy { kind, .. }
            | SyncError::RemoteWrite { kind, .. } => Some(*kind),
            SyncError::Validation(_) | SyncError::RemoteRead(_) => None,
        }
    }
}

/// A synchronization failure raised while handling a property change event.
#[derive(Debug, Error)]
#[error("policy sync failed for feed '{feed}' after property change: {cause}")]
pub struct DispatchError {
    pub feed: FeedIdentity,
    #[source]
    pub cause: SyncError,
}

impl DispatchError {
    pub fn new(feed: FeedIdentity, cause: SyncError) -> Self {
        Self { feed, cause }
    }
}
