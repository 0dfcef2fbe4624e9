//! # ranger-sync-engine
//!
//! Keeps read-only Ranger policies in step with a feed's registration
//! metadata.
//!
//! Call [`PolicySynchronizer::create_read_only_grant`] (and its update /
//! delete siblings) directly, or attach an [`EventDispatcher`] to an
//! [`EventSource`] so property-change events drive the synchronizer.
//! The remote engine is reached only through the [`PolicyClient`] port;
//! [`RangerRestClient`] is the HTTP adapter and [`RecordingPolicyClient`]
//! the in-memory one.

pub mod backend;
pub mod change;
pub mod client;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod naming;
pub mod recording;
pub mod rest;
pub mod synchronizer;

pub use backend::{AuthorizationBackend, BackendType};
pub use change::requires_sync;
pub use client::{PermMap, PolicyClient, PolicyPayload};
pub use dispatch::{DispatchOutcome, DispatcherState, EventDispatcher, IgnoreReason, CATEGORY_PREFIX};
pub use error::{ClientError, DispatchError, SyncError, WriteOp};
pub use events::{EventBus, EventSource, FeedPropertyChangeListener};
pub use naming::PolicyNameBuilder;
pub use recording::{ClientCall, FailOn, RecordingPolicyClient};
pub use rest::RangerRestClient;
pub use synchronizer::{PolicyChange, PolicySynchronizer, SyncSettings};
