//! ranger-sync core library: domain types, connection config, errors.
//!
//! - [`types`]: identities, grant requests, remote policies, feed events
//! - [`config`]: [`RangerConnection`] load / save / validate
//! - [`error`]: [`ConfigError`], [`ParseKindError`]

pub mod config;
pub mod error;
pub mod types;

pub use config::RangerConnection;
pub use error::{ConfigError, ParseKindError};
pub use types::{
    FeedIdentity, FeedPropertyChangeEvent, GrantRequest, Group, PolicyId, PolicyQuery,
    PropertySnapshot, RemotePolicy, ResourceKind,
};
