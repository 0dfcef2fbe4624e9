//! Pluggable authorization backends.
//!
//! The event dispatcher talks to an [`AuthorizationBackend`] rather than a
//! concrete synchronizer, so other policy engines can be slotted in beside
//! Ranger.

use std::fmt;

use ranger_sync_core::{FeedIdentity, GrantRequest, Group, PolicyQuery, RemotePolicy, ResourceKind};

use crate::client::PolicyClient;
use crate::error::SyncError;
use crate::synchronizer::{PolicyChange, PolicySynchronizer};

/// Remote engine a backend targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendType {
    Ranger,
}

impl BackendType {
    pub fn as_str(self) -> &'static str {
        match self {
            BackendType::Ranger => "RANGER",
        }
    }
}

impl fmt::Display for BackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub trait AuthorizationBackend: Send + Sync {
    fn backend_type(&self) -> BackendType;

    fn get_group_by_name(&self, name: &str) -> Result<Option<Group>, SyncError>;

    fn list_groups(&self) -> Result<Vec<Group>, SyncError>;

    fn create_read_only_grant(
        &self,
        identity: &FeedIdentity,
        request: &GrantRequest,
    ) -> Result<Vec<PolicyChange>, SyncError>;

    fn update_read_only_grant(
        &self,
        identity: &FeedIdentity,
        request: &GrantRequest,
    ) -> Result<Vec<PolicyChange>, SyncError>;

    fn delete_grant(&self, identity: &FeedIdentity, kind: ResourceKind)
        -> Result<PolicyChange, SyncError>;

    fn search_policies(&self, query: &PolicyQuery) -> Result<Vec<RemotePolicy>, SyncError>;
}

impl<C: PolicyClient> AuthorizationBackend for PolicySynchronizer<C> {
    fn backend_type(&self) -> BackendType {
        BackendType::Ranger
    }

    fn get_group_by_name(&self, name: &str) -> Result<Option<Group>, SyncError> {
        PolicySynchronizer::get_group_by_name(self, name)
    }

    fn list_groups(&self) -> Result<Vec<Group>, SyncError> {
        PolicySynchronizer::list_groups(self)
    }

    fn create_read_only_grant(
        &self,
        identity: &FeedIdentity,
        request: &GrantRequest,
    ) -> Result<Vec<PolicyChange>, SyncError> {
        PolicySynchronizer::create_read_only_grant(self, identity, request)
    }

    fn update_read_only_grant(
        &self,
        identity: &FeedIdentity,
        request: &GrantRequest,
    ) -> Result<Vec<PolicyChange>, SyncError> {
        PolicySynchronizer::update_read_only_grant(self, identity, request)
    }

    fn delete_grant(
        &self,
        identity: &FeedIdentity,
        kind: ResourceKind,
    ) -> Result<PolicyChange, SyncError> {
        PolicySynchronizer::delete_grant(self, identity, kind)
    }

    fn search_policies(&self, query: &PolicyQuery) -> Result<Vec<RemotePolicy>, SyncError> {
        PolicySynchronizer::search_policies(self, query)
    }
}
