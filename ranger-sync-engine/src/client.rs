//! The port through which the synchronizer reaches the policy engine.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use ranger_sync_core::{Group, PolicyId, PolicyQuery, RemotePolicy, ResourceKind};

use crate::error::ClientError;

/// Search / create / update / delete primitives of the remote policy engine.
///
/// Implementations own transport concerns (auth, timeouts, wire encoding).
/// They must not retry; the caller classifies and surfaces every failure.
pub trait PolicyClient: Send + Sync {
    fn search(&self, query: &PolicyQuery) -> Result<Vec<RemotePolicy>, ClientError>;

    fn create(&self, payload: &PolicyPayload) -> Result<(), ClientError>;

    fn update(&self, payload: &PolicyPayload, policy_id: PolicyId) -> Result<(), ClientError>;

    fn delete(&self, policy_id: PolicyId) -> Result<(), ClientError>;

    fn get_group(&self, name: &str) -> Result<Option<Group>, ClientError>;

    fn list_groups(&self) -> Result<Vec<Group>, ClientError>;
}

impl<C: PolicyClient + ?Sized> PolicyClient for Arc<C> {
    fn search(&self, query: &PolicyQuery) -> Result<Vec<RemotePolicy>, ClientError> {
        (**self).search(query)
    }

    fn create(&self, payload: &PolicyPayload) -> Result<(), ClientError> {
        (**self).create(payload)
    }

    fn update(&self, payload: &PolicyPayload, policy_id: PolicyId) -> Result<(), ClientError> {
        (**self).update(payload, policy_id)
    }

    fn delete(&self, policy_id: PolicyId) -> Result<(), ClientError> {
        (**self).delete(policy_id)
    }

    fn get_group(&self, name: &str) -> Result<Option<Group>, ClientError> {
        (**self).get_group(name)
    }

    fn list_groups(&self) -> Result<Vec<Group>, ClientError> {
        (**self).list_groups()
    }
}

/// Groups and the permissions granted to all of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermMap {
    #[serde(default)]
    pub group_list: Vec<String>,
    #[serde(default)]
    pub perm_list: Vec<String>,
}

/// Body of a policy create or update request.
///
/// Path policies carry `resource_name` and `is_recursive`; table policies
/// carry `databases`, `tables`, `columns`, and `udfs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyPayload {
    pub policy_name: String,
    pub repository_name: String,
    pub repository_type: ResourceKind,
    pub description: String,
    pub is_enabled: bool,
    pub is_audit_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_recursive: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub databases: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tables: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub udfs: Option<String>,
    pub perm_map_list: Vec<PermMap>,
}

impl PolicyPayload {
    /// Permission map for a set of groups; no groups yields an empty map.
    pub fn grant_to<'a>(
        groups: impl IntoIterator<Item = &'a String>,
        permissions: &[&str],
    ) -> Vec<PermMap> {
        let group_list: Vec<String> = groups.into_iter().cloned().collect();
        if group_list.is_empty() {
            return Vec::new();
        }
        vec![PermMap {
            group_list,
            perm_list: permissions.iter().map(|p| (*p).to_string()).collect(),
        }]
    }

    /// Every permission named anywhere in the payload.
    pub fn permissions(&self) -> Vec<&str> {
        let mut perms: Vec<&str> = self
            .perm_map_list
            .iter()
            .flat_map(|m| m.perm_list.iter().map(String::as_str))
            .collect();
        perms.sort_unstable();
        perms.dedup();
        perms
    }
}
