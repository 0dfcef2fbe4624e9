//! In-memory [`PolicyClient`] that records every call.
//!
//! Behaves like a tiny policy engine: creates store a policy under a fresh
//! id, searches match on exact name and kind, updates and deletes act on
//! the stored set. Individual calls can be scripted to fail. Used for
//! `--dry-run` and in tests.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use ranger_sync_core::{Group, PolicyId, PolicyQuery, RemotePolicy, ResourceKind};

use crate::client::{PolicyClient, PolicyPayload};
use crate::error::ClientError;

/// One call received by a [`RecordingPolicyClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCall {
    Search(PolicyQuery),
    Create(PolicyPayload),
    Update {
        policy_id: PolicyId,
        payload: PolicyPayload,
    },
    Delete(PolicyId),
    GetGroup(String),
    ListGroups,
}

/// A call that should fail instead of taking effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailOn {
    Search,
    Create(ResourceKind),
    Update(ResourceKind),
    Delete(PolicyId),
}

#[derive(Debug, Default)]
struct State {
    policies: Vec<RemotePolicy>,
    groups: Vec<Group>,
    failures: Vec<FailOn>,
    calls: Vec<ClientCall>,
    next_id: u64,
}

#[derive(Debug, Default)]
pub struct RecordingPolicyClient {
    state: Mutex<State>,
}

impl RecordingPolicyClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Client that already knows `policies`.
    pub fn with_policies(policies: impl IntoIterator<Item = RemotePolicy>) -> Self {
        let client = Self::new();
        for policy in policies {
            client.insert_policy(policy);
        }
        client
    }

    pub fn insert_policy(&self, policy: RemotePolicy) {
        let mut state = self.lock();
        state.next_id = state.next_id.max(policy.policy_id.0);
        state.policies.push(policy);
    }

    pub fn insert_group(&self, group: Group) {
        self.lock().groups.push(group);
    }

    pub fn fail_on(&self, rule: FailOn) {
        self.lock().failures.push(rule);
    }

    /// Snapshot of all calls received so far, in order.
    pub fn calls(&self) -> Vec<ClientCall> {
        self.lock().calls.clone()
    }

    /// Snapshot of the stored policies.
    pub fn policies(&self) -> Vec<RemotePolicy> {
        self.lock().policies.clone()
    }

    pub fn created(&self) -> Vec<PolicyPayload> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ClientCall::Create(payload) => Some(payload),
                _ => None,
            })
            .collect()
    }

    pub fn updated(&self) -> Vec<(PolicyId, PolicyPayload)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ClientCall::Update { policy_id, payload } => Some((policy_id, payload)),
                _ => None,
            })
            .collect()
    }

    pub fn deleted(&self) -> Vec<PolicyId> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ClientCall::Delete(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl State {
    fn record(&mut self, call: ClientCall) {
        self.calls.push(call);
    }

    fn check(&self, rule: &FailOn) -> Result<(), ClientError> {
        if self.failures.contains(rule) {
            return Err(ClientError::Rejected(format!("scripted failure: {rule:?}")));
        }
        Ok(())
    }
}

impl PolicyClient for RecordingPolicyClient {
    fn search(&self, query: &PolicyQuery) -> Result<Vec<RemotePolicy>, ClientError> {
        let mut state = self.lock();
        state.record(ClientCall::Search(query.clone()));
        state.check(&FailOn::Search)?;
        Ok(state
            .policies
            .iter()
            .filter(|p| {
                query
                    .policy_name
                    .as_ref()
                    .map_or(true, |name| &p.policy_name == name)
                    && query.resource_kind.map_or(true, |kind| p.resource_kind == kind)
            })
            .cloned()
            .collect())
    }

    fn create(&self, payload: &PolicyPayload) -> Result<(), ClientError> {
        let mut state = self.lock();
        state.record(ClientCall::Create(payload.clone()));
        state.check(&FailOn::Create(payload.repository_type))?;
        state.next_id += 1;
        let policy = remote_policy(PolicyId(state.next_id), payload);
        state.policies.push(policy);
        Ok(())
    }

    fn update(&self, payload: &PolicyPayload, policy_id: PolicyId) -> Result<(), ClientError> {
        let mut state = self.lock();
        state.record(ClientCall::Update {
            policy_id,
            payload: payload.clone(),
        });
        state.check(&FailOn::Update(payload.repository_type))?;
        let Some(existing) = state.policies.iter_mut().find(|p| p.policy_id == policy_id) else {
            return Err(ClientError::Rejected(format!("no policy with id {policy_id}")));
        };
        *existing = remote_policy(policy_id, payload);
        Ok(())
    }

    fn delete(&self, policy_id: PolicyId) -> Result<(), ClientError> {
        let mut state = self.lock();
        state.record(ClientCall::Delete(policy_id));
        state.check(&FailOn::Delete(policy_id))?;
        let before = state.policies.len();
        state.policies.retain(|p| p.policy_id != policy_id);
        if state.policies.len() == before {
            return Err(ClientError::Rejected(format!("no policy with id {policy_id}")));
        }
        Ok(())
    }

    fn get_group(&self, name: &str) -> Result<Option<Group>, ClientError> {
        let mut state = self.lock();
        state.record(ClientCall::GetGroup(name.to_string()));
        Ok(state.groups.iter().find(|g| g.name == name).cloned())
    }

    fn list_groups(&self) -> Result<Vec<Group>, ClientError> {
        let mut state = self.lock();
        state.record(ClientCall::ListGroups);
        Ok(state.groups.clone())
    }
}

fn remote_policy(policy_id: PolicyId, payload: &PolicyPayload) -> RemotePolicy {
    let mut group_permissions: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for map in &payload.perm_map_list {
        for group in &map.group_list {
            group_permissions
                .entry(group.clone())
                .or_default()
                .extend(map.perm_list.iter().cloned());
        }
    }
    RemotePolicy {
        policy_id,
        policy_name: payload.policy_name.clone(),
        resource_kind: payload.repository_type,
        description: payload.description.clone(),
        enabled: payload.is_enabled,
        recursive: payload.is_recursive.unwrap_or(false),
        audit_enabled: payload.is_audit_enabled,
        group_permissions,
    }
}
