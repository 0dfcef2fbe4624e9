//! Read-only grant synchronization for one feed.
//!
//! Every grant is two policies, one per [`ResourceKind`]: a recursive path
//! policy granting `read` and a table policy granting `select` on all
//! columns. Operations always handle the path policy first and stop at the
//! first failure.
//!
//! Updates and deletes are search-then-mutate: the policy is looked up by
//! its deterministic name and kind, exactly one match is required, and the
//! mutation is keyed by the identifier the engine returned. Nothing is
//! cached between calls.

use std::fmt;

use serde::Serialize;

use ranger_sync_core::{
    FeedIdentity, GrantRequest, Group, PolicyId, PolicyQuery, RangerConnection, RemotePolicy,
    ResourceKind,
};

use crate::client::{PolicyClient, PolicyPayload};
use crate::error::{SyncError, WriteOp};
use crate::naming::PolicyNameBuilder;

const PATH_PERMISSIONS: &[&str] = &["read"];
const TABLE_PERMISSIONS: &[&str] = &["select"];

/// Immutable settings shared by every operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSettings {
    pub names: PolicyNameBuilder,
    pub hdfs_repository_name: String,
    pub hive_repository_name: String,
}

impl SyncSettings {
    pub fn new(
        names: PolicyNameBuilder,
        hdfs_repository_name: impl Into<String>,
        hive_repository_name: impl Into<String>,
    ) -> Self {
        Self {
            names,
            hdfs_repository_name: hdfs_repository_name.into(),
            hive_repository_name: hive_repository_name.into(),
        }
    }

    fn repository_name(&self, kind: ResourceKind) -> &str {
        match kind {
            ResourceKind::Path => &self.hdfs_repository_name,
            ResourceKind::Table => &self.hive_repository_name,
        }
    }
}

impl From<&RangerConnection> for SyncSettings {
    fn from(connection: &RangerConnection) -> Self {
        Self::new(
            PolicyNameBuilder::new(connection.policy_prefix.clone()),
            connection.hdfs_repository_name.clone(),
            connection.hive_repository_name.clone(),
        )
    }
}

/// One policy the synchronizer changed on the remote engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PolicyChange {
    Created {
        kind: ResourceKind,
        policy_name: String,
    },
    Updated {
        kind: ResourceKind,
        policy_name: String,
        policy_id: PolicyId,
    },
    Deleted {
        kind: ResourceKind,
        policy_name: String,
        policy_id: PolicyId,
    },
}

impl PolicyChange {
    pub fn kind(&self) -> ResourceKind {
        match self {
            PolicyChange::Created { kind, .. }
            | PolicyChange::Updated { kind, .. }
            | PolicyChange::Deleted { kind, .. } => *kind,
        }
    }

    pub fn policy_name(&self) -> &str {
        match self {
            PolicyChange::Created { policy_name, .. }
            | PolicyChange::Updated { policy_name, .. }
            | PolicyChange::Deleted { policy_name, .. } => policy_name,
        }
    }
}

impl fmt::Display for PolicyChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyChange::Created { kind, policy_name } => {
                write!(f, "created {kind} policy {policy_name}")
            }
            PolicyChange::Updated {
                kind,
                policy_name,
                policy_id,
            } => write!(f, "updated {kind} policy {policy_name} (id {policy_id})"),
            PolicyChange::Deleted {
                kind,
                policy_name,
                policy_id,
            } => write!(f, "deleted {kind} policy {policy_name} (id {policy_id})"),
        }
    }
}

/// Drives a [`PolicyClient`] to keep a feed's read-only grants current.
///
/// Stateless apart from its settings, so one instance may serve concurrent
/// calls for different feeds. Calls for the same feed are not serialized.
pub struct PolicySynchronizer<C> {
    client: C,
    settings: SyncSettings,
}

impl<C: PolicyClient> PolicySynchronizer<C> {
    pub fn new(client: C, settings: SyncSettings) -> Self {
        Self { client, settings }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// Create the path and table policies without checking whether they
    /// already exist.
    ///
    /// If the path create fails the table create is not attempted. If the
    /// table create fails the path policy stays in place.
    pub fn create_read_only_grant(
        &self,
        identity: &FeedIdentity,
        request: &GrantRequest,
    ) -> Result<Vec<PolicyChange>, SyncError> {
        let mut changes = Vec::with_capacity(2);
        for &kind in ResourceKind::all() {
            let payload = self.payload(identity, kind, request, "created");
            if let Err(source) = self.client.create(&payload) {
                if let Some(orphan) = changes.last().map(PolicyChange::policy_name) {
                    tracing::warn!(
                        feed = %identity,
                        orphaned_policy = orphan,
                        "partial grant: earlier policy was created but {kind} policy was not"
                    );
                }
                return Err(SyncError::RemoteWrite {
                    op: WriteOp::Create,
                    kind,
                    policy_name: payload.policy_name,
                    source,
                });
            }
            tracing::info!(feed = %identity, kind = %kind, policy = %payload.policy_name, "created policy");
            changes.push(PolicyChange::Created {
                kind,
                policy_name: payload.policy_name,
            });
        }
        Ok(changes)
    }

    /// Look up each existing policy and overwrite it with the desired state.
    pub fn update_read_only_grant(
        &self,
        identity: &FeedIdentity,
        request: &GrantRequest,
    ) -> Result<Vec<PolicyChange>, SyncError> {
        let mut changes = Vec::with_capacity(2);
        for &kind in ResourceKind::all() {
            let payload = self.payload(identity, kind, request, "updated");
            let existing = self.find_unique(&payload.policy_name, kind)?;
            self.client
                .update(&payload, existing.policy_id)
                .map_err(|source| SyncError::RemoteWrite {
                    op: WriteOp::Update,
                    kind,
                    policy_name: payload.policy_name.clone(),
                    source,
                })?;
            tracing::info!(
                feed = %identity,
                kind = %kind,
                policy = %payload.policy_name,
                policy_id = %existing.policy_id,
                "updated policy"
            );
            changes.push(PolicyChange::Updated {
                kind,
                policy_name: payload.policy_name,
                policy_id: existing.policy_id,
            });
        }
        Ok(changes)
    }

    /// Delete the single policy of `kind` belonging to the feed.
    pub fn delete_grant(
        &self,
        identity: &FeedIdentity,
        kind: ResourceKind,
    ) -> Result<PolicyChange, SyncError> {
        let policy_name = self.settings.names.policy_name(identity, kind);
        let existing = self.find_unique(&policy_name, kind)?;
        self.client
            .delete(existing.policy_id)
            .map_err(|source| SyncError::RemoteWrite {
                op: WriteOp::Delete,
                kind,
                policy_name: policy_name.clone(),
                source,
            })?;
        tracing::info!(
            feed = %identity,
            kind = %kind,
            policy = %policy_name,
            policy_id = %existing.policy_id,
            "deleted policy"
        );
        Ok(PolicyChange::Deleted {
            kind,
            policy_name,
            policy_id: existing.policy_id,
        })
    }

    /// Whatever the engine returns for `query`, unfiltered.
    pub fn search_policies(&self, query: &PolicyQuery) -> Result<Vec<RemotePolicy>, SyncError> {
        self.client.search(query).map_err(SyncError::RemoteRead)
    }

    pub fn get_group_by_name(&self, name: &str) -> Result<Option<Group>, SyncError> {
        self.client.get_group(name).map_err(SyncError::RemoteRead)
    }

    pub fn list_groups(&self) -> Result<Vec<Group>, SyncError> {
        self.client.list_groups().map_err(SyncError::RemoteRead)
    }

    /// Exactly one policy named `policy_name` of `kind`, or an error.
    fn find_unique(&self, policy_name: &str, kind: ResourceKind) -> Result<RemotePolicy, SyncError> {
        let mut matches = self
            .client
            .search(&PolicyQuery::for_policy(policy_name, kind))
            .map_err(SyncError::RemoteRead)?;
        match matches.len() {
            0 => Err(SyncError::PolicyNotFound {
                policy_name: policy_name.to_string(),
                kind,
            }),
            1 => Ok(matches.remove(0)),
            count => Err(SyncError::AmbiguousPolicy {
                policy_name: policy_name.to_string(),
                kind,
                count,
            }),
        }
    }

    fn payload(
        &self,
        identity: &FeedIdentity,
        kind: ResourceKind,
        request: &GrantRequest,
        verb: &str,
    ) -> PolicyPayload {
        let names = &self.settings.names;
        let policy_name = names.policy_name(identity, kind);
        let mut payload = PolicyPayload {
            policy_name,
            repository_name: self.settings.repository_name(kind).to_string(),
            repository_type: kind,
            description: String::new(),
            is_enabled: true,
            is_audit_enabled: true,
            is_recursive: None,
            resource_name: None,
            databases: None,
            tables: None,
            columns: None,
            udfs: None,
            perm_map_list: Vec::new(),
        };
        match kind {
            ResourceKind::Path => {
                payload.description = describe(verb, &request.groups, &request.path_resources);
                payload.is_recursive = Some(true);
                payload.resource_name = Some(names.path_resource(&request.path_resources));
                payload.perm_map_list = PolicyPayload::grant_to(&request.groups, PATH_PERMISSIONS);
            }
            ResourceKind::Table => {
                let resource = names.table_resource(&request.table_schema, &request.table_names);
                payload.description = describe(verb, &request.groups, &request.table_names);
                payload.databases = Some(resource.databases);
                payload.tables = Some(resource.tables);
                payload.columns = Some(resource.columns);
                payload.udfs = Some(String::new());
                payload.perm_map_list = PolicyPayload::grant_to(&request.groups, TABLE_PERMISSIONS);
            }
        }
        payload
    }
}

fn describe<'a>(
    verb: &str,
    groups: impl IntoIterator<Item = &'a String>,
    resources: impl IntoIterator<Item = &'a String>,
) -> String {
    format!(
        "Ranger policy {verb} for group list {} for resource {}",
        bracketed(groups),
        bracketed(resources)
    )
}

fn bracketed<'a>(items: impl IntoIterator<Item = &'a String>) -> String {
    let joined: Vec<&str> = items.into_iter().map(String::as_str).collect();
    format!("[{}]", joined.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::{ClientCall, FailOn, RecordingPolicyClient};

    fn synchronizer() -> PolicySynchronizer<RecordingPolicyClient> {
        PolicySynchronizer::new(
            RecordingPolicyClient::new(),
            SyncSettings::new(PolicyNameBuilder::default(), "cl1_hadoop", "cl1_hive"),
        )
    }

    fn identity() -> FeedIdentity {
        FeedIdentity::new("kylo_sales", "orders")
    }

    fn request() -> GrantRequest {
        GrantRequest::new(["analysts"], ["/a", "/b"], "sales", ["orders"])
    }

    #[test]
    fn create_builds_path_then_table_payloads() {
        let sync = synchronizer();
        let changes = sync.create_read_only_grant(&identity(), &request()).expect("create");
        assert_eq!(changes.len(), 2);

        let created = sync.client().created();
        assert_eq!(created.len(), 2);
        let path = &created[0];
        assert_eq!(path.policy_name, "nifi_kylo_sales_orders_hdfs");
        assert_eq!(path.repository_name, "cl1_hadoop");
        assert_eq!(path.resource_name.as_deref(), Some("/a,/b"));
        assert_eq!(path.is_recursive, Some(true));
        assert_eq!(path.permissions(), vec!["read"]);
        assert_eq!(
            path.description,
            "Ranger policy created for group list [analysts] for resource [/a, /b]"
        );

        let table = &created[1];
        assert_eq!(table.policy_name, "nifi_kylo_sales_orders_hive");
        assert_eq!(table.repository_name, "cl1_hive");
        assert_eq!(table.databases.as_deref(), Some("sales"));
        assert_eq!(table.tables.as_deref(), Some("orders"));
        assert_eq!(table.columns.as_deref(), Some("*"));
        assert_eq!(table.udfs.as_deref(), Some(""));
        assert_eq!(table.permissions(), vec!["select"]);
    }

    #[test]
    fn table_failure_after_path_create_leaves_path_policy() {
        let sync = synchronizer();
        sync.client().fail_on(FailOn::Create(ResourceKind::Table));

        let err = sync.create_read_only_grant(&identity(), &request()).unwrap_err();

        assert!(matches!(
            err,
            SyncError::RemoteWrite { op: WriteOp::Create, kind: ResourceKind::Table, .. }
        ));
        let stored = sync.client().policies();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].policy_name, "nifi_kylo_sales_orders_hdfs");
    }

    #[test]
    fn update_uses_found_identifiers() {
        let sync = synchronizer();
        sync.create_read_only_grant(&identity(), &request()).expect("create");

        let changes = sync
            .update_read_only_grant(&identity(), &GrantRequest::new(["bi"], ["/c"], "sales", ["refunds"]))
            .expect("update");

        let ids: Vec<_> = sync.client().updated().into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![PolicyId(1), PolicyId(2)]);
        assert!(matches!(changes[1], PolicyChange::Updated { policy_id: PolicyId(2), .. }));
        let stored = sync.client().policies();
        assert!(stored[0].group_permissions.contains_key("bi"));
        assert!(!stored[0].group_permissions.contains_key("analysts"));
    }

    #[test]
    fn update_stops_before_table_when_path_policy_missing() {
        let sync = synchronizer();
        let err = sync.update_read_only_grant(&identity(), &request()).unwrap_err();
        assert!(matches!(err, SyncError::PolicyNotFound { kind: ResourceKind::Path, .. }));
        assert_eq!(
            sync.client().calls(),
            vec![ClientCall::Search(PolicyQuery::for_policy(
                "nifi_kylo_sales_orders_hdfs",
                ResourceKind::Path
            ))]
        );
    }

    #[test]
    fn failed_search_is_a_read_error() {
        let sync = synchronizer();
        sync.client().fail_on(FailOn::Search);
        let err = sync.delete_grant(&identity(), ResourceKind::Table).unwrap_err();
        assert!(matches!(err, SyncError::RemoteRead(_)));
        assert!(sync.client().deleted().is_empty());
    }

    #[test]
    fn empty_groups_produce_empty_permission_map() {
        let sync = synchronizer();
        let request = GrantRequest::new(Vec::<String>::new(), ["/a"], "sales", ["orders"]);
        sync.create_read_only_grant(&identity(), &request).expect("create");
        assert!(sync.client().created().iter().all(|p| p.perm_map_list.is_empty()));
    }

    #[test]
    fn settings_follow_connection() {
        let mut connection =
            RangerConnection::new("ranger", 6080, "admin", "pw", "cl1_hadoop", "cl1_hive");
        connection.policy_prefix = "etl_".to_string();
        let settings = SyncSettings::from(&connection);
        assert_eq!(settings.names.prefix(), "etl_");
        assert_eq!(settings.repository_name(ResourceKind::Table), "cl1_hive");
    }

    #[test]
    fn change_serializes_with_action_tag() {
        let change = PolicyChange::Deleted {
            kind: ResourceKind::Path,
            policy_name: "p".to_string(),
            policy_id: PolicyId(42),
        };
        let json = serde_json::to_value(&change).expect("serialize");
        assert_eq!(json["action"], "deleted");
        assert_eq!(json["kind"], "hdfs");
        assert_eq!(json["policy_id"], 42);
        assert_eq!(change.to_string(), "deleted hdfs policy p (id 42)");
    }
}
