//! Domain types for policy synchronization.
//!
//! Everything here is plain data: identities, desired-state grant requests,
//! the remote engine's view of a policy, and feed property snapshots. All
//! types are serializable via serde so the daemon socket and the CLI `--json`
//! output share one representation.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseKindError;

/// Registration property holding the feed's HDFS folders (newline separated).
pub const REGISTRATION_HDFS_FOLDERS: &str = "nifi:registration:hdfsFolders";
/// Registration property holding the feed's Hive schema.
pub const REGISTRATION_HIVE_SCHEMA: &str = "nifi:registration:hiveSchema";
/// Registration property holding the feed's Hive tables (newline separated).
pub const REGISTRATION_HIVE_TABLES: &str = "nifi:registration:tableNames";

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Identifier the policy engine assigns to a stored policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolicyId(pub u64);

impl fmt::Display for PolicyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<u64> for PolicyId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// The (category, feed) pair every policy name is derived from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeedIdentity {
    pub category: String,
    pub feed: String,
}

impl FeedIdentity {
    pub fn new(category: impl Into<String>, feed: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            feed: feed.into(),
        }
    }
}

impl fmt::Display for FeedIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.category, self.feed)
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Category of protected resource a policy governs.
///
/// On the wire the policy engine calls these repository types: `hdfs` for
/// path policies and `hive` for table policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceKind {
    #[serde(rename = "hdfs")]
    Path,
    #[serde(rename = "hive")]
    Table,
}

impl ResourceKind {
    /// Both kinds, in the order grants are applied.
    pub fn all() -> &'static [ResourceKind] {
        &[ResourceKind::Path, ResourceKind::Table]
    }

    /// Repository type string used in policy names and search criteria.
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Path => "hdfs",
            ResourceKind::Table => "hive",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hdfs" | "path" => Ok(ResourceKind::Path),
            "hive" | "table" => Ok(ResourceKind::Table),
            _ => Err(ParseKindError(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Grants and remote policies
// ---------------------------------------------------------------------------

/// Desired read-only grant for one feed: who may read, and what.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GrantRequest {
    pub groups: BTreeSet<String>,
    pub path_resources: Vec<String>,
    pub table_schema: String,
    pub table_names: Vec<String>,
}

impl GrantRequest {
    pub fn new<G, P, T>(groups: G, path_resources: P, table_schema: impl Into<String>, table_names: T) -> Self
    where
        G: IntoIterator,
        G::Item: Into<String>,
        P: IntoIterator,
        P::Item: Into<String>,
        T: IntoIterator,
        T::Item: Into<String>,
    {
        Self {
            groups: groups.into_iter().map(Into::into).collect(),
            path_resources: path_resources.into_iter().map(Into::into).collect(),
            table_schema: table_schema.into(),
            table_names: table_names.into_iter().map(Into::into).collect(),
        }
    }
}

/// A policy as reported by the remote engine. Never cached locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemotePolicy {
    pub policy_id: PolicyId,
    pub policy_name: String,
    pub resource_kind: ResourceKind,
    #[serde(default)]
    pub description: String,
    pub enabled: bool,
    pub recursive: bool,
    pub audit_enabled: bool,
    /// Group name → permissions granted to it.
    #[serde(default)]
    pub group_permissions: BTreeMap<String, BTreeSet<String>>,
}

/// A security group known to the policy engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: u64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Typed search criteria. Unset fields are not sent.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PolicyQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_kind: Option<ResourceKind>,
}

impl PolicyQuery {
    /// Criteria matching one named policy of one kind.
    pub fn for_policy(policy_name: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            policy_name: Some(policy_name.into()),
            resource_kind: Some(kind),
        }
    }
}

// ---------------------------------------------------------------------------
// Feed property events
// ---------------------------------------------------------------------------

/// The authorization-relevant registration properties of a feed at one
/// point in time. Other properties in the same map are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PropertySnapshot {
    #[serde(
        rename = "nifi:registration:hdfsFolders",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub hdfs_folders: Option<String>,
    #[serde(
        rename = "nifi:registration:tableNames",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub hive_tables: Option<String>,
    #[serde(
        rename = "nifi:registration:hiveSchema",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub hive_schema: Option<String>,
}

/// Emitted by the metadata service whenever a feed's properties change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedPropertyChangeEvent {
    pub feed_category: String,
    pub feed_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hadoop_security_group_names: Option<Vec<String>>,
    #[serde(default)]
    pub old_properties: PropertySnapshot,
    #[serde(default)]
    pub new_properties: PropertySnapshot,
}

impl FeedPropertyChangeEvent {
    pub fn feed(&self) -> FeedIdentity {
        FeedIdentity::new(self.feed_category.clone(), self.feed_name.clone())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
