//! Deterministic policy names and resource strings.
//!
//! The same builder is used for create, update, delete, and search, so a
//! policy written by one operation is always found by the next.

use ranger_sync_core::{config::DEFAULT_POLICY_PREFIX, FeedIdentity, ResourceKind};

/// Join delimiter for resource lists on the wire.
pub const RESOURCE_DELIMITER: &str = ",";
/// Column permission for table policies; column-level control is not managed.
pub const WILDCARD_COLUMNS: &str = "*";

/// Builds `prefix + category + "_" + feed + "_" + kind` names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyNameBuilder {
    prefix: String,
}

impl Default for PolicyNameBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_POLICY_PREFIX)
    }
}

impl PolicyNameBuilder {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn policy_name(&self, identity: &FeedIdentity, kind: ResourceKind) -> String {
        format!(
            "{}{}_{}_{}",
            self.prefix,
            identity.category,
            identity.feed,
            kind.as_str()
        )
    }

    /// Comma-joined path resources; an empty list yields an empty string.
    pub fn path_resource(&self, paths: &[String]) -> String {
        paths.join(RESOURCE_DELIMITER)
    }

    /// Schema, comma-joined tables, and wildcard columns.
    pub fn table_resource(&self, schema: &str, tables: &[String]) -> TableResource {
        TableResource {
            databases: schema.to_string(),
            tables: tables.join(RESOURCE_DELIMITER),
            columns: WILDCARD_COLUMNS.to_string(),
        }
    }
}

/// Resource strings of a table policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableResource {
    pub databases: String,
    pub tables: String,
    pub columns: String,
}
