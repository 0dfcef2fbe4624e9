//! `ranger-sync search [--name <policy>] [--kind hdfs|hive] [--json]`

use anyhow::{Context, Result};
use clap::Args;
use tabled::{settings::Style, Table, Tabled};

use ranger_sync_core::{PolicyQuery, RemotePolicy, ResourceKind};

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Exact policy name.
    #[arg(long)]
    pub name: Option<String>,

    /// Policy kind: hdfs (path) or hive (table).
    #[arg(long)]
    pub kind: Option<ResourceKind>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Tabled)]
struct PolicyRow {
    #[tabled(rename = "id")]
    id: u64,
    #[tabled(rename = "name")]
    name: String,
    #[tabled(rename = "kind")]
    kind: String,
    #[tabled(rename = "enabled")]
    enabled: bool,
    #[tabled(rename = "groups")]
    groups: String,
}

impl From<&RemotePolicy> for PolicyRow {
    fn from(policy: &RemotePolicy) -> Self {
        let groups: Vec<String> = policy
            .group_permissions
            .iter()
            .map(|(group, perms)| {
                let perms: Vec<&str> = perms.iter().map(String::as_str).collect();
                format!("{group} ({})", perms.join(","))
            })
            .collect();
        Self {
            id: policy.policy_id.0,
            name: policy.policy_name.clone(),
            kind: policy.resource_kind.to_string(),
            enabled: policy.enabled,
            groups: groups.join("; "),
        }
    }
}

impl SearchArgs {
    pub fn run(self) -> Result<()> {
        let sync = super::connect()?;
        let query = PolicyQuery {
            policy_name: self.name,
            resource_kind: self.kind,
        };
        let policies = sync
            .search_policies(&query)
            .context("failed to search policies")?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&policies).context("failed to render JSON")?
            );
            return Ok(());
        }

        if policies.is_empty() {
            println!("No matching policies.");
            return Ok(());
        }
        let mut table = Table::new(policies.iter().map(PolicyRow::from));
        table.with(Style::rounded());
        println!("{table}");
        Ok(())
    }
}
