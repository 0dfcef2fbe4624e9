//! `ranger-sync groups list|get <name>`

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use tabled::{settings::Style, Table, Tabled};

use ranger_sync_core::Group;

#[derive(Subcommand, Debug)]
pub enum GroupsCommand {
    /// List every group.
    List {
        /// Emit machine-readable JSON.
        #[arg(long)]
        json: bool,
    },
    /// Show one group by exact name.
    Get { name: String },
}

#[derive(Tabled)]
struct GroupRow {
    #[tabled(rename = "id")]
    id: u64,
    #[tabled(rename = "name")]
    name: String,
    #[tabled(rename = "description")]
    description: String,
}

impl From<Group> for GroupRow {
    fn from(group: Group) -> Self {
        Self {
            id: group.id,
            name: group.name,
            description: group.description.unwrap_or_default(),
        }
    }
}

pub fn run(command: GroupsCommand) -> Result<()> {
    let sync = super::connect()?;
    match command {
        GroupsCommand::List { json } => {
            let groups = sync.list_groups().context("failed to list groups")?;
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&groups).context("failed to render JSON")?
                );
                return Ok(());
            }
            let mut table = Table::new(groups.into_iter().map(GroupRow::from));
            table.with(Style::rounded());
            println!("{table}");
        }
        GroupsCommand::Get { name } => {
            let Some(group) = sync
                .get_group_by_name(&name)
                .with_context(|| format!("failed to look up group '{name}'"))?
            else {
                bail!("group '{name}' not found");
            };
            println!(
                "{}",
                serde_json::to_string_pretty(&group).context("failed to render JSON")?
            );
        }
    }
    Ok(())
}
