//! `ranger-sync grant create|update|delete`

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;

use ranger_sync_core::{FeedIdentity, GrantRequest, ResourceKind};
use ranger_sync_engine::{
    PolicyChange, PolicySynchronizer, RecordingPolicyClient, SyncSettings,
};

#[derive(Subcommand, Debug)]
pub enum GrantCommand {
    /// Create the path and table policies for a feed.
    Create(GrantArgs),
    /// Overwrite the existing path and table policies of a feed.
    Update(GrantArgs),
    /// Delete one of a feed's policies.
    Delete(DeleteArgs),
}

#[derive(Args, Debug)]
pub struct FeedArgs {
    #[arg(long)]
    pub category: String,

    #[arg(long)]
    pub feed: String,
}

impl FeedArgs {
    fn identity(&self) -> FeedIdentity {
        FeedIdentity::new(self.category.clone(), self.feed.clone())
    }
}

#[derive(Args, Debug)]
pub struct GrantArgs {
    #[command(flatten)]
    pub feed: FeedArgs,

    /// Security group granted read access (repeatable).
    #[arg(long = "group", value_name = "GROUP")]
    pub groups: Vec<String>,

    /// HDFS path resource (repeatable, order kept).
    #[arg(long = "path", value_name = "PATH")]
    pub paths: Vec<String>,

    /// Hive schema (database) of the tables.
    #[arg(long)]
    pub schema: String,

    /// Hive table name (repeatable, order kept).
    #[arg(long = "table", value_name = "TABLE")]
    pub tables: Vec<String>,

    /// Print the policies that would be sent without contacting Ranger.
    #[arg(long)]
    pub dry_run: bool,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl GrantArgs {
    fn request(&self) -> GrantRequest {
        GrantRequest::new(
            self.groups.iter().cloned(),
            self.paths.iter().cloned(),
            self.schema.clone(),
            self.tables.iter().cloned(),
        )
    }
}

#[derive(Args, Debug)]
pub struct DeleteArgs {
    #[command(flatten)]
    pub feed: FeedArgs,

    /// Policy kind: hdfs (path) or hive (table).
    #[arg(long)]
    pub kind: ResourceKind,
}

pub fn run(command: GrantCommand) -> Result<()> {
    match command {
        GrantCommand::Create(args) if args.dry_run => dry_run_create(&args),
        GrantCommand::Create(args) => {
            let sync = super::connect()?;
            let changes = sync
                .create_read_only_grant(&args.feed.identity(), &args.request())
                .context("failed to create read-only grant")?;
            print_changes(&changes, args.json)
        }
        GrantCommand::Update(args) => {
            let sync = super::connect()?;
            let changes = sync
                .update_read_only_grant(&args.feed.identity(), &args.request())
                .context("failed to update read-only grant")?;
            print_changes(&changes, args.json)
        }
        GrantCommand::Delete(args) => {
            let sync = super::connect()?;
            let change = sync
                .delete_grant(&args.feed.identity(), args.kind)
                .context("failed to delete grant")?;
            print_changes(&[change], false)
        }
    }
}

/// Run the create against an in-memory client and print what it received.
fn dry_run_create(args: &GrantArgs) -> Result<()> {
    let connection = super::load_connection()?;
    let sync = PolicySynchronizer::new(RecordingPolicyClient::new(), SyncSettings::from(&connection));
    sync.create_read_only_grant(&args.feed.identity(), &args.request())
        .context("failed to build policies")?;

    let payloads = sync.client().created();
    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&payloads).context("failed to render payload JSON")?
        );
        return Ok(());
    }
    for payload in payloads {
        println!(
            "[dry-run] would create {} policy {}",
            payload.repository_type,
            payload.policy_name.bold()
        );
        println!(
            "{}",
            serde_json::to_string_pretty(&payload).context("failed to render payload JSON")?
        );
    }
    Ok(())
}

fn print_changes(changes: &[PolicyChange], json: bool) -> Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(changes).context("failed to render JSON")?
        );
        return Ok(());
    }
    for change in changes {
        println!("{} {change}", "✓".green());
    }
    Ok(())
}
