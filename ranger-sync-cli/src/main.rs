//! ranger-sync: keep Ranger read-only policies in step with feed metadata.
//!
//! # Usage
//!
//! ```text
//! ranger-sync init --host <host> --username <user> --password <pw> --hdfs-repo <r> --hive-repo <r>
//! ranger-sync grant create|update --category <c> --feed <f> --group <g>... --path <p>... --schema <s> --table <t>... [--dry-run]
//! ranger-sync grant delete --category <c> --feed <f> --kind hdfs|hive
//! ranger-sync search [--name <policy>] [--kind hdfs|hive] [--json]
//! ranger-sync groups list|get <name>
//! ranger-sync publish <event.json>
//! ranger-sync daemon start|stop|status
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    daemon::DaemonCommand, grant::GrantCommand, groups::GroupsCommand, init::InitArgs,
    publish::PublishArgs, search::SearchArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "ranger-sync",
    version,
    about = "Synchronize read-only Ranger policies with feed registration metadata",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Save the Ranger connection used by every other command.
    Init(InitArgs),

    /// Create, update, or delete a feed's read-only grant.
    Grant {
        #[command(subcommand)]
        command: GrantCommand,
    },

    /// Search policies on the Ranger server.
    Search(SearchArgs),

    /// Look up security groups known to Ranger.
    Groups {
        #[command(subcommand)]
        command: GroupsCommand,
    },

    /// Send a feed property change event to the running daemon.
    Publish(PublishArgs),

    /// Run or control the event daemon.
    Daemon {
        #[command(subcommand)]
        command: DaemonCommand,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Init(args) => args.run(),
        Commands::Grant { command } => commands::grant::run(command),
        Commands::Search(args) => args.run(),
        Commands::Groups { command } => commands::groups::run(command),
        Commands::Publish(args) => args.run(),
        Commands::Daemon { command } => commands::daemon::run(command),
    }
}
