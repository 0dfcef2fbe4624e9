//! `ranger-sync init --host <host> --username <user> --password <pw> ...`

use anyhow::{bail, Context, Result};
use clap::Args;

use ranger_sync_core::{
    config::{self, DEFAULT_POLICY_PREFIX},
    RangerConnection,
};

/// Save the Ranger connection to ~/.ranger-sync/connection.yaml.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Ranger admin host name.
    #[arg(long)]
    pub host: String,

    /// Ranger admin port.
    #[arg(long, default_value_t = 6080)]
    pub port: u16,

    /// `http` or `https`.
    #[arg(long, default_value = "http")]
    pub scheme: String,

    #[arg(long, short = 'u')]
    pub username: String,

    #[arg(long)]
    pub password: String,

    /// Ranger repository holding HDFS path policies.
    #[arg(long = "hdfs-repo", value_name = "NAME")]
    pub hdfs_repo: String,

    /// Ranger repository holding Hive table policies.
    #[arg(long = "hive-repo", value_name = "NAME")]
    pub hive_repo: String,

    /// Prefix of every managed policy name.
    #[arg(long, default_value = DEFAULT_POLICY_PREFIX)]
    pub prefix: String,

    /// Per-request timeout in seconds.
    #[arg(long = "timeout", default_value_t = 30)]
    pub timeout_secs: u64,

    /// Overwrite an existing connection file.
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    pub fn run(self) -> Result<()> {
        let home = super::home()?;
        let path = config::connection_path_at(&home);
        if path.exists() && !self.force {
            bail!(
                "connection already configured at {} (use --force to overwrite)",
                path.display()
            );
        }

        let mut connection = RangerConnection::new(
            self.host,
            self.port,
            self.username,
            self.password,
            self.hdfs_repo,
            self.hive_repo,
        );
        connection.scheme = self.scheme;
        connection.policy_prefix = self.prefix;
        connection.timeout_secs = self.timeout_secs;

        let saved = config::save_at(&home, &connection)
            .context("failed to save Ranger connection")?;
        println!("✓ Ranger connection {} saved", connection.base_url());
        println!("  Saved to: {}", saved.display());
        Ok(())
    }
}
