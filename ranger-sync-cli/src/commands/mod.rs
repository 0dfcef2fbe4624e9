pub mod daemon;
pub mod grant;
pub mod groups;
pub mod init;
pub mod publish;
pub mod search;

use std::path::PathBuf;

use anyhow::{Context, Result};

use ranger_sync_core::{config, RangerConnection};
use ranger_sync_engine::{PolicySynchronizer, RangerRestClient, SyncSettings};

pub(crate) fn home() -> Result<PathBuf> {
    dirs::home_dir().context("could not determine home directory")
}

pub(crate) fn load_connection() -> Result<RangerConnection> {
    let home = home()?;
    config::load_at(&home).context("failed to load Ranger connection")
}

/// Synchronizer talking to the configured Ranger server.
pub(crate) fn connect() -> Result<PolicySynchronizer<RangerRestClient>> {
    let connection = load_connection()?;
    Ok(PolicySynchronizer::new(
        RangerRestClient::new(&connection),
        SyncSettings::from(&connection),
    ))
}
