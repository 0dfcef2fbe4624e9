//! `ranger-sync publish <event.json>`

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use ranger_sync_core::FeedPropertyChangeEvent;
use ranger_sync_daemon::request_publish;

/// Send a feed property change event file to the running daemon.
#[derive(Args, Debug)]
pub struct PublishArgs {
    /// JSON file holding one feed property change event.
    pub file: PathBuf,
}

impl PublishArgs {
    pub fn run(self) -> Result<()> {
        let raw = fs::read_to_string(&self.file)
            .with_context(|| format!("failed to read {}", self.file.display()))?;
        let event: FeedPropertyChangeEvent = serde_json::from_str(&raw)
            .with_context(|| format!("{} is not a feed property change event", self.file.display()))?;

        let home = super::home()?;
        let summary = request_publish(&home, event).context("failed to publish event")?;
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("failed to render JSON")?
        );
        Ok(())
    }
}
