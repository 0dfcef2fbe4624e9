//! Turns feed property change events into read-only grant creation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ranger_sync_core::{FeedIdentity, FeedPropertyChangeEvent, GrantRequest, PropertySnapshot};

use crate::backend::AuthorizationBackend;
use crate::change::requires_sync;
use crate::error::{DispatchError, SyncError};
use crate::events::{EventSource, FeedPropertyChangeListener};
use crate::synchronizer::PolicyChange;

/// Prepended to the feed category before policy names are derived.
pub const CATEGORY_PREFIX: &str = "kylo_";

/// Why an event did not lead to a sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The event carried no security group names.
    NoSecurityGroups,
    /// None of the tracked registration properties changed.
    NoRelevantChange,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Ignored(IgnoreReason),
    Synced(Vec<PolicyChange>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
    Idle,
    Processing,
}

/// Listener that creates read-only grants when a feed's registration
/// properties change.
///
/// Holds no per-event state; concurrent events for different feeds are
/// independent.
pub struct EventDispatcher {
    backend: Arc<dyn AuthorizationBackend>,
    in_flight: AtomicUsize,
}

impl EventDispatcher {
    pub fn new(backend: Arc<dyn AuthorizationBackend>) -> Arc<Self> {
        Arc::new(Self {
            backend,
            in_flight: AtomicUsize::new(0),
        })
    }

    pub fn backend(&self) -> &Arc<dyn AuthorizationBackend> {
        &self.backend
    }

    pub fn state(&self) -> DispatcherState {
        if self.in_flight.load(Ordering::SeqCst) == 0 {
            DispatcherState::Idle
        } else {
            DispatcherState::Processing
        }
    }

    /// Subscribe to `source`.
    pub fn start(self: &Arc<Self>, source: &dyn EventSource) {
        source.subscribe(self.as_listener());
        tracing::info!(backend = %self.backend.backend_type(), "event dispatcher started");
    }

    /// Unsubscribe from `source`.
    pub fn stop(self: &Arc<Self>, source: &dyn EventSource) {
        source.unsubscribe(&self.as_listener());
        tracing::info!(backend = %self.backend.backend_type(), "event dispatcher stopped");
    }

    /// Handle one event.
    pub fn handle(&self, event: &FeedPropertyChangeEvent) -> Result<DispatchOutcome, DispatchError> {
        let feed = event.feed();
        let Some(groups) = &event.hadoop_security_group_names else {
            tracing::debug!(feed = %feed, "ignoring property change: no security groups");
            return Ok(DispatchOutcome::Ignored(IgnoreReason::NoSecurityGroups));
        };
        if !requires_sync(&event.old_properties, &event.new_properties) {
            tracing::debug!(feed = %feed, "ignoring property change: registration unchanged");
            return Ok(DispatchOutcome::Ignored(IgnoreReason::NoRelevantChange));
        }

        let result = {
            let _guard = InFlight::enter(&self.in_flight);
            self.sync(&feed, groups, &event.new_properties)
        };

        match result {
            Ok(changes) => Ok(DispatchOutcome::Synced(changes)),
            Err(cause) => {
                tracing::error!(feed = %feed, error = %cause, "policy sync failed");
                Err(DispatchError::new(feed, cause))
            }
        }
    }

    fn sync(
        &self,
        feed: &FeedIdentity,
        groups: &[String],
        properties: &PropertySnapshot,
    ) -> Result<Vec<PolicyChange>, SyncError> {
        let folders = required(properties.hdfs_folders.as_deref(), "hdfs folders")?;
        let tables = required(properties.hive_tables.as_deref(), "hive tables")?;
        let schema = required(properties.hive_schema.as_deref(), "hive schema")?;

        let request = GrantRequest::new(
            groups.iter().cloned(),
            entries(folders, "hdfs folders")?,
            schema,
            entries(tables, "hive tables")?,
        );
        let identity = FeedIdentity::new(format!("{CATEGORY_PREFIX}{}", feed.category), feed.feed.clone());
        self.backend.create_read_only_grant(&identity, &request)
    }

    fn as_listener(self: &Arc<Self>) -> Arc<dyn FeedPropertyChangeListener> {
        Arc::clone(self) as Arc<dyn FeedPropertyChangeListener>
    }
}

impl FeedPropertyChangeListener for EventDispatcher {
    fn notify(&self, event: &FeedPropertyChangeEvent) -> Result<(), DispatchError> {
        self.handle(event).map(|_| ())
    }
}

/// Counts a sync in progress until dropped, including on unwind.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Present and non-empty. Whitespace-only values pass through unchanged.
fn required<'a>(value: Option<&'a str>, what: &str) -> Result<&'a str, SyncError> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        Some(_) => Err(SyncError::Validation(format!("{what} is empty"))),
        None => Err(SyncError::Validation(format!("{what} is missing"))),
    }
}

/// A list value must still name at least one entry once normalized.
fn entries(raw: &str, what: &str) -> Result<Vec<String>, SyncError> {
    let list = split_list(raw);
    if list.is_empty() {
        return Err(SyncError::Validation(format!("{what} has no entries")));
    }
    Ok(list)
}

/// Newline- or comma-separated entries, trimmed, blanks dropped.
fn split_list(raw: &str) -> Vec<String> {
    raw.split(['\n', ','])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_list_accepts_newlines_and_commas() {
        assert_eq!(split_list("/a\n/b"), vec!["/a", "/b"]);
        assert_eq!(split_list(" orders , refunds\r\n\nreturns "), vec!["orders", "refunds", "returns"]);
        assert!(split_list("\n , \n").is_empty());
    }

    #[test]
    fn required_rejects_empty_and_missing() {
        assert!(matches!(required(Some(""), "hive schema"), Err(SyncError::Validation(m)) if m == "hive schema is empty"));
        assert!(matches!(required(None, "hive tables"), Err(SyncError::Validation(m)) if m == "hive tables is missing"));
        assert_eq!(required(Some("sales"), "hive schema").expect("present"), "sales");
        assert_eq!(required(Some("  "), "hive schema").expect("whitespace is present"), "  ");
    }

    #[test]
    fn entries_rejects_separator_only_lists() {
        assert!(matches!(entries(" , \n", "hdfs folders"), Err(SyncError::Validation(m)) if m == "hdfs folders has no entries"));
        assert_eq!(entries("/a,/b", "hdfs folders").expect("entries"), vec!["/a", "/b"]);
    }

    #[test]
    fn in_flight_guard_decrements_on_unwind() {
        let counter = AtomicUsize::new(0);
        let result = std::panic::catch_unwind(|| {
            let _guard = InFlight::enter(&counter);
            assert_eq!(counter.load(Ordering::SeqCst), 1);
            panic!("client blew up");
        });
        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }
}
