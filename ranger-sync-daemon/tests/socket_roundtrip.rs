//! Drives a live daemon over its Unix socket with an in-memory backend.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use ranger_sync_core::{FeedPropertyChangeEvent, PropertySnapshot};
use ranger_sync_daemon::{paths::socket_path, request_publish, request_status, request_stop, run_with_backend, DaemonError};
use ranger_sync_engine::{
    AuthorizationBackend, PolicyNameBuilder, PolicySynchronizer, RecordingPolicyClient,
    SyncSettings,
};
use tempfile::TempDir;

fn event(new_folders: &str) -> FeedPropertyChangeEvent {
    FeedPropertyChangeEvent {
        feed_category: "sales".to_string(),
        feed_name: "orders".to_string(),
        hadoop_security_group_names: Some(vec!["analysts".to_string()]),
        old_properties: PropertySnapshot {
            hdfs_folders: Some("/a".to_string()),
            hive_tables: Some("orders".to_string()),
            hive_schema: Some("sales".to_string()),
        },
        new_properties: PropertySnapshot {
            hdfs_folders: Some(new_folders.to_string()),
            hive_tables: Some("orders".to_string()),
            hive_schema: Some("sales".to_string()),
        },
    }
}

async fn wait_for_socket(home: &Path) {
    let socket = socket_path(home);
    for _ in 0..100 {
        if socket.exists() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("daemon socket never appeared at {}", socket.display());
}

async fn blocking<T: Send + 'static>(f: impl FnOnce() -> T + Send + 'static) -> T {
    tokio::task::spawn_blocking(f).await.expect("blocking task")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn publish_status_and_stop_over_socket() {
    let home_dir = TempDir::new().expect("home");
    let home = home_dir.path().to_path_buf();

    let client = Arc::new(RecordingPolicyClient::new());
    let backend: Arc<dyn AuthorizationBackend> = Arc::new(PolicySynchronizer::new(
        Arc::clone(&client),
        SyncSettings::new(PolicyNameBuilder::default(), "cl1_hadoop", "cl1_hive"),
    ));
    let daemon = tokio::spawn(run_with_backend(
        home.clone(),
        backend,
        "http://ranger.test:6080".to_string(),
    ));
    wait_for_socket(&home).await;

    let h = home.clone();
    let published = blocking(move || request_publish(&h, event("/a\n/b")))
        .await
        .expect("publish");
    assert_eq!(published["feed"], "sales.orders");
    assert_eq!(published["listeners"], 1);
    assert_eq!(client.created().len(), 2);
    assert_eq!(client.created()[0].resource_name.as_deref(), Some("/a,/b"));

    let h = home.clone();
    let unchanged = blocking(move || request_publish(&h, event("/a"))).await;
    assert!(unchanged.is_ok(), "ignored events are not failures");
    assert_eq!(client.calls().len(), 2);

    let h = home.clone();
    let status = blocking(move || request_status(&h)).await.expect("status");
    assert_eq!(status["running"], true);
    assert_eq!(status["backend"], "RANGER");
    assert_eq!(status["ranger_url"], "http://ranger.test:6080");
    assert_eq!(status["events"]["received"], 2);
    assert_eq!(status["events"]["delivered"], 2);
    assert_eq!(status["events"]["failed"], 0);

    let h = home.clone();
    blocking(move || request_stop(&h)).await.expect("stop");
    tokio::time::timeout(Duration::from_secs(5), daemon)
        .await
        .expect("daemon exits after stop")
        .expect("join")
        .expect("daemon result");
    assert!(!socket_path(&home).exists(), "socket removed on shutdown");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failed_dispatch_is_reported_to_caller() {
    let home_dir = TempDir::new().expect("home");
    let home = home_dir.path().to_path_buf();

    let client = Arc::new(RecordingPolicyClient::new());
    let backend: Arc<dyn AuthorizationBackend> = Arc::new(PolicySynchronizer::new(
        Arc::clone(&client),
        SyncSettings::new(PolicyNameBuilder::default(), "cl1_hadoop", "cl1_hive"),
    ));
    let daemon = tokio::spawn(run_with_backend(home.clone(), backend, String::new()));
    wait_for_socket(&home).await;

    let mut bad = event("/b");
    bad.new_properties.hive_schema = Some(String::new());
    let h = home.clone();
    let err = blocking(move || request_publish(&h, bad)).await.unwrap_err();
    assert!(matches!(err, DaemonError::Protocol(ref m) if m.contains("sales.orders")), "got {err}");
    assert!(client.calls().is_empty());

    let h = home.clone();
    let status = blocking(move || request_status(&h)).await.expect("status");
    assert_eq!(status["events"]["failed"], 1);
    assert!(status["events"]["last_error"]
        .as_str()
        .expect("last_error")
        .contains("hive schema"));

    let h = home.clone();
    blocking(move || request_stop(&h)).await.expect("stop");
    tokio::time::timeout(Duration::from_secs(5), daemon)
        .await
        .expect("daemon exits after stop")
        .expect("join")
        .expect("daemon result");
}
