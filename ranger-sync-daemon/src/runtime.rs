use std::fs;
use std::io::ErrorKind;
use std::os::unix::net::UnixStream as StdUnixStream;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, mpsc, oneshot, RwLock};
use tokio::time::Instant;

use ranger_sync_core::{config, FeedPropertyChangeEvent};
use ranger_sync_engine::{
    AuthorizationBackend, EventBus, EventDispatcher, PolicySynchronizer, RangerRestClient,
    SyncSettings,
};

use crate::error::{io_err, DaemonError};
use crate::paths::socket_path;
use crate::protocol::{DaemonRequest, DaemonResponse};

struct PublishJob {
    event: FeedPropertyChangeEvent,
    respond_to: oneshot::Sender<Result<PublishSummary, String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PublishSummary {
    pub feed: String,
    pub listeners: usize,
    pub duration_ms: u128,
}

/// Counters reported by `status`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DaemonStats {
    pub received: u64,
    pub delivered: u64,
    pub failed: u64,
    pub last_event_at_unix: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl DaemonStats {
    fn record(&mut self, outcome: &Result<PublishSummary, String>, at_unix: u64) {
        self.received += 1;
        self.last_event_at_unix = at_unix;
        match outcome {
            Ok(_) => self.delivered += 1,
            Err(err) => {
                self.failed += 1;
                self.last_error = Some(err.clone());
            }
        }
    }
}

struct StatusContext {
    started_at_unix: u64,
    backend: String,
    ranger_url: String,
    socket: PathBuf,
}

/// Start the daemon runtime and block the current thread until it exits.
pub fn start_blocking(home: &Path) -> Result<(), DaemonError> {
    init_tracing();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(home.to_path_buf()))
}

/// Run the daemon against the Ranger instance in the saved connection.
pub async fn run(home: PathBuf) -> Result<(), DaemonError> {
    let connection = config::load_at(&home)?;
    let backend: Arc<dyn AuthorizationBackend> = Arc::new(PolicySynchronizer::new(
        RangerRestClient::new(&connection),
        SyncSettings::from(&connection),
    ));
    run_with_backend(home, backend, connection.base_url()).await
}

/// Run the daemon with an explicit backend.
pub async fn run_with_backend(
    home: PathBuf,
    backend: Arc<dyn AuthorizationBackend>,
    ranger_url: String,
) -> Result<(), DaemonError> {
    let root = config::root_at(&home);
    if !root.exists() {
        fs::create_dir_all(&root).map_err(|e| io_err(&root, e))?;
    }

    let context = Arc::new(StatusContext {
        started_at_unix: unix_seconds_now(),
        backend: backend.backend_type().to_string(),
        ranger_url,
        socket: socket_path(&home),
    });
    let stats = Arc::new(RwLock::new(DaemonStats::default()));

    let bus = Arc::new(EventBus::new());
    let dispatcher = EventDispatcher::new(backend);
    dispatcher.start(&*bus);

    let (publish_tx, publish_rx) = mpsc::channel::<PublishJob>(64);
    let (shutdown_tx, _) = broadcast::channel::<()>(16);

    let processor_handle = {
        let shutdown = shutdown_tx.clone();
        let bus = bus.clone();
        let stats = stats.clone();
        tokio::spawn(async move {
            let result = processor_task(bus, stats, publish_rx, shutdown.subscribe()).await;
            let _ = shutdown.send(());
            result
        })
    };

    let socket_handle = {
        let shutdown = shutdown_tx.clone();
        let home = home.clone();
        let stats = stats.clone();
        let context = context.clone();
        tokio::spawn(async move {
            let result = socket_server_task(
                home,
                stats,
                context,
                publish_tx,
                shutdown.clone(),
                shutdown.subscribe(),
            )
            .await;
            let _ = shutdown.send(());
            result
        })
    };

    let signal_handle = {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            let mut shutdown_rx = shutdown.subscribe();
            tokio::select! {
                _ = shutdown_rx.recv() => Ok(()),
                signal = tokio::signal::ctrl_c() => {
                    match signal {
                        Ok(()) => {
                            tracing::info!("received ctrl-c, shutting down");
                            let _ = shutdown.send(());
                            Ok(())
                        }
                        Err(err) => Err(io_err("ctrl-c handler", err)),
                    }
                }
            }
        })
    };

    tracing::info!(socket = %context.socket.display(), "ranger-sync daemon started");

    let (processor_result, socket_result, signal_result) =
        tokio::join!(processor_handle, socket_handle, signal_handle);

    dispatcher.stop(&*bus);
    tracing::info!("ranger-sync daemon stopped");

    handle_join("processor", processor_result)?;
    handle_join("socket_server", socket_result)?;
    handle_join("signal_handler", signal_result)?;
    Ok(())
}

/// Publishes queued events one at a time.
async fn processor_task(
    bus: Arc<EventBus>,
    stats: Arc<RwLock<DaemonStats>>,
    mut publish_rx: mpsc::Receiver<PublishJob>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            maybe_job = publish_rx.recv() => {
                let Some(job) = maybe_job else { break };
                let outcome = publish_blocking(bus.clone(), job.event).await;
                stats.write().await.record(&outcome, unix_seconds_now());
                let _ = job.respond_to.send(outcome);
            }
        }
    }

    Ok(())
}

async fn publish_blocking(
    bus: Arc<EventBus>,
    event: FeedPropertyChangeEvent,
) -> Result<PublishSummary, String> {
    let started = Instant::now();
    let feed = event.feed().to_string();
    let published = tokio::task::spawn_blocking(move || bus.publish(&event))
        .await
        .map_err(|err| format!("publish task join error: {err}"))?;

    match published {
        Ok(listeners) => {
            let summary = PublishSummary {
                feed,
                listeners,
                duration_ms: started.elapsed().as_millis(),
            };
            tracing::info!(
                feed = %summary.feed,
                listeners = summary.listeners,
                duration_ms = summary.duration_ms,
                "event published",
            );
            Ok(summary)
        }
        Err(err) => {
            tracing::error!(feed = %feed, error = %err, "event dispatch failed");
            Err(err.to_string())
        }
    }
}

async fn socket_server_task(
    home: PathBuf,
    stats: Arc<RwLock<DaemonStats>>,
    context: Arc<StatusContext>,
    publish_tx: mpsc::Sender<PublishJob>,
    shutdown_tx: broadcast::Sender<()>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    let socket = socket_path(&home);
    prepare_socket_for_bind(&socket)?;

    let listener = UnixListener::bind(&socket).map_err(|e| io_err(&socket, e))?;
    set_socket_permissions(&socket)?;

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            accepted = listener.accept() => {
                let (stream, _) = accepted.map_err(|e| io_err(&socket, e))?;
                let stats = stats.clone();
                let context = context.clone();
                let publish_tx = publish_tx.clone();
                let shutdown_tx = shutdown_tx.clone();
                tokio::spawn(async move {
                    if let Err(err) = handle_socket_client(
                        stream,
                        stats,
                        context,
                        publish_tx,
                        shutdown_tx,
                    ).await {
                        tracing::error!(error = %err, "socket client error");
                    }
                });
            }
        }
    }

    if socket.exists() {
        let _ = fs::remove_file(&socket);
    }
    Ok(())
}

async fn handle_socket_client(
    stream: UnixStream,
    stats: Arc<RwLock<DaemonStats>>,
    context: Arc<StatusContext>,
    publish_tx: mpsc::Sender<PublishJob>,
    shutdown_tx: broadcast::Sender<()>,
) -> Result<(), DaemonError> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| io_err("daemon socket read", e))?
    {
        if line.trim().is_empty() {
            continue;
        }

        let request = match serde_json::from_str::<DaemonRequest>(&line) {
            Ok(request) => request,
            Err(err) => {
                write_response(
                    &mut writer,
                    &DaemonResponse::error(format!("invalid request JSON: {err}")),
                )
                .await?;
                continue;
            }
        };

        let response = match (request.cmd.as_str(), request.event) {
            ("status", _) => DaemonResponse::ok(build_status_payload(&context, &stats).await),
            ("publish", Some(event)) => match enqueue_publish(&publish_tx, event).await {
                Ok(summary) => DaemonResponse::ok(json!(summary)),
                Err(err) => DaemonResponse::error(err.to_string()),
            },
            ("publish", None) => DaemonResponse::error("publish requires an 'event' field"),
            ("stop", _) => {
                let _ = shutdown_tx.send(());
                DaemonResponse::ok(json!({ "stopping": true }))
            }
            (other, _) => DaemonResponse::error(format!("unknown command '{other}'")),
        };

        write_response(&mut writer, &response).await?;
        if request.cmd == "stop" {
            break;
        }
    }

    Ok(())
}

async fn build_status_payload(context: &StatusContext, stats: &RwLock<DaemonStats>) -> Value {
    let stats = stats.read().await.clone();
    json!({
        "running": true,
        "backend": context.backend,
        "ranger_url": context.ranger_url,
        "started_at_unix": context.started_at_unix,
        "socket": context.socket.display().to_string(),
        "events": stats,
    })
}

async fn enqueue_publish(
    publish_tx: &mpsc::Sender<PublishJob>,
    event: FeedPropertyChangeEvent,
) -> Result<PublishSummary, DaemonError> {
    let (tx, rx) = oneshot::channel();
    publish_tx
        .send(PublishJob {
            event,
            respond_to: tx,
        })
        .await
        .map_err(|_| DaemonError::ChannelClosed("publish queue"))?;

    let outcome = rx
        .await
        .map_err(|_| DaemonError::ChannelClosed("publish response"))?;
    outcome.map_err(DaemonError::Protocol)
}

async fn write_response(
    writer: &mut OwnedWriteHalf,
    response: &DaemonResponse,
) -> Result<(), DaemonError> {
    let payload = serde_json::to_string(response)?;
    writer
        .write_all(payload.as_bytes())
        .await
        .map_err(|e| io_err("daemon socket write", e))?;
    writer
        .write_all(b"\n")
        .await
        .map_err(|e| io_err("daemon socket write", e))?;
    writer
        .flush()
        .await
        .map_err(|e| io_err("daemon socket flush", e))?;
    Ok(())
}

fn handle_join(
    task: &str,
    result: Result<Result<(), DaemonError>, tokio::task::JoinError>,
) -> Result<(), DaemonError> {
    match result {
        Ok(inner) => inner,
        Err(err) => Err(DaemonError::Protocol(format!(
            "{task} task join failure: {err}"
        ))),
    }
}

fn prepare_socket_for_bind(socket: &Path) -> Result<(), DaemonError> {
    if !socket.exists() {
        return Ok(());
    }

    match StdUnixStream::connect(socket) {
        Ok(_) => {
            return Err(DaemonError::Protocol(format!(
                "daemon socket already in use: {}",
                socket.display()
            )));
        }
        Err(err) => {
            tracing::warn!(
                socket = %socket.display(),
                error = %err,
                "removing stale daemon socket before bind",
            );
        }
    }

    match fs::remove_file(socket) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(io_err(socket, err)),
    }
}

fn unix_seconds_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

#[cfg(unix)]
fn set_socket_permissions(path: &Path) -> Result<(), DaemonError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(|e| io_err(path, e))
}

#[cfg(not(unix))]
fn set_socket_permissions(_path: &Path) -> Result<(), DaemonError> {
    Ok(())
}
