use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{Duration, Instant};

use notify::event::{ModifyKind, RenameMode};
use notify::{recommended_watcher, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{broadcast, mpsc, watch};

use gmxsync_core::SyncConfig;
use gmxsync_sync::{ChangeEvent, ChangeOp, Dispatch, EngineStats, SyncEngine};

use crate::error::{io_err, DaemonError};

/// How long runtime teardown waits for the blocking stdin reader.
const STDIN_GRACE: Duration = Duration::from_millis(250);

const HELP: &str = "commands:
  help    show this message
  status  print sync counters as JSON
  quit    stop watching, remove the mirror tree and exit";

/// A console command read from the daemon's input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Help,
    Status,
    Quit,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "help" | "?" => Ok(Command::Help),
            "status" => Ok(Command::Status),
            "quit" | "exit" | "q" => Ok(Command::Quit),
            other => Err(format!("unknown command '{other}' (try 'help')")),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Command::Help => "help",
            Command::Status => "status",
            Command::Quit => "quit",
        })
    }
}

/// Watches both trees and feeds the sync engine until shutdown.
pub struct Daemon {
    engine: SyncEngine,
    queue_capacity: usize,
    shutdown: broadcast::Sender<()>,
}

impl fmt::Debug for Daemon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Daemon")
            .field("engine", &self.engine)
            .field("queue_capacity", &self.queue_capacity)
            .finish_non_exhaustive()
    }
}

impl Daemon {
    pub fn new(engine: SyncEngine, queue_capacity: usize) -> Self {
        let (shutdown, _) = broadcast::channel(16);
        Self {
            engine,
            queue_capacity: queue_capacity.max(1),
            shutdown,
        }
    }

    pub fn from_config(config: &SyncConfig) -> Result<Self, DaemonError> {
        config.validate()?;
        Ok(Self::new(
            SyncEngine::from_config(config)?,
            config.queue_capacity,
        ))
    }

    /// Sending on the returned handle stops a running daemon.
    pub fn shutdown_handle(&self) -> broadcast::Sender<()> {
        self.shutdown.clone()
    }

    /// Build the mirror, then watch until `quit`, a signal or a shutdown
    /// request. The mirror root is removed before returning. Commands are read
    /// from `input`; their responses go to `output`.
    pub async fn run<R, W>(self, input: R, output: W) -> Result<EngineStats, DaemonError>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let Daemon {
            engine,
            queue_capacity,
            shutdown: shutdown_tx,
        } = self;

        let mut engine = run_initial_sync(engine).await?;
        let layout = engine.layout().clone().canonicalized();
        let mirror_root = layout.mirror_root.clone();
        let roots = vec![
            layout.objects_root.clone(),
            layout.scripts_root.clone(),
            layout.mirror_root.clone(),
        ];
        engine.set_layout(layout);

        let (queue_tx, queue_rx) = mpsc::channel::<ChangeEvent>(queue_capacity);
        let (stats_tx, stats_rx) = watch::channel(engine.stats().clone());

        let watcher_handle = {
            let shutdown = shutdown_tx.clone();
            let shutdown_rx = shutdown_tx.subscribe();
            tokio::spawn(async move {
                let result = watcher_task(roots, queue_tx, shutdown_rx).await;
                let _ = shutdown.send(());
                result
            })
        };

        let dispatch_handle = {
            let shutdown = shutdown_tx.clone();
            tokio::spawn(async move {
                let result = dispatch_task(engine, queue_rx, stats_tx).await;
                let _ = shutdown.send(());
                result
            })
        };

        let command_handle = {
            let shutdown = shutdown_tx.clone();
            let shutdown_rx = shutdown_tx.subscribe();
            tokio::spawn(command_task(input, output, stats_rx, shutdown, shutdown_rx))
        };

        let signal_handle = {
            let shutdown = shutdown_tx.clone();
            let shutdown_rx = shutdown_tx.subscribe();
            tokio::spawn(signal_task(shutdown, shutdown_rx))
        };

        tracing::info!(
            "watching {} (type 'help' for commands)",
            mirror_root.display()
        );

        let (watcher_result, dispatch_result, command_result, signal_result) = tokio::join!(
            watcher_handle,
            dispatch_handle,
            command_handle,
            signal_handle
        );

        remove_mirror(&mirror_root);

        handle_join("watcher", watcher_result)?;
        let stats = handle_join("dispatch", dispatch_result)?;
        handle_join("command_listener", command_result)?;
        handle_join("signal_handler", signal_result)?;

        tracing::info!(
            "stopped: {} processed, {} failed, {} suppressed",
            stats.processed,
            stats.failed,
            stats.reverb + stats.duplicate + stats.echo
        );
        Ok(stats)
    }
}

/// Start the daemon for `config` on stdin/stdout and block the current thread
/// until it exits.
pub fn start_blocking(config: &SyncConfig) -> Result<EngineStats, DaemonError> {
    init_tracing();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    let result = runtime.block_on(run(config));
    // The stdin reader may still be parked in a blocking read.
    runtime.shutdown_timeout(STDIN_GRACE);
    result
}

/// Run the daemon for `config` on stdin/stdout.
pub async fn run(config: &SyncConfig) -> Result<EngineStats, DaemonError> {
    Daemon::from_config(config)?
        .run(tokio::io::stdin(), tokio::io::stdout())
        .await
}

async fn run_initial_sync(mut engine: SyncEngine) -> Result<SyncEngine, DaemonError> {
    let (engine, summary) = tokio::task::spawn_blocking(move || {
        let summary = engine.initial_sync();
        (engine, summary)
    })
    .await
    .map_err(|err| DaemonError::Runtime(format!("initial sync join error: {err}")))?;
    summary?;
    Ok(engine)
}

async fn watcher_task(
    roots: Vec<PathBuf>,
    queue: mpsc::Sender<ChangeEvent>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
    let mut watcher: RecommendedWatcher = recommended_watcher(move |event| {
        let _ = event_tx.send(event);
    })?;

    for root in &roots {
        if root.is_dir() {
            watcher.watch(root, RecursiveMode::NonRecursive)?;
            tracing::debug!(path = %root.display(), "watching directory");
        } else {
            tracing::warn!(path = %root.display(), "directory missing, not watched");
        }
    }

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            event = event_rx.recv() => {
                let Some(event) = event else { break };
                let event = match event {
                    Ok(event) => event,
                    Err(err) => {
                        tracing::warn!(error = %err, "watcher event error");
                        continue;
                    }
                };
                for change in map_event(&event, Instant::now()) {
                    queue
                        .send(change)
                        .await
                        .map_err(|_| DaemonError::ChannelClosed("dispatch queue"))?;
                }
            }
        }
    }

    // Dropping `queue` here lets the dispatch task drain and stop.
    Ok(())
}

/// Run queued events through the engine one at a time until every sender is
/// gone. Returns the final counters.
async fn dispatch_task(
    mut engine: SyncEngine,
    mut queue: mpsc::Receiver<ChangeEvent>,
    stats: watch::Sender<EngineStats>,
) -> Result<EngineStats, DaemonError> {
    while let Some(event) = queue.recv().await {
        let (returned, dispatch) = tokio::task::spawn_blocking(move || {
            let dispatch = engine.handle(event);
            (engine, dispatch)
        })
        .await
        .map_err(|err| DaemonError::Runtime(format!("dispatch join error: {err}")))?;
        engine = returned;

        if let Dispatch::Suppressed(verdict) = dispatch {
            tracing::debug!(%verdict, "event suppressed");
        }
        stats.send_replace(engine.stats().clone());
    }
    Ok(engine.stats().clone())
}

async fn command_task<R, W>(
    input: R,
    mut output: W,
    stats: watch::Receiver<EngineStats>,
    shutdown: broadcast::Sender<()>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = BufReader::new(input).lines();

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            line = lines.next_line() => {
                // End of input leaves the daemon running.
                let Some(line) = line.map_err(|e| io_err("stdin", e))? else { break };
                if line.trim().is_empty() {
                    continue;
                }

                let command = line.parse::<Command>();
                let response = match &command {
                    Ok(Command::Help) => HELP.to_string(),
                    Ok(Command::Status) => {
                        let snapshot = stats.borrow().clone();
                        serde_json::to_string(&snapshot)?
                    }
                    Ok(Command::Quit) => "stopping".to_string(),
                    Err(message) => message.clone(),
                };
                write_line(&mut output, &response).await?;

                if command == Ok(Command::Quit) {
                    tracing::info!("quit requested, shutting down");
                    let _ = shutdown.send(());
                    break;
                }
            }
        }
    }

    Ok(())
}

async fn signal_task(
    shutdown: broadcast::Sender<()>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    tokio::select! {
        _ = shutdown_rx.recv() => return Ok(()),
        signal = tokio::signal::ctrl_c() => {
            signal.map_err(|e| io_err("ctrl-c handler", e))?;
            tracing::info!("received ctrl-c, shutting down");
        }
        terminated = terminate() => {
            terminated?;
            tracing::info!("received SIGTERM, shutting down");
        }
    }
    let _ = shutdown.send(());
    Ok(())
}

#[cfg(unix)]
async fn terminate() -> Result<(), DaemonError> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).map_err(|e| io_err("SIGTERM handler", e))?;
    sigterm.recv().await;
    Ok(())
}

#[cfg(not(unix))]
async fn terminate() -> Result<(), DaemonError> {
    std::future::pending().await
}

/// Translate one notify event into per-path change events.
pub fn map_event(event: &Event, at: Instant) -> Vec<ChangeEvent> {
    let op = change_op(&event.kind);
    let paths: &[PathBuf] = match event.kind {
        // `[from, to]`; only the destination holds the new content.
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            event.paths.last().map(std::slice::from_ref).unwrap_or(&[])
        }
        _ => &event.paths,
    };
    paths
        .iter()
        .map(|path| ChangeEvent {
            path: path.clone(),
            op,
            at,
        })
        .collect()
}

pub fn change_op(kind: &EventKind) -> ChangeOp {
    match kind {
        EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Any) => ChangeOp::Write,
        EventKind::Modify(ModifyKind::Name(RenameMode::To | RenameMode::Both)) => ChangeOp::Write,
        EventKind::Create(_) => ChangeOp::Create,
        EventKind::Remove(_) => ChangeOp::Remove,
        _ => ChangeOp::Other,
    }
}

fn remove_mirror(root: &Path) {
    match fs::remove_dir_all(root) {
        Ok(()) => tracing::info!(path = %root.display(), "removed mirror tree"),
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => {
            tracing::error!(path = %root.display(), error = %err, "could not remove mirror tree")
        }
    }
}

async fn write_line<W: AsyncWrite + Unpin>(output: &mut W, line: &str) -> Result<(), DaemonError> {
    output
        .write_all(line.as_bytes())
        .await
        .map_err(|e| io_err("stdout", e))?;
    output
        .write_all(b"\n")
        .await
        .map_err(|e| io_err("stdout", e))?;
    output.flush().await.map_err(|e| io_err("stdout", e))
}

fn handle_join<T>(
    task: &str,
    result: Result<Result<T, DaemonError>, tokio::task::JoinError>,
) -> Result<T, DaemonError> {
    match result {
        Ok(inner) => inner,
        Err(err) => Err(DaemonError::Runtime(format!(
            "{task} task join failure: {err}"
        ))),
    }
}

/// Install the global subscriber on stderr: `RUST_LOG` filter, `info` by
/// default. Records from the `log` facade are forwarded too.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
