//! The host event loop: filesystem notifications in, pipeline results out.
//!
//! Raw notify events are debounced per path, run through the change
//! detector, and handed to the dispatcher.  Worker messages stream back on
//! one channel; incremental patches merge into a pending result that is
//! re-broadcast on every change, and terminal messages release the busy
//! gate.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use tokio::sync::{broadcast, mpsc};
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use marginalia_config::AppConfig;
use marginalia_pipeline::{Orchestrator, PipelineResult, WorkerMessage};
use marginalia_watch::{BusyGate, ChangeDetector, PlainTextExtractor};

use crate::dispatch::Dispatcher;

/// Quiet period after the last filesystem event for a path before the
/// change detector runs.
const DEBOUNCE: Duration = Duration::from_millis(200);
const CHANNEL_CAP: usize = 64;
const BROADCAST_CAP: usize = 256;

/// Published on every merged patch and on completion, so any number of
/// frontends can render progress without touching the loop.
#[derive(Debug, Clone)]
pub enum HostUpdate {
    /// The pending result after an incremental patch was merged.
    Partial(PipelineResult),
    Final(PipelineResult),
    Failed(String),
}

pub struct Host {
    config: AppConfig,
    detector: ChangeDetector,
    dispatcher: Dispatcher,
    gate: Arc<BusyGate>,
    worker_rx: mpsc::Receiver<(u64, WorkerMessage)>,
    refresh_tx: mpsc::Sender<()>,
    refresh_rx: mpsc::Receiver<()>,
    updates: broadcast::Sender<HostUpdate>,
}

impl Host {
    pub fn new(config: AppConfig, orchestrator: Arc<Orchestrator>) -> Self {
        let gate = Arc::new(BusyGate::new());
        let (worker_tx, worker_rx) = mpsc::channel(CHANNEL_CAP);
        let dispatcher = Dispatcher::new(gate.clone(), orchestrator, &config.pipeline, worker_tx);
        let (refresh_tx, refresh_rx) = mpsc::channel(4);
        let (updates, _) = broadcast::channel(BROADCAST_CAP);
        Self {
            config,
            detector: ChangeDetector::new(Box::new(PlainTextExtractor)),
            dispatcher,
            gate,
            worker_rx,
            refresh_tx,
            refresh_rx,
            updates,
        }
    }

    /// Handle for requesting a manual refresh from outside the loop.
    pub fn refresh_handle(&self) -> mpsc::Sender<()> {
        self.refresh_tx.clone()
    }

    /// Subscribe to pending and final pipeline results.
    pub fn subscribe(&self) -> broadcast::Receiver<HostUpdate> {
        self.updates.subscribe()
    }

    /// Run until every input channel closes.  Watcher registration failures
    /// are fatal; everything after that degrades per event.
    pub async fn run(self) -> Result<()> {
        let Host {
            config,
            mut detector,
            mut dispatcher,
            gate,
            mut worker_rx,
            refresh_tx,
            mut refresh_rx,
            updates,
        } = self;
        drop(refresh_tx);

        let dir = PathBuf::from(&config.watch.dir);
        fs::create_dir_all(&dir)
            .with_context(|| format!("creating watch directory {}", dir.display()))?;

        let (fs_tx, mut fs_rx) = mpsc::channel::<PathBuf>(CHANNEL_CAP);
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) if matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) => {
                for path in event.paths {
                    // The watcher runs on its own thread; a full channel
                    // just drops the event and the next save re-triggers.
                    let _ = fs_tx.try_send(path);
                }
            }
            Ok(_) => {}
            Err(err) => warn!(?err, "filesystem watcher error"),
        })
        .context("creating filesystem watcher")?;
        watcher
            .watch(&dir, RecursiveMode::Recursive)
            .with_context(|| format!("watching {}", dir.display()))?;
        info!(dir = %dir.display(), "watching for document changes");

        let (due_tx, mut due_rx) = mpsc::channel::<PathBuf>(CHANNEL_CAP);
        let mut debounces: HashMap<PathBuf, AbortHandle> = HashMap::new();
        let mut pending = PipelineResult::default();

        loop {
            tokio::select! {
                Some(path) = fs_rx.recv() => {
                    if !watchable(&path, &config.watch.extensions) {
                        continue;
                    }
                    // Restart the quiet-period timer for this path.
                    if let Some(previous) = debounces.remove(&path) {
                        previous.abort();
                    }
                    let due_tx = due_tx.clone();
                    let due_path = path.clone();
                    let timer = tokio::spawn(async move {
                        tokio::time::sleep(DEBOUNCE).await;
                        let _ = due_tx.send(due_path).await;
                    });
                    debounces.insert(path, timer.abort_handle());
                }
                Some(path) = due_rx.recv() => {
                    debounces.remove(&path);
                    if let Some(trigger) = detector.handle_change(&path) {
                        if dispatcher.trigger(trigger) {
                            pending = PipelineResult::default();
                        }
                    }
                }
                Some((generation, message)) = worker_rx.recv() => {
                    apply_message(generation, dispatcher.generation(), message, &mut pending, &gate, &updates);
                }
                Some(()) = refresh_rx.recv() => {
                    if dispatcher.refresh() {
                        pending = PipelineResult::default();
                    }
                }
                else => break,
            }
        }
        Ok(())
    }
}

/// Merge one worker message into the pending result and publish it.
/// Terminal messages release the gate.  Messages from a superseded worker
/// (older generation) are dropped whole: their patches must not merge into
/// the successor's pending result, and their terminal message must not
/// release the gate the successor holds.
fn apply_message(
    generation: u64,
    current_generation: u64,
    message: WorkerMessage,
    pending: &mut PipelineResult,
    gate: &BusyGate,
    updates: &broadcast::Sender<HostUpdate>,
) {
    if generation != current_generation {
        debug!(generation, current_generation, "stale worker message dropped");
        return;
    }
    match message {
        WorkerMessage::IncrementalUpdate(patch) => {
            patch.apply(pending);
            debug!(snippets = pending.snippets.len(), "incremental update merged");
            let _ = updates.send(HostUpdate::Partial(pending.clone()));
        }
        WorkerMessage::Result(result) => {
            info!(
                snippets = result.snippets.len(),
                web_results = result.web_search_results.len(),
                "pipeline finished"
            );
            if let Some(synthesis) = result.synthesis.as_deref() {
                info!(%synthesis, "synthesis");
            }
            let _ = updates.send(HostUpdate::Final(result));
            *pending = PipelineResult::default();
            gate.release();
        }
        WorkerMessage::Error { message } => {
            warn!(%message, "pipeline failed");
            let _ = updates.send(HostUpdate::Failed(message));
            *pending = PipelineResult::default();
            gate.release();
        }
    }
}

fn watchable(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(ext)))
}

// ── Tests ────────────────────────────────────────────────────────────────────
