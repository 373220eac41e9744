//! Spawns, supersedes, and reaps pipeline workers behind the busy gate.
//!
//! Exactly one worker runs at a time.  The automatic entry point drops its
//! trigger when the gate is held; the manual refresh forces the gate open,
//! kills the in-flight worker, and re-runs the last accepted request.  The
//! gate itself is released by the host when it sees a terminal message.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use marginalia_config::PipelineConfig;
use marginalia_pipeline::{Orchestrator, WorkerMessage, WorkerRequest};
use marginalia_watch::{BusyGate, TriggerEvent};

const WORKER_CHANNEL_CAP: usize = 64;

pub struct Dispatcher {
    gate: Arc<BusyGate>,
    orchestrator: Arc<Orchestrator>,
    similarity_threshold: f32,
    top_k: usize,
    user_goals: String,
    worker_tx: mpsc::Sender<(u64, WorkerMessage)>,
    current: Option<AbortHandle>,
    last_request: Option<WorkerRequest>,
    /// Bumped on every spawn.  Messages tagged with an older generation
    /// belong to a superseded worker and are dropped by the host.
    generation: u64,
}

impl Dispatcher {
    pub fn new(
        gate: Arc<BusyGate>,
        orchestrator: Arc<Orchestrator>,
        pipeline: &PipelineConfig,
        worker_tx: mpsc::Sender<(u64, WorkerMessage)>,
    ) -> Self {
        Self {
            gate,
            orchestrator,
            similarity_threshold: pipeline.similarity_threshold,
            top_k: pipeline.top_k,
            user_goals: pipeline.user_goals.clone(),
            worker_tx,
            current: None,
            last_request: None,
            generation: 0,
        }
    }

    /// Generation of the most recently spawned worker.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Automatic entry point.  Returns `false` (trigger dropped, no side
    /// effects) while a worker holds the gate.
    pub fn trigger(&mut self, event: TriggerEvent) -> bool {
        let request = WorkerRequest {
            paragraph: event.paragraph,
            source_path: event.source_path.display().to_string(),
            user_goals: self.user_goals.clone(),
        };
        self.submit(request)
    }

    /// Manual entry point: forces the gate open and re-runs the last
    /// accepted request, superseding any in-flight worker.  A refresh
    /// before the first trigger is a no-op.
    pub fn refresh(&mut self) -> bool {
        let Some(request) = self.last_request.clone() else {
            debug!("refresh requested before any trigger; ignoring");
            return false;
        };
        info!("manual refresh: superseding in-flight work");
        self.gate.release();
        self.submit(request)
    }

    fn submit(&mut self, request: WorkerRequest) -> bool {
        if !self.gate.try_acquire() {
            debug!(source = %request.source_path, "pipeline busy; trigger dropped");
            return false;
        }
        self.last_request = Some(request.clone());
        self.spawn(request);
        true
    }

    fn spawn(&mut self, request: WorkerRequest) {
        if let Some(previous) = self.current.take() {
            // Superseded workers are killed outright; their undelivered
            // messages are discarded.
            previous.abort();
        }
        self.generation += 1;
        let generation = self.generation;

        info!(source = %request.source_path, generation, "starting pipeline worker");
        let orchestrator = self.orchestrator.clone();
        let threshold = self.similarity_threshold;
        let top_k = self.top_k;
        let (emit, mut worker_rx) = mpsc::channel(WORKER_CHANNEL_CAP);
        let worker = tokio::spawn(async move {
            orchestrator.run(request, threshold, top_k, emit).await;
        });
        self.current = Some(worker.abort_handle());

        // Relay the worker's stream to the host tagged with its generation,
        // so messages a superseded worker already queued can be told apart
        // from the successor's.  A panicking worker never sends its terminal
        // message itself; when the channel closes without one, the relay
        // converts the panic into an error so the host releases the gate.
        // An abort means the worker was superseded and the successor already
        // holds the gate, so cancellation stays silent.
        let host_tx = self.worker_tx.clone();
        tokio::spawn(async move {
            while let Some(message) = worker_rx.recv().await {
                if host_tx.send((generation, message)).await.is_err() {
                    return;
                }
            }
            if let Err(err) = worker.await {
                if err.is_panic() {
                    warn!(generation, "pipeline worker crashed");
                    let _ = host_tx
                        .send((
                            generation,
                            WorkerMessage::Error {
                                message: "pipeline worker crashed".to_string(),
                            },
                        ))
                        .await;
                }
            }
        });
    }

    pub fn last_request(&self) -> Option<&WorkerRequest> {
        self.last_request.as_ref()
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use marginalia_config::ProviderConfig;
    use marginalia_index::MemoryIndex;
    use marginalia_pipeline::Reindex;
    use marginalia_providers::Providers;
    use std::path::PathBuf;

    struct NoopReindex;

    #[async_trait::async_trait]
    impl Reindex for NoopReindex {
        async fn rebuild(&self) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn dispatcher() -> (Dispatcher, Arc<BusyGate>, mpsc::Receiver<(u64, WorkerMessage)>) {
        let gate = Arc::new(BusyGate::new());
        let orchestrator = Arc::new(Orchestrator {
            index: Arc::new(MemoryIndex::new()),
            providers: Arc::new(Providers::from_config(&ProviderConfig::default())),
            reindex: Arc::new(NoopReindex),
        });
        let (tx, rx) = mpsc::channel(64);
        let dispatcher = Dispatcher::new(gate.clone(), orchestrator, &PipelineConfig::default(), tx);
        (dispatcher, gate, rx)
    }

    fn event(paragraph: &str) -> TriggerEvent {
        TriggerEvent {
            paragraph: paragraph.to_string(),
            source_path: PathBuf::from("/notes/current.md"),
            at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn accepted_trigger_holds_the_gate() {
        let (mut dispatcher, gate, _rx) = dispatcher();

        assert!(dispatcher.trigger(event("A finished thought.")));
        assert!(gate.is_busy());
    }

    #[tokio::test]
    async fn second_trigger_is_dropped_while_busy() {
        let (mut dispatcher, _gate, _rx) = dispatcher();

        assert!(dispatcher.trigger(event("First thought.")));
        assert!(!dispatcher.trigger(event("Second thought.")));

        // The dropped trigger must not become the replayable request.
        assert_eq!(
            dispatcher.last_request().map(|r| r.paragraph.as_str()),
            Some("First thought.")
        );
    }

    #[tokio::test]
    async fn refresh_before_any_trigger_is_a_no_op() {
        let (mut dispatcher, gate, _rx) = dispatcher();

        assert!(!dispatcher.refresh());
        assert!(!gate.is_busy());
    }

    #[tokio::test]
    async fn refresh_replays_the_last_request_even_while_busy() {
        let (mut dispatcher, gate, _rx) = dispatcher();

        assert!(dispatcher.trigger(event("Original thought.")));
        assert!(dispatcher.refresh(), "refresh must win the gate");
        assert!(gate.is_busy());
        assert_eq!(
            dispatcher.last_request().map(|r| r.paragraph.as_str()),
            Some("Original thought.")
        );
    }

    #[tokio::test]
    async fn every_spawn_bumps_the_generation() {
        let (mut dispatcher, _gate, _rx) = dispatcher();
        assert_eq!(dispatcher.generation(), 0);

        assert!(dispatcher.trigger(event("First thought.")));
        assert_eq!(dispatcher.generation(), 1);

        // A dropped trigger spawns nothing and keeps the generation.
        assert!(!dispatcher.trigger(event("Second thought.")));
        assert_eq!(dispatcher.generation(), 1);

        // A refresh supersedes: its worker gets a fresh generation so the
        // predecessor's queued messages are recognisably stale.
        assert!(dispatcher.refresh());
        assert_eq!(dispatcher.generation(), 2);
    }
}
