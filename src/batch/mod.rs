// Batch execution module
//
// Runs the apply pipeline off the async runtime and streams what happens
// back to the caller as BatchEvents over a bounded channel.

use crate::metrics::Metrics;
use crate::models::{OperationOutcome, Session};
use crate::services::IconApplier;
use anyhow::{Context, Result};
use indexmap::IndexSet;
use std::sync::Arc;
use std::time::Instant;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Capacity of the event channel between the worker and the caller
const EVENT_BUFFER: usize = 100;

/// Events emitted while a batch runs
///
/// Emitted in order: one `Started`, then per game a `GameStarted` followed
/// by its `Outcome`s, then exactly one of `Finished` or `Cancelled`.
#[derive(Clone, Debug, PartialEq)]
pub enum BatchEvent {
    /// Batch accepted; `total` distinct games will be attempted
    Started { total: usize },

    /// A game's pipeline is about to run (`index` is 1-based)
    GameStarted {
        index: usize,
        total: usize,
        game: String,
    },

    /// A step of the current game produced an outcome
    Outcome(OperationOutcome),

    /// Every game was attempted
    Finished(BatchSummary),

    /// The cancel flag was seen before all games were attempted
    Cancelled(BatchSummary),
}

/// Totals for one batch
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub games_processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: bool,
}

impl BatchSummary {
    fn record(&mut self, outcome: &OperationOutcome) {
        if outcome.success {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
    }
}

/// Spawns apply batches on a tokio runtime
///
/// The applier does blocking filesystem work, so each batch runs inside
/// `spawn_blocking`. Cancellation is cooperative and checked between games;
/// a game already running always finishes its pipeline.
#[derive(Clone)]
pub struct BatchRunner {
    applier: Arc<IconApplier>,
    metrics: Arc<Metrics>,
}

impl BatchRunner {
    pub fn new(applier: Arc<IconApplier>) -> Self {
        Self {
            applier,
            metrics: Arc::new(Metrics::new()),
        }
    }

    /// Share an existing metrics collector instead of a fresh one
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Start a batch applying `session` to `ids` on `runtime`.
    ///
    /// Duplicate ids are attempted once. The returned handle streams events
    /// and resolves to the batch summary.
    pub fn spawn(&self, runtime: &Handle, session: Session, ids: Vec<u32>) -> BatchHandle {
        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);
        let (cancel_tx, cancel_rx) = watch::channel(false);

        let applier = Arc::clone(&self.applier);
        let metrics = Arc::clone(&self.metrics);

        let task = runtime.spawn_blocking(move || {
            run_batch(&applier, &metrics, &session, &ids, &event_tx, &cancel_rx)
        });

        BatchHandle {
            events: event_rx,
            cancel_tx,
            task,
        }
    }
}

/// Start a batch with a fresh metrics collector.
pub fn spawn_batch(
    runtime: &Handle,
    applier: Arc<IconApplier>,
    session: Session,
    ids: Vec<u32>,
) -> BatchHandle {
    BatchRunner::new(applier).spawn(runtime, session, ids)
}

/// Caller side of a running batch
pub struct BatchHandle {
    events: mpsc::Receiver<BatchEvent>,
    cancel_tx: watch::Sender<bool>,
    task: JoinHandle<BatchSummary>,
}

impl BatchHandle {
    /// Next event, or `None` once the batch has ended and the stream is drained
    pub async fn recv(&mut self) -> Option<BatchEvent> {
        self.events.recv().await
    }

    /// Ask the worker to stop before the next game
    pub fn cancel(&self) {
        tracing::info!("Batch cancellation requested");
        self.cancel_tx.send_replace(true);
    }

    pub fn is_cancel_requested(&self) -> bool {
        *self.cancel_tx.borrow()
    }

    /// Wait for the worker and return its summary.
    ///
    /// Events not yet received are discarded.
    pub async fn wait(self) -> Result<BatchSummary> {
        let Self { events, task, .. } = self;
        // Dropping the receiver unblocks a worker waiting on a full channel
        drop(events);

        task.await.context("Batch worker panicked")
    }
}

fn run_batch(
    applier: &IconApplier,
    metrics: &Metrics,
    session: &Session,
    ids: &[u32],
    events: &mpsc::Sender<BatchEvent>,
    cancel: &watch::Receiver<bool>,
) -> BatchSummary {
    let unique: IndexSet<u32> = ids.iter().copied().collect();
    let total = unique.len();
    let mut summary = BatchSummary::default();

    tracing::info!(
        "Starting batch: style {} on {} game(s)",
        session.style_index,
        total
    );
    emit(events, BatchEvent::Started { total });

    for (position, id) in unique.into_iter().enumerate() {
        if *cancel.borrow() {
            summary.cancelled = true;
            tracing::info!(
                "Batch cancelled after {} of {} game(s)",
                summary.games_processed,
                total
            );
            emit(events, BatchEvent::Cancelled(summary.clone()));
            return summary;
        }

        let game = applier
            .catalog()
            .game(id)
            .map(|g| g.name.clone())
            .unwrap_or_else(|| format!("Game #{}", id));
        tracing::info!("[{}/{}] {}", position + 1, total, game);
        emit(
            events,
            BatchEvent::GameStarted {
                index: position + 1,
                total,
                game,
            },
        );

        let started = Instant::now();
        applier.apply_game(session, id, &mut |outcome: OperationOutcome| {
            metrics.record_outcome(&outcome);
            summary.record(&outcome);
            emit(events, BatchEvent::Outcome(outcome));
        });
        metrics.record_game(started.elapsed());
        summary.games_processed += 1;
    }

    tracing::info!(
        "Batch finished: {} succeeded, {} failed across {} game(s)",
        summary.succeeded,
        summary.failed,
        summary.games_processed
    );
    emit(events, BatchEvent::Finished(summary.clone()));
    summary
}

// A closed receiver means nobody is listening anymore; the batch keeps going.
fn emit(events: &mpsc::Sender<BatchEvent>, event: BatchEvent) {
    if events.blocking_send(event).is_err() {
        tracing::trace!("Batch event dropped: receiver closed");
    }
}
