//! Worker-pool dispatcher.
//!
//! The controller pushes one task per witness onto a shared queue; a fixed
//! set of workers pull from it, run the selector, and report back on a
//! results channel. Workers share nothing mutable except the statistics
//! counters.
//!
//! ## Barriers
//!
//! - **Per unit**: `run` returns only after one outcome per dispatched witness.
//! - **Shutdown**: `shutdown` closes the queue and joins every worker.
//!
//! ## Bounded waits
//!
//! Each task runs under `task_timeout`. A timed-out task goes back on the
//! queue until `max_retries` is exhausted, then its witness is recorded as
//! failed. `barrier_timeout` caps the whole per-unit wait; witnesses still
//! outstanding when it elapses are recorded as failed, and any late reports
//! for them are discarded by epoch.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::Instant;

use crate::coherence::CoherenceProvider;
use crate::selector::{BestParentSelector, SelectorError};
use crate::types::{ParentMap, Threshold, VariantUnit, WitnessId, WitnessRow};
use super::{unique_rows, DispatchError, DispatchMode, Dispatcher, UnitResolution};

/// Configuration for the worker pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Number of workers (at least 1).
    pub workers: usize,
    /// Maximum time one witness may take.
    pub task_timeout: Duration,
    /// How many times a timed-out witness is re-queued.
    pub max_retries: u32,
    /// Maximum time to wait at a per-unit barrier. `None` waits for every task.
    pub barrier_timeout: Option<Duration>,
}

impl PoolConfig {
    /// Configuration with `workers` workers and default timeouts.
    pub fn with_workers(workers: usize) -> Self {
        Self {
            workers,
            ..Self::default()
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            task_timeout: Duration::from_secs(3600),
            max_retries: 1,
            barrier_timeout: None,
        }
    }
}

/// Counters for pool activity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    /// Tasks sent to the queue, excluding retries.
    pub dispatched: u64,
    /// Tasks that returned a parent map.
    pub completed: u64,
    /// Tasks whose witness could not be resolved.
    pub failed: u64,
    /// Task attempts that hit `task_timeout`.
    pub timed_out: u64,
    /// Tasks put back on the queue after a timeout.
    pub retried: u64,
    /// Task attempts that panicked; their witnesses count as failed.
    pub panicked: u64,
    /// Reports discarded because their unit's barrier had already cleared.
    pub stale: u64,
}

/// One unit of work: a witness to resolve.
#[derive(Debug)]
struct WitnessTask {
    epoch: u64,
    unit: VariantUnit,
    row: WitnessRow,
    thresholds: Arc<[Threshold]>,
    attempt: u32,
}

#[derive(Debug)]
enum TaskOutcome {
    Resolved(ParentMap),
    Failed(SelectorError),
    Panicked(String),
    TimedOut,
}

#[derive(Debug)]
struct TaskReport {
    worker: usize,
    task: WitnessTask,
    outcome: TaskOutcome,
}

/// Dispatcher running the selector on a fixed pool of tokio workers.
///
/// Must be started inside a tokio runtime.
pub struct PoolDispatcher {
    config: PoolConfig,
    tasks: Option<mpsc::UnboundedSender<WitnessTask>>,
    results: mpsc::UnboundedReceiver<TaskReport>,
    workers: JoinSet<()>,
    stats: Arc<Mutex<PoolStats>>,
    epoch: u64,
}

impl PoolDispatcher {
    /// Spawn the workers.
    pub fn start<P: CoherenceProvider + 'static>(selector: BestParentSelector<P>, config: PoolConfig) -> Self {
        let worker_count = config.workers.max(1);
        let (task_tx, task_rx) = mpsc::unbounded_channel::<WitnessTask>();
        let (result_tx, result_rx) = mpsc::unbounded_channel::<TaskReport>();
        let queue = Arc::new(tokio::sync::Mutex::new(task_rx));

        tracing::info!(
            workers = worker_count,
            task_timeout_secs = config.task_timeout.as_secs(),
            max_retries = config.max_retries,
            "Starting worker pool"
        );

        let mut workers = JoinSet::new();
        for id in 0..worker_count {
            workers.spawn(worker_loop(
                id,
                selector.clone(),
                Arc::clone(&queue),
                result_tx.clone(),
                config.task_timeout,
            ));
        }

        Self {
            config,
            tasks: Some(task_tx),
            results: result_rx,
            workers,
            stats: Arc::new(Mutex::new(PoolStats::default())),
            epoch: 0,
        }
    }

    /// Snapshot of the pool counters.
    pub fn stats(&self) -> PoolStats {
        self.stats.lock().clone()
    }

    /// The pool configuration.
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }
}

async fn worker_loop<P: CoherenceProvider + 'static>(
    id: usize,
    selector: BestParentSelector<P>,
    queue: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<WitnessTask>>>,
    results: mpsc::UnboundedSender<TaskReport>,
    task_timeout: Duration,
) {
    tracing::debug!(worker = id, "Worker starting");

    loop {
        let task = {
            let mut queue = queue.lock().await;
            queue.recv().await
        };
        let Some(task) = task else {
            break;
        };

        tracing::debug!(worker = id, unit = %task.unit, witness = %task.row.witness, attempt = task.attempt, "Received task");

        // Resolve on a child task so a panicking provider cannot take the worker down
        let child = {
            let selector = selector.clone();
            let unit = task.unit.clone();
            let row = task.row.clone();
            let thresholds = Arc::clone(&task.thresholds);
            tokio::spawn(async move { selector.resolve(&unit, &row, &thresholds).await })
        };
        let abort = child.abort_handle();

        let outcome = match tokio::time::timeout(task_timeout, child).await {
            Ok(Ok(Ok(parent_map))) => TaskOutcome::Resolved(parent_map),
            Ok(Ok(Err(e))) => TaskOutcome::Failed(e),
            Ok(Err(e)) => TaskOutcome::Panicked(e.to_string()),
            Err(_) => {
                abort.abort();
                TaskOutcome::TimedOut
            }
        };

        if results.send(TaskReport { worker: id, task, outcome }).is_err() {
            // Controller is gone
            break;
        }
    }

    tracing::debug!(worker = id, "Worker exiting");
}

#[async_trait]
impl Dispatcher for PoolDispatcher {
    async fn run(
        &mut self,
        unit: &VariantUnit,
        rows: &[WitnessRow],
        thresholds: &[Threshold],
    ) -> Result<UnitResolution, DispatchError> {
        let tasks = self.tasks.clone().ok_or(DispatchError::AlreadyShutDown)?;
        self.epoch += 1;
        let epoch = self.epoch;
        let thresholds: Arc<[Threshold]> = Arc::from(thresholds);

        let rows = unique_rows(unit, rows);
        let mut pending: BTreeSet<WitnessId> = BTreeSet::new();
        for row in &rows {
            pending.insert(row.witness.clone());
            let task = WitnessTask {
                epoch,
                unit: unit.clone(),
                row: (*row).clone(),
                thresholds: Arc::clone(&thresholds),
                attempt: 0,
            };
            if tasks.send(task).is_err() {
                return Err(DispatchError::PoolClosed {
                    unit: unit.clone(),
                    outstanding: rows.len(),
                });
            }
        }
        self.stats.lock().dispatched += pending.len() as u64;

        tracing::debug!(unit = %unit, tasks = pending.len(), "Waiting for remote tasks");

        let mut resolution = UnitResolution::new();
        let deadline = self.config.barrier_timeout.map(|d| Instant::now() + d);

        while !pending.is_empty() {
            let next = match deadline {
                Some(deadline) => match tokio::time::timeout_at(deadline, self.results.recv()).await {
                    Ok(next) => next,
                    Err(_) => {
                        tracing::error!(
                            unit = %unit,
                            outstanding = pending.len(),
                            "Barrier timed out, abandoning outstanding witnesses"
                        );
                        let mut stats = self.stats.lock();
                        for witness in std::mem::take(&mut pending) {
                            stats.failed += 1;
                            resolution.abandoned(witness);
                        }
                        break;
                    }
                },
                None => self.results.recv().await,
            };

            let Some(report) = next else {
                return Err(DispatchError::PoolClosed {
                    unit: unit.clone(),
                    outstanding: pending.len(),
                });
            };

            let TaskReport { worker, mut task, outcome } = report;
            if task.epoch != epoch || !pending.contains(&task.row.witness) {
                self.stats.lock().stale += 1;
                tracing::debug!(worker, unit = %task.unit, witness = %task.row.witness, "Discarding stale result");
                continue;
            }

            match outcome {
                TaskOutcome::Resolved(parent_map) => {
                    self.stats.lock().completed += 1;
                    pending.remove(&task.row.witness);
                    resolution.resolved(task.row.witness, parent_map);
                }
                TaskOutcome::Failed(e) => {
                    self.stats.lock().failed += 1;
                    tracing::error!(worker, unit = %unit, witness = %task.row.witness, error = %e, "Parent resolution failed");
                    pending.remove(&task.row.witness);
                    resolution.abandoned(task.row.witness);
                }
                TaskOutcome::Panicked(message) => {
                    {
                        let mut stats = self.stats.lock();
                        stats.panicked += 1;
                        stats.failed += 1;
                    }
                    tracing::error!(worker, unit = %unit, witness = %task.row.witness, error = %message, "Parent resolution panicked");
                    pending.remove(&task.row.witness);
                    resolution.abandoned(task.row.witness);
                }
                TaskOutcome::TimedOut if task.attempt < self.config.max_retries => {
                    {
                        let mut stats = self.stats.lock();
                        stats.timed_out += 1;
                        stats.retried += 1;
                    }
                    tracing::warn!(
                        worker,
                        unit = %unit,
                        witness = %task.row.witness,
                        attempt = task.attempt,
                        "Task timed out, returned to the queue"
                    );
                    task.attempt += 1;
                    if tasks.send(task).is_err() {
                        return Err(DispatchError::PoolClosed {
                            unit: unit.clone(),
                            outstanding: pending.len(),
                        });
                    }
                }
                TaskOutcome::TimedOut => {
                    {
                        let mut stats = self.stats.lock();
                        stats.timed_out += 1;
                        stats.failed += 1;
                    }
                    tracing::error!(
                        worker,
                        unit = %unit,
                        witness = %task.row.witness,
                        attempts = task.attempt + 1,
                        "Task timed out, giving up"
                    );
                    pending.remove(&task.row.witness);
                    resolution.abandoned(task.row.witness);
                }
            }
        }

        tracing::debug!(unit = %unit, "Remote tasks complete");
        Ok(resolution)
    }

    async fn shutdown(&mut self) -> Result<(), DispatchError> {
        let Some(tasks) = self.tasks.take() else {
            return Ok(());
        };

        tracing::debug!("Telling workers to exit");
        drop(tasks);

        let mut panicked = 0;
        while let Some(joined) = self.workers.join_next().await {
            if let Err(e) = joined {
                if e.is_panic() {
                    panicked += 1;
                    tracing::error!(error = %e, "Worker panicked");
                }
            }
        }

        let stats = self.stats();
        tracing::info!(
            dispatched = stats.dispatched,
            completed = stats.completed,
            failed = stats.failed,
            timed_out = stats.timed_out,
            retried = stats.retried,
            panicked = stats.panicked,
            "Work done"
        );

        if panicked > 0 {
            Err(DispatchError::WorkerPanicked(panicked))
        } else {
            Ok(())
        }
    }

    fn mode(&self) -> DispatchMode {
        DispatchMode::Pool {
            workers: self.config.workers.max(1),
        }
    }
}
