//! Shutdown coordination
//!
//! The `ShutdownCoordinator` drives the server through
//! `Running -> ShuttingDown -> Drained`:
//!
//! - **Running**: producers submit, workers process
//! - **ShuttingDown**: the queue flag is set and every waiter was woken;
//!   new submissions are rejected, queued requests are still processed
//! - **Drained**: every registered producer and worker has exited and the
//!   queue is empty
//!
//! The shutdown flag itself lives in the queue state; the coordinator only
//! flips it and keeps track of the threads it has to wait for:
//!
//! ```text
//! ShutdownCoordinator
//!     ├── producers   (spawned producer handles, joined)
//!     ├── workers     (WorkerPool of spawned workers, joined)
//!     └── active      (workers running on collaborator threads, counted)
//! ```
//!
//! If no worker is left once all of these are done, the requests still
//! queued are processed on the thread that waits for the drain.

use crate::core::ledger::Ledger;
use crate::core::queue::RequestQueue;
use crate::core::worker::{run_worker, WorkerPool, WorkerStats};
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, error, info};

/// Lifecycle phase of a server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Running,
    ShuttingDown,
    Drained,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Running => f.write_str("running"),
            Phase::ShuttingDown => f.write_str("shutting down"),
            Phase::Drained => f.write_str("drained"),
        }
    }
}

/// Counters for one producer's lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProducerStats {
    /// Operations admitted to the queue
    pub submitted: u64,
    /// Admissions that injected an audit
    pub audits_triggered: u64,
    /// Operations rejected for reasons other than shutdown
    pub invalid: u64,
}

impl ProducerStats {
    pub fn merge(&mut self, other: &ProducerStats) {
        self.submitted += other.submitted;
        self.audits_triggered += other.audits_triggered;
        self.invalid += other.invalid;
    }
}

/// What a completed drain joined
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainSummary {
    /// Producer threads joined
    pub producers: usize,
    /// Workers that exited normally, spawned or running on collaborator threads
    pub workers: usize,
    /// Threads that panicked instead of returning
    pub panicked: usize,
    /// Combined producer counters
    pub produced: ProducerStats,
    /// Combined worker counters, including requests drained on the waiting thread
    pub processed: WorkerStats,
}

/// Workers running through [`ShutdownCoordinator::run_tracked_worker`]
#[derive(Debug, Default)]
struct ActiveWorkers {
    running: usize,
    finished: usize,
    panicked: usize,
    processed: WorkerStats,
}

/// Marks one tracked worker as running until dropped
///
/// Dropped without stats means the worker loop unwound.
struct TrackedWorker<'a> {
    coordinator: &'a ShutdownCoordinator,
    stats: Option<WorkerStats>,
}

impl Drop for TrackedWorker<'_> {
    fn drop(&mut self) {
        let mut active = self.coordinator.active.lock();
        match self.stats.take() {
            Some(stats) => {
                active.finished += 1;
                active.processed.merge(&stats);
            }
            None => {
                active.panicked += 1;
                error!("worker panicked");
            }
        }
        active.running -= 1;
        self.coordinator.idle.notify_all();
    }
}

/// Flips the shutdown flag once and waits for every worker and producer
#[derive(Debug)]
pub struct ShutdownCoordinator {
    queue: Arc<RequestQueue>,
    ledger: Arc<Ledger>,
    producers: Mutex<Vec<JoinHandle<ProducerStats>>>,
    workers: Mutex<WorkerPool>,
    active: Mutex<ActiveWorkers>,
    idle: Condvar,
    /// Held for the whole drain; serializes concurrent callers
    drain: Mutex<DrainSummary>,
    drained: AtomicBool,
}

impl ShutdownCoordinator {
    pub fn new(queue: Arc<RequestQueue>, ledger: Arc<Ledger>) -> Self {
        ShutdownCoordinator {
            queue,
            ledger,
            producers: Mutex::new(Vec::new()),
            workers: Mutex::new(WorkerPool::default()),
            active: Mutex::new(ActiveWorkers::default()),
            idle: Condvar::new(),
            drain: Mutex::new(DrainSummary::default()),
            drained: AtomicBool::new(false),
        }
    }

    pub fn phase(&self) -> Phase {
        if self.drained.load(Ordering::Acquire) {
            Phase::Drained
        } else if self.queue.is_shutting_down() {
            Phase::ShuttingDown
        } else {
            Phase::Running
        }
    }

    /// Register a producer thread to be joined on drain
    pub fn register_producer(&self, handle: JoinHandle<ProducerStats>) {
        self.producers.lock().push(handle);
    }

    /// Register spawned workers to be joined on drain
    pub fn register_workers(&self, pool: WorkerPool) {
        self.workers.lock().absorb(pool);
    }

    /// Run a worker loop on the calling thread until the queue is drained
    ///
    /// The worker counts as running until this call returns or unwinds, and
    /// [`ShutdownCoordinator::trigger_shutdown_and_wait`] waits for it.
    pub fn run_tracked_worker(&self) -> WorkerStats {
        self.active.lock().running += 1;
        let mut tracked = TrackedWorker {
            coordinator: self,
            stats: None,
        };

        let stats = run_worker(&self.queue, &self.ledger);
        tracked.stats = Some(stats);
        stats
    }

    /// Number of threads the drain still has to wait for
    pub fn pending(&self) -> usize {
        self.producers.lock().len() + self.workers.lock().len() + self.active.lock().running
    }

    /// Leave `Running`
    ///
    /// Sets the queue's shutdown flag and wakes every blocked producer and
    /// consumer. Returns `true` only for the call that made the transition.
    pub fn trigger(&self) -> bool {
        let first = self.queue.signal_shutdown();
        if first {
            info!(
                queued = self.queue.len(),
                threads = self.pending(),
                "shutdown triggered, draining queue"
            );
        }
        first
    }

    /// Trigger shutdown and block until the server is drained
    ///
    /// Producers are joined first: once they have all returned nothing new
    /// can enter the queue. Spawned workers are joined next, then tracked
    /// workers are waited for; each worker only exits after the queue is
    /// empty. Requests left over because no worker exists are processed on
    /// the calling thread. Concurrent callers wait for the same drain and get
    /// the same summary.
    ///
    /// Must not be called from a registered or tracked thread, which would
    /// wait on itself.
    pub fn trigger_shutdown_and_wait(&self) -> DrainSummary {
        self.trigger();

        let mut summary = self.drain.lock();
        loop {
            let producers = mem::take(&mut *self.producers.lock());
            let workers = mem::take(&mut *self.workers.lock());
            if !producers.is_empty() || !workers.is_empty() {
                for handle in producers {
                    match handle.join() {
                        Ok(stats) => {
                            summary.producers += 1;
                            summary.produced.merge(&stats);
                        }
                        Err(_) => {
                            summary.panicked += 1;
                            error!("producer thread panicked");
                        }
                    }
                }
                let joined = workers.join();
                summary.workers += joined.joined;
                summary.panicked += joined.panicked;
                summary.processed.merge(&joined.stats);
                continue;
            }

            self.wait_for_tracked_workers(&mut summary);
            if self.queue.is_empty() {
                break;
            }

            debug!(queued = self.queue.len(), "no worker left, draining on the calling thread");
            let stats = run_worker(&self.queue, &self.ledger);
            summary.processed.merge(&stats);
        }

        if !self.drained.swap(true, Ordering::AcqRel) {
            info!(
                producers = summary.producers,
                workers = summary.workers,
                processed = summary.processed.processed,
                "drain complete"
            );
        }
        *summary
    }

    fn wait_for_tracked_workers(&self, summary: &mut DrainSummary) {
        let mut active = self.active.lock();
        while active.running > 0 {
            self.idle.wait(&mut active);
        }
        summary.workers += mem::take(&mut active.finished);
        summary.panicked += mem::take(&mut active.panicked);
        summary.processed.merge(&mem::take(&mut active.processed));
    }
}
