//! Worker pool draining the request queue into the ledger
//!
//! Every worker runs the same loop: take the head of the shared queue, apply
//! it to the ledger, repeat; exit the first time the queue reports that it is
//! empty and shutting down. There are no per-worker queues.
//!
//! A worker never holds the queue lock while it works on the ledger:
//! `dequeue` returns before the request is applied.

use crate::core::ledger::Ledger;
use crate::core::queue::RequestQueue;
use crate::types::{BankError, Operation, Request, TransferOutcome};
use std::ops::Range;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, warn};

/// Counters for one worker's lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    /// Requests taken from the queue
    pub processed: u64,
    /// Applied deposits
    pub deposits: u64,
    /// Applied transfers
    pub transfers: u64,
    /// Transfers rejected for insufficient funds
    pub insufficient_funds: u64,
    /// Audits reported
    pub audits: u64,
    /// Requests the ledger rejected with an error
    pub failed: u64,
}

impl WorkerStats {
    /// Fold another worker's counters into this one
    pub fn merge(&mut self, other: &WorkerStats) {
        self.processed += other.processed;
        self.deposits += other.deposits;
        self.transfers += other.transfers;
        self.insufficient_funds += other.insufficient_funds;
        self.audits += other.audits;
        self.failed += other.failed;
    }
}

/// Apply one request to the ledger
///
/// # Returns
///
/// The transfer outcome for transfers, `None` for other kinds.
pub fn apply(ledger: &Ledger, request: &Request) -> Result<Option<TransferOutcome>, BankError> {
    match request.operation {
        Operation::Deposit { account, amount } => {
            ledger.deposit(request.id, account, amount)?;
            Ok(None)
        }
        Operation::Transfer {
            source,
            dest,
            amount,
        } => ledger.transfer(request.id, source, dest, amount).map(Some),
        Operation::Audit => {
            ledger.audit(request.id);
            Ok(None)
        }
    }
}

/// Run one worker until the queue is drained and shut down
///
/// Ledger errors are logged and counted; they never stop the worker.
pub fn run_worker(queue: &RequestQueue, ledger: &Ledger) -> WorkerStats {
    let mut stats = WorkerStats::default();

    while let Some(request) = queue.dequeue() {
        stats.processed += 1;
        match apply(ledger, &request) {
            Ok(Some(TransferOutcome::Applied { .. })) => stats.transfers += 1,
            Ok(Some(TransferOutcome::InsufficientFunds { .. })) => stats.insufficient_funds += 1,
            Ok(None) => match request.operation {
                Operation::Audit => stats.audits += 1,
                _ => stats.deposits += 1,
            },
            Err(e) => {
                stats.failed += 1;
                warn!(request = request.id, kind = %request.kind(), error = %e, "request failed");
            }
        }
    }

    debug!(processed = stats.processed, "worker exiting");
    stats
}

/// What joining a pool collected
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolJoin {
    /// Workers that returned normally
    pub joined: usize,
    /// Workers that panicked; their counters are lost
    pub panicked: usize,
    /// Combined counters of the joined workers
    pub stats: WorkerStats,
}

/// Set of worker threads sharing one queue
#[derive(Debug, Default)]
pub struct WorkerPool {
    handles: Vec<JoinHandle<WorkerStats>>,
}

impl WorkerPool {
    /// Spawn `count` named worker threads
    ///
    /// # Errors
    ///
    /// Returns [`BankError::Io`] if a thread cannot be spawned. Workers that
    /// were already started are detached and exit on shutdown; use
    /// [`WorkerPool::grow`] to keep them.
    pub fn spawn(
        count: usize,
        queue: Arc<RequestQueue>,
        ledger: Arc<Ledger>,
    ) -> Result<Self, BankError> {
        let mut pool = WorkerPool::default();
        pool.grow(0..count, &queue, &ledger)?;

        debug!(workers = count, "worker pool started");
        Ok(pool)
    }

    /// Spawn one worker per index in `indices`
    ///
    /// Stops at the first spawn failure. Workers started before it stay in
    /// the pool.
    pub fn grow(
        &mut self,
        indices: Range<usize>,
        queue: &Arc<RequestQueue>,
        ledger: &Arc<Ledger>,
    ) -> Result<(), BankError> {
        for index in indices {
            let handle = spawn_worker(index, Arc::clone(queue), Arc::clone(ledger))?;
            self.handles.push(handle);
        }
        Ok(())
    }

    /// Move every worker of `other` into this pool
    pub fn absorb(&mut self, other: WorkerPool) {
        self.handles.extend(other.handles);
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait for every worker to exit
    ///
    /// Only returns once the queue has been shut down and drained. A worker
    /// that panicked is logged and counted in [`PoolJoin::panicked`].
    pub fn join(self) -> PoolJoin {
        let mut total = PoolJoin::default();
        for handle in self.handles {
            match handle.join() {
                Ok(stats) => {
                    total.joined += 1;
                    total.stats.merge(&stats);
                }
                Err(_) => {
                    total.panicked += 1;
                    error!("worker thread panicked");
                }
            }
        }
        total
    }
}

/// Spawn one named worker thread
pub fn spawn_worker(
    index: usize,
    queue: Arc<RequestQueue>,
    ledger: Arc<Ledger>,
) -> Result<JoinHandle<WorkerStats>, BankError> {
    let handle = thread::Builder::new()
        .name(format!("ledger-worker-{index}"))
        .spawn(move || run_worker(&queue, &ledger))?;
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::audit::AuditInjector;
    use crate::core::sink::MemorySink;
    use crate::types::{Report, RequestKind};
    use rust_decimal::Decimal;

    fn setup(capacity: usize, audit_every: u64) -> (Arc<RequestQueue>, Arc<Ledger>, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let ledger = Arc::new(Ledger::new(10, Decimal::new(1000, 0), sink.clone()));
        let queue = Arc::new(RequestQueue::new(capacity, AuditInjector::new(audit_every)).unwrap());
        (queue, ledger, sink)
    }

    #[test]
    fn test_run_worker_applies_every_kind_then_exits() {
        let (queue, ledger, sink) = setup(8, 0);
        queue
            .enqueue(Operation::deposit(3, Decimal::new(500, 1)).unwrap())
            .unwrap();
        queue
            .enqueue(Operation::transfer(0, 1, Decimal::new(1500, 0)).unwrap())
            .unwrap();
        queue
            .enqueue(Operation::transfer(0, 1, Decimal::new(100, 0)).unwrap())
            .unwrap();
        queue.enqueue(Operation::Audit).unwrap();
        queue.signal_shutdown();

        let stats = run_worker(&queue, &ledger);

        assert_eq!(
            stats,
            WorkerStats {
                processed: 4,
                deposits: 1,
                transfers: 1,
                insufficient_funds: 1,
                audits: 1,
                failed: 0,
            }
        );
        let kinds: Vec<RequestKind> = sink.reports().iter().map(Report::kind).collect();
        assert_eq!(
            kinds,
            vec![
                RequestKind::Deposit,
                RequestKind::Transfer,
                RequestKind::Transfer,
                RequestKind::Audit
            ]
        );
    }

    #[test]
    fn test_run_worker_counts_failures_and_continues() {
        let (queue, ledger, sink) = setup(4, 0);
        queue
            .enqueue(Operation::Deposit {
                account: 99,
                amount: Decimal::ONE,
            })
            .unwrap();
        queue
            .enqueue(Operation::deposit(1, Decimal::ONE).unwrap())
            .unwrap();
        queue.signal_shutdown();

        let stats = run_worker(&queue, &ledger);

        assert_eq!(stats.processed, 2);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.deposits, 1);
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_pool_drains_queue_before_exiting() {
        let (queue, ledger, sink) = setup(16, 10);
        let pool = WorkerPool::spawn(4, Arc::clone(&queue), Arc::clone(&ledger)).unwrap();
        assert_eq!(pool.len(), 4);

        for i in 0..100u32 {
            let op = Operation::deposit(i % 10, Decimal::ONE).unwrap();
            queue.enqueue(op).unwrap();
        }
        queue.signal_shutdown();
        let joined = pool.join();
        let stats = joined.stats;

        assert_eq!((joined.joined, joined.panicked), (4, 0));
        assert_eq!(stats.processed, 110);
        assert_eq!(stats.deposits, 100);
        assert_eq!(stats.audits, 10);
        assert_eq!(sink.len(), 110);
        assert!(queue.is_empty());
        assert_eq!(ledger.total(), Decimal::new(10_100, 0));
    }

    #[test]
    fn test_idle_pool_exits_on_shutdown() {
        let (queue, ledger, _sink) = setup(4, 0);
        let pool = WorkerPool::spawn(3, Arc::clone(&queue), ledger).unwrap();

        queue.signal_shutdown();

        assert_eq!(
            pool.join(),
            PoolJoin {
                joined: 3,
                panicked: 0,
                stats: WorkerStats::default(),
            }
        );
    }

    #[test]
    fn test_join_counts_panicked_workers() {
        let pool = WorkerPool {
            handles: vec![
                thread::spawn(|| -> WorkerStats { panic!("worker failure") }),
                thread::spawn(|| WorkerStats {
                    processed: 2,
                    deposits: 2,
                    ..WorkerStats::default()
                }),
            ],
        };

        let joined = pool.join();

        assert_eq!(joined.joined, 1);
        assert_eq!(joined.panicked, 1);
        assert_eq!(joined.stats.processed, 2);
    }

    #[test]
    fn test_grow_keeps_workers_and_absorb_merges_pools() {
        let (queue, ledger, _sink) = setup(4, 0);
        let mut pool = WorkerPool::default();
        pool.grow(0..2, &queue, &ledger).unwrap();
        let mut other = WorkerPool::default();
        other.grow(2..3, &queue, &ledger).unwrap();

        pool.absorb(other);
        assert_eq!(pool.len(), 3);

        queue.signal_shutdown();
        assert_eq!(pool.join().joined, 3);
    }

    #[test]
    fn test_worker_threads_are_named() {
        let (queue, ledger, _sink) = setup(4, 0);
        let handle = spawn_worker(7, Arc::clone(&queue), ledger).unwrap();
        assert_eq!(handle.thread().name(), Some("ledger-worker-7"));

        queue.signal_shutdown();
        handle.join().unwrap();
    }

    #[test]
    fn test_stats_merge() {
        let mut total = WorkerStats {
            processed: 3,
            deposits: 1,
            transfers: 1,
            insufficient_funds: 0,
            audits: 1,
            failed: 0,
        };
        total.merge(&WorkerStats {
            processed: 2,
            deposits: 0,
            transfers: 0,
            insufficient_funds: 1,
            audits: 0,
            failed: 1,
        });
        assert_eq!(total.processed, 5);
        assert_eq!(total.insufficient_funds, 1);
        assert_eq!(total.failed, 1);
    }
}
