//! Server facade
//!
//! `BankServer` wires the ledger, the request queue, the worker pool and the
//! shutdown coordinator together and exposes the operations collaborators
//! use:
//!
//! - [`BankServer::submit`] / [`ServerHandle::submit`] - offer new work
//! - [`BankServer::run_worker`] / [`BankServer::start_workers`] - drain the queue
//! - [`BankServer::trigger_shutdown_and_wait`] - stop and wait for full drain
//!
//! # Architecture
//!
//! ```text
//! BankServer
//!     ├── Arc<Ledger>            (accounts + reporting sink)
//!     ├── Arc<RequestQueue>      (ring buffer, audit injector, id allocator)
//!     └── ShutdownCoordinator    (phase, registered threads, tracked workers)
//! ```

use crate::config::ServerConfig;
use crate::core::audit::AuditInjector;
use crate::core::ledger::Ledger;
use crate::core::queue::{QueueStats, RequestQueue};
use crate::core::shutdown::{DrainSummary, Phase, ProducerStats, ShutdownCoordinator};
use crate::core::traits::ReportSink;
use crate::core::worker::{WorkerPool, WorkerStats};
use crate::types::{Account, AccountId, Admission, BankError, Operation, RequestKind};
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::info;

/// Cloneable submission endpoint for producer threads
#[derive(Debug, Clone)]
pub struct ServerHandle {
    ledger: Arc<Ledger>,
    queue: Arc<RequestQueue>,
}

impl ServerHandle {
    /// Offer an operation to the server
    ///
    /// Blocks while the queue is full. Account ids are checked against the
    /// ledger before admission so a bad request never reaches a worker.
    ///
    /// # Errors
    ///
    /// - [`BankError::InvalidAccount`] for an account outside the ledger
    /// - [`BankError::ShuttingDown`] once shutdown has begun; stop submitting
    pub fn submit(&self, operation: Operation) -> Result<Admission, BankError> {
        for account in operation.accounts() {
            self.ledger.check_account(account)?;
        }
        self.queue.enqueue(operation)
    }

    /// Offer an operation given as a kind plus optional account fields
    pub fn submit_parts(
        &self,
        kind: RequestKind,
        source: Option<AccountId>,
        dest: Option<AccountId>,
        amount: Decimal,
    ) -> Result<Admission, BankError> {
        self.submit(Operation::from_parts(kind, source, dest, amount)?)
    }

    /// Number of accounts in the ledger
    pub fn accounts(&self) -> usize {
        self.ledger.len()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.queue.is_shutting_down()
    }

    /// Sleep for up to `timeout`, waking early on shutdown
    ///
    /// Returns whether shutdown has been signaled.
    pub fn wait_for_shutdown(&self, timeout: Duration) -> bool {
        self.queue.wait_for_shutdown(timeout)
    }
}

/// Bank ledger server processed by a fixed worker pool
#[derive(Debug)]
pub struct BankServer {
    config: ServerConfig,
    handle: ServerHandle,
    coordinator: ShutdownCoordinator,
    spawned_workers: AtomicUsize,
    spawned_producers: AtomicUsize,
}

impl BankServer {
    /// Build a server in the `Running` phase with no threads started
    ///
    /// # Errors
    ///
    /// Returns [`BankError::InvalidConfig`] if `config` fails validation.
    pub fn new(config: ServerConfig, sink: Arc<dyn ReportSink>) -> Result<Self, BankError> {
        config.validate()?;

        let ledger = Arc::new(Ledger::new(config.accounts, config.initial_balance, sink));
        let queue = Arc::new(RequestQueue::new(
            config.queue_capacity,
            AuditInjector::new(config.audit_every),
        )?);
        let coordinator = ShutdownCoordinator::new(Arc::clone(&queue), Arc::clone(&ledger));

        Ok(BankServer {
            config,
            handle: ServerHandle { ledger, queue },
            coordinator,
            spawned_workers: AtomicUsize::new(0),
            spawned_producers: AtomicUsize::new(0),
        })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// A submission endpoint to move into a producer thread
    pub fn handle(&self) -> ServerHandle {
        self.handle.clone()
    }

    /// Offer an operation; see [`ServerHandle::submit`]
    pub fn submit(&self, operation: Operation) -> Result<Admission, BankError> {
        self.handle.submit(operation)
    }

    /// Offer an operation given as parts; see [`ServerHandle::submit_parts`]
    pub fn submit_parts(
        &self,
        kind: RequestKind,
        source: Option<AccountId>,
        dest: Option<AccountId>,
        amount: Decimal,
    ) -> Result<Admission, BankError> {
        self.handle.submit_parts(kind, source, dest, amount)
    }

    /// Run one worker loop on the calling thread until drained
    ///
    /// Collaborators call this from threads they spawn themselves. The
    /// worker is tracked: [`BankServer::trigger_shutdown_and_wait`] does not
    /// return before it has exited.
    pub fn run_worker(&self) -> WorkerStats {
        self.coordinator.run_tracked_worker()
    }

    /// Spawn the configured number of workers
    ///
    /// The threads are registered with the coordinator and joined by
    /// [`BankServer::trigger_shutdown_and_wait`].
    pub fn start_workers(&self) -> Result<usize, BankError> {
        self.spawn_workers(self.config.workers)
    }

    /// Spawn `count` additional workers
    ///
    /// # Errors
    ///
    /// Returns [`BankError::Io`] if a thread cannot be spawned. The workers
    /// started before the failure are still registered and joined on drain.
    pub fn spawn_workers(&self, count: usize) -> Result<usize, BankError> {
        let first = self.spawned_workers.fetch_add(count, Ordering::Relaxed);
        let mut pool = WorkerPool::default();
        let result = pool.grow(first..first + count, &self.handle.queue, &self.handle.ledger);
        self.coordinator.register_workers(pool);
        result.map(|()| count)
    }

    /// Spawn a named producer thread running `producer`
    ///
    /// The thread is registered with the coordinator and joined on drain.
    pub fn spawn_producer<F>(&self, producer: F) -> Result<(), BankError>
    where
        F: FnOnce(ServerHandle) -> ProducerStats + Send + 'static,
    {
        let index = self.spawned_producers.fetch_add(1, Ordering::Relaxed);
        let handle = self.handle();
        let thread = thread::Builder::new()
            .name(format!("ledger-client-{index}"))
            .spawn(move || producer(handle))?;
        self.coordinator.register_producer(thread);
        Ok(())
    }

    pub fn phase(&self) -> Phase {
        self.coordinator.phase()
    }

    /// Leave `Running` without waiting; idempotent
    pub fn trigger_shutdown(&self) -> bool {
        self.coordinator.trigger()
    }

    /// Stop admitting work and block until every thread has exited
    ///
    /// Requests already queued are processed before the workers exit.
    pub fn trigger_shutdown_and_wait(&self) -> DrainSummary {
        let summary = self.coordinator.trigger_shutdown_and_wait();
        info!(
            submitted = summary.produced.submitted,
            processed = summary.processed.processed,
            insufficient_funds = summary.processed.insufficient_funds,
            "server drained"
        );
        summary
    }

    /// All balances in account order
    pub fn snapshot(&self) -> Vec<Account> {
        self.handle.ledger.snapshot()
    }

    /// Sum of all balances
    pub fn total_balance(&self) -> Decimal {
        self.handle.ledger.total()
    }

    pub fn queue_stats(&self) -> QueueStats {
        self.handle.queue.stats()
    }
}
