//! Bounded multi-producer/multi-consumer request queue
//!
//! This module provides the `RequestQueue` struct through which producers
//! hand requests to the worker pool.
//!
//! # Design
//!
//! ```text
//! RequestQueue
//!     ├── Mutex<QueueState>
//!     │     ├── RingBuffer<Request>  (fixed capacity, FIFO)
//!     │     ├── AuditInjector        (accepted-request counter)
//!     │     └── shutdown flag        (set once, never cleared)
//!     ├── not_empty / not_full       (consumer / producer wait conditions)
//!     ├── shutdown_signal            (pacing waits of collaborators)
//!     └── IdAllocator                (shared monotonic request ids)
//! ```
//!
//! Every wait loop has the same shape: wait while the queue cannot serve the
//! caller AND shutdown has not been signaled, then re-check both conditions.
//! Ids are allocated inside the critical section, so queue order is id order.
//!
//! # Shutdown
//!
//! After [`RequestQueue::signal_shutdown`]:
//! - `enqueue` rejects with [`BankError::ShuttingDown`] and never inserts
//! - `dequeue` keeps returning queued requests until the queue is empty, then
//!   returns `None`

use crate::core::audit::AuditInjector;
use crate::core::ids::IdAllocator;
use crate::core::ring::RingBuffer;
use crate::types::{Admission, BankError, Operation, Origin, Request};
use parking_lot::{Condvar, Mutex};
use std::time::Duration;
use tracing::{debug, trace};

/// State guarded by the queue lock
#[derive(Debug)]
struct QueueState {
    ring: RingBuffer<Request>,
    injector: AuditInjector,
    injected: u64,
    shutdown: bool,
}

impl QueueState {
    fn insert(&mut self, request: Request) {
        let pushed = self.ring.push(request).is_ok();
        debug_assert!(pushed, "insert called without a free slot");
    }
}

/// Point-in-time counters of a queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueStats {
    /// Requests currently queued
    pub len: usize,
    /// Fixed capacity
    pub capacity: usize,
    /// Client requests counted by the audit injector
    pub accepted: u64,
    /// Audits inserted by the injector
    pub injected: u64,
    /// Whether shutdown has been signaled
    pub shutting_down: bool,
}

/// Fixed-capacity FIFO shared by producers and workers
#[derive(Debug)]
pub struct RequestQueue {
    state: Mutex<QueueState>,
    not_empty: Condvar,
    not_full: Condvar,
    shutdown_signal: Condvar,
    ids: IdAllocator,
}

impl RequestQueue {
    /// Create an empty queue
    ///
    /// # Errors
    ///
    /// Returns [`BankError::InvalidConfig`] if `capacity` is zero, or if it is
    /// below two while `injector` is enabled: an admission that triggers an
    /// audit needs room for both requests at once.
    pub fn new(capacity: usize, injector: AuditInjector) -> Result<Self, BankError> {
        if capacity == 0 {
            return Err(BankError::invalid_config("queue capacity must be at least 1"));
        }
        if injector.is_enabled() && capacity < 2 {
            return Err(BankError::invalid_config(
                "queue capacity must be at least 2 when audits are injected",
            ));
        }

        Ok(RequestQueue {
            state: Mutex::new(QueueState {
                ring: RingBuffer::new(capacity),
                injector,
                injected: 0,
                shutdown: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            shutdown_signal: Condvar::new(),
            ids: IdAllocator::new(),
        })
    }

    /// Admit a client operation
    ///
    /// Blocks while the queue lacks room and shutdown has not been signaled.
    /// If the admission crosses the audit threshold, the audit is inserted
    /// directly behind it in the same critical section, with the next id.
    ///
    /// # Returns
    ///
    /// * `Ok(Admission)` - Ids of the inserted request and of its audit, if any
    /// * `Err(BankError::ShuttingDown)` - Shutdown was signaled; nothing was inserted
    pub fn enqueue(&self, operation: Operation) -> Result<Admission, BankError> {
        let kind = operation.kind();
        let mut state = self.state.lock();

        // Other producers move the audit counter while this one waits, so the
        // slot requirement is recomputed on every pass
        loop {
            let slots = 1 + usize::from(state.injector.would_trigger(kind));
            if state.ring.free() >= slots || state.shutdown {
                break;
            }
            trace!(slots, len = state.ring.len(), "queue full, producer waiting");
            self.not_full.wait(&mut state);
        }
        if state.shutdown {
            return Err(BankError::ShuttingDown);
        }

        let id = self.ids.next_id();
        state.insert(Request {
            id,
            operation,
            origin: Origin::Client,
        });
        self.not_empty.notify_one();

        let audit = if state.injector.record(kind) {
            let audit_id = self.ids.next_id();
            state.insert(Request {
                id: audit_id,
                operation: Operation::Audit,
                origin: Origin::Injected,
            });
            state.injected += 1;
            self.not_empty.notify_one();
            debug!(request = id, audit = audit_id, "audit injected");
            Some(audit_id)
        } else {
            None
        };

        Ok(Admission { id, audit })
    }

    /// Take the request at the head
    ///
    /// Blocks while the queue is empty and shutdown has not been signaled.
    /// Returns `None` only once the queue is empty AND shutdown was signaled,
    /// so requests queued before shutdown are always handed out.
    pub fn dequeue(&self) -> Option<Request> {
        let mut state = self.state.lock();
        while state.ring.is_empty() && !state.shutdown {
            self.not_empty.wait(&mut state);
        }

        let request = state.ring.pop()?;
        self.not_full.notify_one();
        Some(request)
    }

    /// Stop admitting requests and wake every waiter
    ///
    /// Returns `true` for the call that actually set the flag; later calls
    /// are no-ops that return `false`.
    pub fn signal_shutdown(&self) -> bool {
        let mut state = self.state.lock();
        let first = !state.shutdown;
        state.shutdown = true;

        self.not_empty.notify_all();
        self.not_full.notify_all();
        self.shutdown_signal.notify_all();

        if first {
            debug!(queued = state.ring.len(), "queue shutdown signaled");
        }
        first
    }

    pub fn is_shutting_down(&self) -> bool {
        self.state.lock().shutdown
    }

    /// Block for up to `timeout` or until shutdown is signaled
    ///
    /// Returns whether shutdown has been signaled. Uses its own condition, so
    /// a pacing collaborator never consumes a producer or consumer wakeup.
    pub fn wait_for_shutdown(&self, timeout: Duration) -> bool {
        let mut state = self.state.lock();
        if !state.shutdown {
            self.shutdown_signal
                .wait_while_for(&mut state, |state| !state.shutdown, timeout);
        }
        state.shutdown
    }

    pub fn len(&self) -> usize {
        self.state.lock().ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().ring.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.state.lock().ring.capacity()
    }

    /// Number of request ids handed out so far
    pub fn allocated_ids(&self) -> u64 {
        self.ids.allocated()
    }

    pub fn stats(&self) -> QueueStats {
        let state = self.state.lock();
        QueueStats {
            len: state.ring.len(),
            capacity: state.ring.capacity(),
            accepted: state.injector.accepted(),
            injected: state.injected,
            shutting_down: state.shutdown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RequestKind;
    use rust_decimal::Decimal;
    use std::collections::HashSet;
    use std::sync::mpsc;
    use std::sync::Arc;
    use std::thread;

    const BLOCKED: Duration = Duration::from_millis(100);
    const WAKE: Duration = Duration::from_secs(5);

    fn deposit(account: u32) -> Operation {
        Operation::Deposit {
            account,
            amount: Decimal::ONE,
        }
    }

    fn plain_queue(capacity: usize) -> Arc<RequestQueue> {
        Arc::new(RequestQueue::new(capacity, AuditInjector::disabled()).unwrap())
    }

    #[test]
    fn test_new_rejects_zero_capacity() {
        let result = RequestQueue::new(0, AuditInjector::disabled());
        assert!(matches!(result, Err(BankError::InvalidConfig { .. })));
    }

    #[test]
    fn test_new_rejects_single_slot_with_audits() {
        let result = RequestQueue::new(1, AuditInjector::default());
        assert!(matches!(result, Err(BankError::InvalidConfig { .. })));
        assert!(RequestQueue::new(1, AuditInjector::disabled()).is_ok());
    }

    #[test]
    fn test_fifo_order_and_increasing_ids() {
        let queue = plain_queue(8);
        for account in 0..5 {
            let admission = queue.enqueue(deposit(account)).unwrap();
            assert_eq!(admission.id, u64::from(account));
            assert_eq!(admission.audit, None);
        }
        assert_eq!(queue.len(), 5);

        for account in 0..5 {
            let request = queue.dequeue().unwrap();
            assert_eq!(request.id, u64::from(account));
            assert_eq!(request.operation, deposit(account));
            assert_eq!(request.origin, Origin::Client);
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn test_enqueue_blocks_on_full_queue_until_dequeue() {
        let queue = plain_queue(2);
        queue.enqueue(deposit(0)).unwrap();
        queue.enqueue(deposit(1)).unwrap();

        let (tx, rx) = mpsc::channel();
        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                let result = queue.enqueue(deposit(2));
                tx.send(()).unwrap();
                result
            })
        };

        assert!(rx.recv_timeout(BLOCKED).is_err(), "producer should block");
        assert_eq!(queue.len(), 2);

        assert_eq!(queue.dequeue().unwrap().id, 0);
        rx.recv_timeout(WAKE).expect("producer should resume");

        let admission = producer.join().unwrap().unwrap();
        assert_eq!(admission.id, 2);
        assert_eq!(queue.dequeue().unwrap().id, 1);
        assert_eq!(queue.dequeue().unwrap().id, 2);
    }

    #[test]
    fn test_dequeue_blocks_on_empty_queue_until_enqueue() {
        let queue = plain_queue(2);

        let (tx, rx) = mpsc::channel();
        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                let request = queue.dequeue();
                tx.send(()).unwrap();
                request
            })
        };

        assert!(rx.recv_timeout(BLOCKED).is_err(), "consumer should block");
        queue.enqueue(deposit(4)).unwrap();
        rx.recv_timeout(WAKE).expect("consumer should resume");

        assert_eq!(consumer.join().unwrap().unwrap().operation, deposit(4));
    }

    #[test]
    fn test_shutdown_rejects_new_work_but_drains_queued_work() {
        let queue = plain_queue(4);
        queue.enqueue(deposit(0)).unwrap();
        queue.enqueue(deposit(1)).unwrap();

        assert!(queue.signal_shutdown());
        assert!(queue.is_shutting_down());

        assert_eq!(queue.enqueue(deposit(2)), Err(BankError::ShuttingDown));
        assert_eq!(queue.dequeue().unwrap().id, 0);
        assert_eq!(queue.dequeue().unwrap().id, 1);
        assert_eq!(queue.dequeue(), None);
        assert_eq!(queue.dequeue(), None);
        // Rejected admissions do not consume ids
        assert_eq!(queue.allocated_ids(), 2);
    }

    #[test]
    fn test_signal_shutdown_is_idempotent() {
        let queue = plain_queue(1);
        assert!(queue.signal_shutdown());
        assert!(!queue.signal_shutdown());
        assert!(queue.is_shutting_down());
    }

    #[test]
    fn test_shutdown_wakes_every_blocked_producer() {
        let queue = plain_queue(1);
        queue.enqueue(deposit(0)).unwrap();

        let producers: Vec<_> = (0..3)
            .map(|account| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || queue.enqueue(deposit(account)))
            })
            .collect();

        thread::sleep(BLOCKED);
        queue.signal_shutdown();

        for producer in producers {
            assert_eq!(producer.join().unwrap(), Err(BankError::ShuttingDown));
        }
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_shutdown_wakes_every_blocked_consumer() {
        let queue = plain_queue(4);

        let consumers: Vec<_> = (0..3)
            .map(|_| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || queue.dequeue())
            })
            .collect();

        thread::sleep(BLOCKED);
        queue.signal_shutdown();

        for consumer in consumers {
            assert_eq!(consumer.join().unwrap(), None);
        }
    }

    #[test]
    fn test_audit_injected_directly_behind_trigger() {
        let queue = Arc::new(RequestQueue::new(16, AuditInjector::new(3)).unwrap());

        let admissions: Vec<Admission> = (0..7)
            .map(|account| queue.enqueue(deposit(account)).unwrap())
            .collect();
        assert_eq!(admissions[2], Admission { id: 2, audit: Some(3) });
        assert_eq!(admissions[5], Admission { id: 6, audit: Some(7) });

        let drained: Vec<(u64, RequestKind, Origin)> = std::iter::from_fn(|| {
            if queue.is_empty() {
                None
            } else {
                queue.dequeue()
            }
        })
        .map(|request| (request.id, request.kind(), request.origin))
        .collect();

        let ids: Vec<u64> = drained.iter().map(|(id, _, _)| *id).collect();
        assert_eq!(ids, (0..9).collect::<Vec<_>>());
        for (id, kind, origin) in drained {
            if id == 3 || id == 7 {
                assert_eq!((kind, origin), (RequestKind::Audit, Origin::Injected));
            } else {
                assert_eq!((kind, origin), (RequestKind::Deposit, Origin::Client));
            }
        }

        let stats = queue.stats();
        assert_eq!(stats.accepted, 7);
        assert_eq!(stats.injected, 2);
    }

    #[test]
    fn test_client_audits_do_not_advance_the_threshold() {
        let queue = RequestQueue::new(8, AuditInjector::new(2)).unwrap();

        assert_eq!(queue.enqueue(Operation::Audit).unwrap().audit, None);
        assert_eq!(queue.enqueue(deposit(0)).unwrap().audit, None);
        assert_eq!(queue.enqueue(Operation::Audit).unwrap().audit, None);
        assert_eq!(queue.enqueue(deposit(1)).unwrap().audit, Some(4));
    }

    #[test]
    fn test_triggering_admission_waits_for_two_slots() {
        let queue = Arc::new(RequestQueue::new(2, AuditInjector::new(2)).unwrap());
        queue.enqueue(deposit(0)).unwrap();

        let (tx, rx) = mpsc::channel();
        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                let result = queue.enqueue(deposit(1));
                tx.send(()).unwrap();
                result
            })
        };

        // One slot is free, but the trigger and its audit need two
        assert!(rx.recv_timeout(BLOCKED).is_err(), "producer should block");

        assert_eq!(queue.dequeue().unwrap().id, 0);
        rx.recv_timeout(WAKE).expect("producer should resume");
        assert_eq!(
            producer.join().unwrap().unwrap(),
            Admission { id: 1, audit: Some(2) }
        );

        let next = queue.dequeue().unwrap();
        assert_eq!((next.id, next.kind()), (1, RequestKind::Deposit));
        let audit = queue.dequeue().unwrap();
        assert_eq!((audit.id, audit.kind()), (2, RequestKind::Audit));
    }

    #[test]
    fn test_waiting_producer_becomes_trigger_after_another_admission() {
        let queue = Arc::new(RequestQueue::new(2, AuditInjector::new(2)).unwrap());
        // Client audits fill the queue without moving the counter
        queue.enqueue(Operation::Audit).unwrap();
        queue.enqueue(Operation::Audit).unwrap();

        let producers: Vec<_> = (0..2)
            .map(|account| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || queue.enqueue(deposit(account)).unwrap())
            })
            .collect();
        thread::sleep(BLOCKED);

        // Both producers waited for one slot; whoever enters second is now the
        // trigger and must wait for a second slot before inserting
        let mut delivered = Vec::new();
        while delivered.len() < 5 {
            let request = queue.dequeue().unwrap();
            assert!(queue.len() <= queue.capacity());
            delivered.push((request.id, request.kind()));
        }
        let admissions: Vec<Admission> =
            producers.into_iter().map(|p| p.join().unwrap()).collect();

        let trigger = admissions
            .iter()
            .find(|admission| admission.audit.is_some())
            .expect("one admission injects an audit");
        assert_eq!(trigger.audit, Some(trigger.id + 1));
        assert_eq!(
            delivered.iter().map(|(id, _)| *id).collect::<Vec<_>>(),
            (0..5).collect::<Vec<_>>()
        );
        assert_eq!(delivered[4].1, RequestKind::Audit);
        assert_eq!(queue.stats().injected, 1);
    }

    #[test]
    fn test_shutdown_rejects_trigger_without_injecting() {
        let queue = RequestQueue::new(4, AuditInjector::new(1)).unwrap();
        queue.signal_shutdown();

        assert_eq!(queue.enqueue(deposit(0)), Err(BankError::ShuttingDown));
        let stats = queue.stats();
        assert_eq!((stats.len, stats.accepted, stats.injected), (0, 0, 0));
    }

    #[test]
    fn test_wait_for_shutdown() {
        let queue = plain_queue(1);
        assert!(!queue.wait_for_shutdown(Duration::from_millis(10)));

        let waiter = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.wait_for_shutdown(Duration::from_secs(30)))
        };
        thread::sleep(BLOCKED);
        queue.signal_shutdown();

        assert!(waiter.join().unwrap());
        assert!(queue.wait_for_shutdown(Duration::ZERO));
    }

    #[test]
    fn test_many_producers_and_consumers_lose_nothing() {
        const PRODUCERS: u32 = 4;
        const PER_PRODUCER: u32 = 500;

        let queue = Arc::new(RequestQueue::new(8, AuditInjector::default()).unwrap());

        let consumers: Vec<_> = (0..4)
            .map(|_| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    let mut seen = Vec::new();
                    while let Some(request) = queue.dequeue() {
                        seen.push(request);
                    }
                    seen
                })
            })
            .collect();

        let producers: Vec<_> = (0..PRODUCERS)
            .map(|producer| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    for i in 0..PER_PRODUCER {
                        queue.enqueue(deposit(producer * PER_PRODUCER + i)).unwrap();
                    }
                })
            })
            .collect();

        for producer in producers {
            producer.join().unwrap();
        }
        queue.signal_shutdown();

        let mut ids = HashSet::new();
        let mut audits = 0;
        for consumer in consumers {
            let seen = consumer.join().unwrap();
            // Each consumer observes ids in increasing order
            assert!(seen.windows(2).all(|pair| pair[0].id < pair[1].id));
            for request in seen {
                assert!(ids.insert(request.id), "request {} delivered twice", request.id);
                if request.kind() == RequestKind::Audit {
                    audits += 1;
                }
            }
        }

        let submitted = u64::from(PRODUCERS * PER_PRODUCER);
        assert_eq!(audits, submitted / 10);
        assert_eq!(ids.len() as u64, submitted + submitted / 10);
        assert!(queue.is_empty());
    }
}
