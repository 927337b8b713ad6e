//! Core concurrency module
//!
//! This module contains the server core:
//! - `traits` - The reporting sink abstraction
//! - `sink` - Tracing and in-memory sinks
//! - `ledger` - Account balances and the operations applied to them
//! - `ring` - Fixed-capacity circular buffer
//! - `ids` - Shared monotonic request ids
//! - `audit` - Counter-triggered audit injection
//! - `queue` - Bounded blocking request queue with shutdown mode
//! - `worker` - Worker loop and pool
//! - `shutdown` - Shutdown state machine and thread joining
//! - `server` - Facade tying the pieces together

pub mod audit;
pub mod ids;
pub mod ledger;
pub mod queue;
pub mod ring;
pub mod server;
pub mod shutdown;
pub mod sink;
pub mod traits;
pub mod worker;

pub use audit::AuditInjector;
pub use ids::IdAllocator;
pub use ledger::Ledger;
pub use queue::{QueueStats, RequestQueue};
pub use ring::RingBuffer;
pub use server::{BankServer, ServerHandle};
pub use shutdown::{DrainSummary, Phase, ProducerStats, ShutdownCoordinator};
pub use sink::{MemorySink, TracingSink};
pub use traits::ReportSink;
pub use worker::{run_worker, PoolJoin, WorkerPool, WorkerStats};
