//! Bank Ledger Server Library
//! # Overview
//!
//! This library provides a concurrent bank ledger server: client threads
//! submit deposits, transfers and audits into a bounded FIFO queue, and a
//! pool of worker threads applies them to a shared set of accounts.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core data types (Account, Operation, Request, Report, BankError)
//! - [`config`] - Server and simulation configuration
//! - [`cli`] - CLI arguments parsing
//! - [`core`] - Server components:
//!   - [`core::ledger`] - Account balances and the operations applied to them
//!   - [`core::queue`] - Bounded blocking queue with audit injection and shutdown mode
//!   - [`core::worker`] - Worker loop and pool
//!   - [`core::shutdown`] - Shutdown state machine and thread joining
//!   - [`core::server`] - Facade tying the pieces together
//! - [`sim`] - Randomized clients and the timed simulation run
//! - [`io`] - CSV output of final balances
//!
//! # Request Types
//!
//! - **Deposit**: Credit funds to an account
//! - **Transfer**: Move funds between two accounts (requires sufficient balance)
//! - **Audit**: Report every balance as one consistent snapshot
//!
//! # Lifecycle
//!
//! ```text
//! Running ──trigger──▶ ShuttingDown ──queue empty, threads joined──▶ Drained
//! ```
//!
//! Once shutdown is triggered no request is admitted, every queued request
//! is still processed, and blocked producers and workers are all woken.

// Module declarations
pub mod cli;
pub mod config;
pub mod core;
pub mod io;
pub mod sim;
pub mod types;

pub use config::{ServerConfig, SimulationConfig};
pub use core::{BankServer, DrainSummary, Ledger, ReportSink, RequestQueue, ServerHandle};
pub use io::write_balances_csv;
pub use sim::{run_simulation, SimulationOutcome};
pub use types::{
    Account, AccountId, Admission, BankError, Operation, Report, Request, RequestId, RequestKind,
};
