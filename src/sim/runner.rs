//! Timed simulation run
//!
//! Builds a server, starts its workers and clients, lets them run for the
//! configured duration and then drains everything.

use crate::config::{ServerConfig, SimulationConfig};
use crate::core::{BankServer, DrainSummary, ReportSink};
use crate::sim::client::spawn_clients;
use crate::types::{Account, BankError};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::info;

/// Result of a completed run
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationOutcome {
    pub summary: DrainSummary,
    /// Final balances in account order
    pub balances: Vec<Account>,
    /// Sum of all balances before the run started
    pub opening_total: Decimal,
}

impl SimulationOutcome {
    /// Sum of the final balances
    pub fn closing_total(&self) -> Decimal {
        self.balances.iter().map(|account| account.balance).sum()
    }
}

/// Run a full simulation and return once the server has drained
///
/// The timer waits on the server's shutdown signal, so a run whose shutdown
/// is triggered elsewhere ends early.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or a thread cannot be
/// spawned. Threads started before the failure are drained first.
pub fn run_simulation(
    server_config: ServerConfig,
    sim_config: &SimulationConfig,
    sink: Arc<dyn ReportSink>,
) -> Result<SimulationOutcome, BankError> {
    let server = BankServer::new(server_config, sink)?;
    let opening_total = server.total_balance();

    let started = server
        .start_workers()
        .and_then(|workers| spawn_clients(&server, sim_config).map(|()| workers));
    let workers = match started {
        Ok(workers) => workers,
        Err(e) => {
            server.trigger_shutdown_and_wait();
            return Err(e);
        }
    };

    info!(
        workers,
        clients = sim_config.clients,
        duration_ms = sim_config.duration.as_millis() as u64,
        "simulation started"
    );

    server.handle().wait_for_shutdown(sim_config.duration);
    let summary = server.trigger_shutdown_and_wait();

    Ok(SimulationOutcome {
        summary,
        balances: server.snapshot(),
        opening_total,
    })
}
