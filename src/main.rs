//! Bank Ledger Server CLI
//!
//! Runs a timed simulation of concurrent clients against the ledger server.
//!
//! # Usage
//!
//! ```bash
//! cargo run > balances.csv
//! cargo run -- --clients 4 --client-delay-ms 100 --duration-secs 5 > balances.csv
//! RUST_LOG=debug cargo run -- --workers 2 --audit-every 0 --seed 7
//! ```
//!
//! Every processed request is logged to stderr. When the run ends, the
//! final balances are written to stdout as CSV.
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (invalid configuration, thread spawn failure, output failure)

use bank_ledger_server::core::TracingSink;
use bank_ledger_server::{cli, io, sim, BankError};
use std::process;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn main() {
    let args = cli::parse_args();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_thread_names(true)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(&args) {
        error!("{}", e);
        process::exit(1);
    }
}

fn run(args: &cli::CliArgs) -> Result<(), BankError> {
    let outcome = sim::run_simulation(
        args.to_server_config(),
        &args.to_simulation_config(),
        Arc::new(TracingSink),
    )?;

    let summary = &outcome.summary;
    info!(
        submitted = summary.produced.submitted,
        audits = summary.processed.audits,
        deposits = summary.processed.deposits,
        transfers = summary.processed.transfers,
        insufficient_funds = summary.processed.insufficient_funds,
        opening_total = %outcome.opening_total,
        closing_total = %outcome.closing_total(),
        "simulation finished"
    );
    if summary.panicked > 0 {
        warn!(panicked = summary.panicked, "some threads panicked");
    }

    let mut output = std::io::stdout();
    io::write_balances_csv(&outcome.balances, &mut output)
}
