use crate::config::{ServerConfig, SimulationConfig};
use clap::Parser;
use rust_decimal::Decimal;
use std::time::Duration;

/// Simulate concurrent clients against a bounded-queue bank ledger server
#[derive(Parser, Debug)]
#[command(name = "bank-ledger-server")]
#[command(about = "Simulate concurrent clients against a bank ledger server", long_about = None)]
pub struct CliArgs {
    #[arg(
        long = "accounts",
        value_name = "COUNT",
        default_value_t = 10,
        help = "Number of accounts in the ledger"
    )]
    pub accounts: usize,

    #[arg(
        long = "initial-balance",
        value_name = "AMOUNT",
        default_value = "1000.0",
        help = "Opening balance of every account"
    )]
    pub initial_balance: Decimal,

    #[arg(
        long = "queue-capacity",
        value_name = "SIZE",
        default_value_t = 50,
        help = "Fixed capacity of the request queue"
    )]
    pub queue_capacity: usize,

    /// Number of worker threads
    #[arg(
        long = "workers",
        value_name = "COUNT",
        help = "Number of worker threads (default: CPU cores)"
    )]
    pub workers: Option<usize>,

    #[arg(
        long = "audit-every",
        value_name = "N",
        default_value_t = 10,
        help = "Inject an audit after every N accepted client requests (0 disables)"
    )]
    pub audit_every: u64,

    #[arg(
        long = "clients",
        value_name = "COUNT",
        default_value_t = 2,
        help = "Number of simulated client threads"
    )]
    pub clients: usize,

    #[arg(
        long = "client-delay-ms",
        value_name = "MILLIS",
        default_value_t = 1000,
        help = "Pause between two submissions of one client"
    )]
    pub client_delay_ms: u64,

    #[arg(
        long = "duration-secs",
        value_name = "SECS",
        default_value_t = 20,
        help = "How long to run before shutting down"
    )]
    pub duration_secs: u64,

    #[arg(
        long = "seed",
        value_name = "SEED",
        help = "Seed for reproducible client behavior"
    )]
    pub seed: Option<u64>,
}

impl CliArgs {
    /// Create a ServerConfig from CLI arguments
    ///
    /// Zero counts fall back to defaults (see [`ServerConfig::new`]).
    pub fn to_server_config(&self) -> ServerConfig {
        ServerConfig::new(
            self.accounts,
            self.initial_balance,
            self.queue_capacity,
            self.workers.unwrap_or_else(num_cpus::get),
            self.audit_every,
        )
    }

    pub fn to_simulation_config(&self) -> SimulationConfig {
        SimulationConfig {
            clients: self.clients,
            client_delay: Duration::from_millis(self.client_delay_ms),
            duration: Duration::from_secs(self.duration_secs),
            seed: self.seed,
        }
    }
}
