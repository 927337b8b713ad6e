//! Server and simulation configuration
//!
//! [`ServerConfig`] sizes the core (ledger, queue, worker pool, audit
//! cadence). [`SimulationConfig`] drives the client simulator and the
//! run-duration timer around it.

use crate::core::audit::DEFAULT_AUDIT_EVERY;
use crate::types::BankError;
use rust_decimal::Decimal;
use std::time::Duration;
use tracing::warn;

/// Default number of accounts
pub const DEFAULT_ACCOUNTS: usize = 10;

/// Default queue capacity
pub const DEFAULT_QUEUE_CAPACITY: usize = 50;

/// Configuration of the server core
#[derive(Clone, Debug, PartialEq)]
pub struct ServerConfig {
    /// Number of accounts, numbered 0..accounts
    pub accounts: usize,
    /// Opening balance of every account
    pub initial_balance: Decimal,
    /// Fixed capacity of the request queue
    pub queue_capacity: usize,
    /// Number of worker threads
    pub workers: usize,
    /// Accepted client requests between two injected audits; 0 disables
    pub audit_every: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            accounts: DEFAULT_ACCOUNTS,
            initial_balance: Decimal::new(1000, 0),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            workers: num_cpus::get(),
            audit_every: DEFAULT_AUDIT_EVERY,
        }
    }
}

impl ServerConfig {
    /// Create a ServerConfig, replacing zero counts with defaults
    ///
    /// A zero account count, queue capacity or worker count cannot run a
    /// server; each one is replaced by its default with a warning.
    pub fn new(
        accounts: usize,
        initial_balance: Decimal,
        queue_capacity: usize,
        workers: usize,
        audit_every: u64,
    ) -> Self {
        let default = Self::default();

        Self {
            accounts: or_default("accounts", accounts, default.accounts),
            initial_balance,
            queue_capacity: or_default("queue_capacity", queue_capacity, default.queue_capacity),
            workers: or_default("workers", workers, default.workers),
            audit_every,
        }
    }

    /// Check that a server can be built from this configuration
    ///
    /// # Errors
    ///
    /// Returns [`BankError::InvalidConfig`] if:
    /// - There are no accounts, or more than account ids can address
    /// - The initial balance is negative
    /// - There are no workers
    /// - The queue cannot hold an admission (see [`crate::core::RequestQueue::new`])
    pub fn validate(&self) -> Result<(), BankError> {
        if self.accounts == 0 {
            return Err(BankError::invalid_config("at least one account is required"));
        }
        if self.accounts > u32::MAX as usize {
            return Err(BankError::invalid_config(format!(
                "{} accounts exceed the addressable range",
                self.accounts
            )));
        }
        if self.initial_balance < Decimal::ZERO {
            return Err(BankError::invalid_config(format!(
                "initial balance {} is negative",
                self.initial_balance
            )));
        }
        if self.workers == 0 {
            return Err(BankError::invalid_config("at least one worker is required"));
        }
        if self.queue_capacity == 0 {
            return Err(BankError::invalid_config("queue capacity must be at least 1"));
        }
        if self.audit_every > 0 && self.queue_capacity < 2 {
            return Err(BankError::invalid_config(
                "queue capacity must be at least 2 when audits are injected",
            ));
        }
        Ok(())
    }
}

/// Configuration of the client simulator and run timer
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimulationConfig {
    /// Number of client threads
    pub clients: usize,
    /// Pause between two submissions of one client
    pub client_delay: Duration,
    /// How long to run before shutdown is triggered
    pub duration: Duration,
    /// Base seed for reproducible clients; each client adds its index
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            clients: 2,
            client_delay: Duration::from_secs(1),
            duration: Duration::from_secs(20),
            seed: None,
        }
    }
}

fn or_default(name: &str, value: usize, default: usize) -> usize {
    if value == 0 {
        warn!(
            "Invalid {} ({}), using default ({})",
            name, value, default
        );
        default
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_default_is_valid() {
        let config = ServerConfig::default();
        assert_eq!(config.accounts, 10);
        assert_eq!(config.initial_balance, Decimal::new(1000, 0));
        assert_eq!(config.queue_capacity, 50);
        assert_eq!(config.workers, num_cpus::get());
        assert_eq!(config.audit_every, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_new_replaces_zero_counts_with_defaults() {
        let config = ServerConfig::new(0, Decimal::ONE, 0, 0, 0);
        let default = ServerConfig::default();
        assert_eq!(config.accounts, default.accounts);
        assert_eq!(config.queue_capacity, default.queue_capacity);
        assert_eq!(config.workers, default.workers);
        // Zero audit cadence is meaningful: it disables injection
        assert_eq!(config.audit_every, 0);
        assert_eq!(config.initial_balance, Decimal::ONE);
    }

    #[rstest]
    #[case::no_accounts(ServerConfig { accounts: 0, ..ServerConfig::default() })]
    #[case::no_workers(ServerConfig { workers: 0, ..ServerConfig::default() })]
    #[case::no_capacity(ServerConfig { queue_capacity: 0, ..ServerConfig::default() })]
    #[case::single_slot_with_audits(ServerConfig { queue_capacity: 1, ..ServerConfig::default() })]
    #[case::negative_balance(
        ServerConfig { initial_balance: Decimal::NEGATIVE_ONE, ..ServerConfig::default() }
    )]
    fn test_validate_rejects(#[case] config: ServerConfig) {
        assert!(matches!(config.validate(), Err(BankError::InvalidConfig { .. })));
    }

    #[test]
    fn test_single_slot_queue_without_audits_is_valid() {
        let config = ServerConfig {
            queue_capacity: 1,
            audit_every: 0,
            ..ServerConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_simulation_defaults() {
        let config = SimulationConfig::default();
        assert_eq!(config.clients, 2);
        assert_eq!(config.client_delay, Duration::from_secs(1));
        assert_eq!(config.duration, Duration::from_secs(20));
        assert_eq!(config.seed, None);
    }
}
