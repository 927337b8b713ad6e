//! Randomized client simulation
//!
//! Each client thread loops until the server shuts down: it draws a deposit
//! or a transfer with equal probability, random accounts and an amount
//! between 0.0 and 99.9, submits it, then pauses for the configured delay.
//! A transfer whose two random accounts coincide is skipped, not submitted.

use crate::config::SimulationConfig;
use crate::core::{BankServer, ProducerStats, ServerHandle};
use crate::types::{AccountId, BankError, Operation};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use std::time::Duration;
use tracing::{debug, warn};

/// Draw one random operation over `accounts` accounts
///
/// Returns `None` when a transfer was drawn with the same source and
/// destination, or when there are no accounts.
pub fn random_operation<R: Rng + ?Sized>(rng: &mut R, accounts: AccountId) -> Option<Operation> {
    if accounts == 0 {
        return None;
    }

    let deposit = rng.random_bool(0.5);
    let source = rng.random_range(0..accounts);
    let dest = rng.random_range(0..accounts);
    let amount = Decimal::new(rng.random_range(0..1000), 1);

    if deposit {
        Operation::deposit(source, amount).ok()
    } else {
        Operation::transfer(source, dest, amount).ok()
    }
}

/// Run one client until shutdown
///
/// Stops at the first [`BankError::ShuttingDown`]; any other rejection is
/// logged and counted. The pause between submissions is cut short by
/// shutdown.
pub fn run_client(
    id: usize,
    handle: ServerHandle,
    delay: Duration,
    seed: Option<u64>,
) -> ProducerStats {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(id as u64)),
        None => StdRng::from_os_rng(),
    };
    let accounts = AccountId::try_from(handle.accounts()).unwrap_or(AccountId::MAX);
    let mut stats = ProducerStats::default();

    loop {
        if let Some(operation) = random_operation(&mut rng, accounts) {
            match handle.submit(operation) {
                Ok(admission) => {
                    stats.submitted += 1;
                    if admission.audit.is_some() {
                        stats.audits_triggered += 1;
                    }
                }
                Err(BankError::ShuttingDown) => break,
                Err(e) => {
                    stats.invalid += 1;
                    warn!(client = id, error = %e, "submission rejected");
                }
            }
        }

        if handle.wait_for_shutdown(delay) {
            break;
        }
    }

    debug!(client = id, submitted = stats.submitted, "client exiting");
    stats
}

/// Start `config.clients` client threads on `server`
///
/// The threads are registered with the server and joined when it drains.
pub fn spawn_clients(server: &BankServer, config: &SimulationConfig) -> Result<(), BankError> {
    for id in 0..config.clients {
        let delay = config.client_delay;
        let seed = config.seed;
        server.spawn_producer(move |handle| run_client(id, handle, delay, seed))?;
    }
    Ok(())
}
