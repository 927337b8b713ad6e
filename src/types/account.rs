//! Account-related types for the bank ledger
//!
//! This module defines the Account structure held by the ledger and the
//! identifier type used to address it.

use rust_decimal::Decimal;
use serde::Serialize;

/// Account identifier
///
/// Accounts are numbered densely from 0 to N-1, where N is the number of
/// accounts the ledger was created with.
pub type AccountId = u32;

/// Account state
///
/// Owned exclusively by the ledger. Copies handed out by snapshots are
/// consistent with a single point in time but are never written back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Account {
    /// The account ID (0..N-1)
    pub id: AccountId,

    /// Current balance
    pub balance: Decimal,
}

impl Account {
    /// Create a new account with the given opening balance
    pub fn new(id: AccountId, balance: Decimal) -> Self {
        Account { id, balance }
    }
}
