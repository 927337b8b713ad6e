//! CSV output of final account balances
//!
//! Columns are `account,balance`; balances are rounded to two decimal
//! places and written in account order.

use crate::types::{Account, AccountId, BankError};
use serde::Serialize;
use std::io::Write;

/// One output row
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct BalanceRow {
    pub account: AccountId,
    pub balance: String,
}

impl From<&Account> for BalanceRow {
    fn from(account: &Account) -> Self {
        BalanceRow {
            account: account.id,
            balance: format!("{:.2}", account.balance.round_dp(2)),
        }
    }
}

/// Write account balances in CSV format
///
/// Accounts are sorted by id for deterministic output. The header is
/// written even when `accounts` is empty.
///
/// # Arguments
///
/// * `accounts` - Slice of accounts to write
/// * `output` - Mutable reference to a writer for outputting CSV
///
/// # Errors
///
/// Returns [`BankError::Io`] if serializing or flushing fails.
pub fn write_balances_csv(accounts: &[Account], output: &mut dyn Write) -> Result<(), BankError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(output);

    writer.write_record(["account", "balance"])?;

    let mut sorted: Vec<&Account> = accounts.iter().collect();
    sorted.sort_by_key(|account| account.id);

    for account in sorted {
        writer.serialize(BalanceRow::from(account))?;
    }

    writer.flush()?;
    Ok(())
}
