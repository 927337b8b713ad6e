//! Account ledger
//!
//! This module provides the `Ledger` struct which owns every account balance
//! and applies deposits, transfers and audits to them.
//!
//! The Ledger is responsible for:
//! - Rejecting references to accounts outside `0..N`
//! - Applying each operation as one critical section under a single lock
//! - Emitting one report per operation while still holding that lock
//! - Providing consistent point-in-time snapshots of all balances

use crate::core::traits::ReportSink;
use crate::types::{Account, AccountId, BankError, Report, RequestId, TransferOutcome};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::fmt;
use std::sync::Arc;

/// Thread-safe set of accounts
///
/// All operations serialize on one mutex covering the whole account set.
/// Reports are emitted to the sink before the lock is released, so the
/// sink observes them in mutation order.
pub struct Ledger {
    /// Accounts indexed by id
    accounts: Mutex<Vec<Account>>,

    /// Receiver of outcome records
    sink: Arc<dyn ReportSink>,
}

impl Ledger {
    /// Create a ledger with `accounts` accounts, each holding `initial_balance`
    pub fn new(accounts: usize, initial_balance: Decimal, sink: Arc<dyn ReportSink>) -> Self {
        let accounts = (0..accounts)
            .map(|id| Account::new(id as AccountId, initial_balance))
            .collect();

        Ledger {
            accounts: Mutex::new(accounts),
            sink,
        }
    }

    /// Number of accounts
    pub fn len(&self) -> usize {
        self.accounts.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check that `account` exists
    ///
    /// # Errors
    ///
    /// Returns [`BankError::InvalidAccount`] if `account` is out of range.
    pub fn check_account(&self, account: AccountId) -> Result<(), BankError> {
        let accounts = self.accounts.lock().len();
        if (account as usize) < accounts {
            Ok(())
        } else {
            Err(BankError::invalid_account(account, accounts))
        }
    }

    /// Deposit funds into an account
    ///
    /// Adds `amount` to the balance and reports the new balance.
    ///
    /// # Returns
    ///
    /// * `Ok(balance)` - The balance right after the deposit
    /// * `Err(BankError)` - If the account is invalid or the add would overflow
    pub fn deposit(
        &self,
        request: RequestId,
        account: AccountId,
        amount: Decimal,
    ) -> Result<Decimal, BankError> {
        let mut accounts = self.accounts.lock();
        let len = accounts.len();
        let entry = accounts
            .get_mut(account as usize)
            .ok_or_else(|| BankError::invalid_account(account, len))?;

        let balance = entry
            .balance
            .checked_add(amount)
            .ok_or_else(|| BankError::arithmetic_overflow("deposit", account))?;
        entry.balance = balance;

        self.sink.emit(&Report::Deposit {
            request,
            account,
            amount,
            balance,
        });

        Ok(balance)
    }

    /// Transfer funds between two accounts
    ///
    /// The balance check and both updates happen in one critical section: no
    /// other thread can observe or change either account in between. If the
    /// source cannot cover `amount`, nothing is mutated and the outcome is
    /// [`TransferOutcome::InsufficientFunds`].
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Either account is out of range
    /// - `source == dest`
    /// - Crediting the destination would overflow
    pub fn transfer(
        &self,
        request: RequestId,
        source: AccountId,
        dest: AccountId,
        amount: Decimal,
    ) -> Result<TransferOutcome, BankError> {
        if source == dest {
            return Err(BankError::same_account(source));
        }

        let mut accounts = self.accounts.lock();
        let len = accounts.len();
        for account in [source, dest] {
            if account as usize >= len {
                return Err(BankError::invalid_account(account, len));
            }
        }

        let available = accounts[source as usize].balance;
        let outcome = if available >= amount {
            let source_balance = available - amount;
            let dest_balance = accounts[dest as usize]
                .balance
                .checked_add(amount)
                .ok_or_else(|| BankError::arithmetic_overflow("transfer", dest))?;

            accounts[source as usize].balance = source_balance;
            accounts[dest as usize].balance = dest_balance;

            TransferOutcome::Applied {
                source_balance,
                dest_balance,
            }
        } else {
            TransferOutcome::InsufficientFunds { available }
        };

        self.sink.emit(&Report::Transfer {
            request,
            source,
            dest,
            amount,
            outcome,
        });

        Ok(outcome)
    }

    /// Snapshot and report every balance in one critical section
    pub fn audit(&self, request: RequestId) -> Vec<Account> {
        let accounts = self.accounts.lock();
        let balances = accounts.clone();

        self.sink.emit(&Report::Audit {
            request,
            balances: balances.clone(),
        });

        balances
    }

    /// All accounts in id order, read under one lock hold
    pub fn snapshot(&self) -> Vec<Account> {
        self.accounts.lock().clone()
    }

    /// Sum of all balances, read under one lock hold
    pub fn total(&self) -> Decimal {
        self.accounts
            .lock()
            .iter()
            .map(|account| account.balance)
            .sum()
    }
}

impl fmt::Debug for Ledger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ledger")
            .field("accounts", &*self.accounts.lock())
            .finish_non_exhaustive()
    }
}
