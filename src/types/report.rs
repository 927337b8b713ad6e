//! Outcome records emitted by the ledger
//!
//! One [`Report`] is produced per processed request and handed to the
//! configured reporting sink while the ledger lock is still held, so the
//! sequence of reports a sink observes matches the order of mutations.

use super::account::{Account, AccountId};
use super::request::{RequestId, RequestKind};
use rust_decimal::Decimal;
use std::fmt;

/// Result of a transfer that referenced valid accounts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    /// Funds were moved; balances are the values right after the move
    Applied {
        source_balance: Decimal,
        dest_balance: Decimal,
    },

    /// The source could not cover the amount; nothing was mutated
    InsufficientFunds { available: Decimal },
}

impl TransferOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, TransferOutcome::Applied { .. })
    }
}

/// Outcome record for one processed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
    Deposit {
        request: RequestId,
        account: AccountId,
        amount: Decimal,
        balance: Decimal,
    },
    Transfer {
        request: RequestId,
        source: AccountId,
        dest: AccountId,
        amount: Decimal,
        outcome: TransferOutcome,
    },
    Audit {
        request: RequestId,
        balances: Vec<Account>,
    },
}

impl Report {
    /// Id of the request this report describes
    pub fn request(&self) -> RequestId {
        match self {
            Report::Deposit { request, .. }
            | Report::Transfer { request, .. }
            | Report::Audit { request, .. } => *request,
        }
    }

    pub fn kind(&self) -> RequestKind {
        match self {
            Report::Deposit { .. } => RequestKind::Deposit,
            Report::Transfer { .. } => RequestKind::Transfer,
            Report::Audit { .. } => RequestKind::Audit,
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Report::Deposit {
                request,
                account,
                amount,
                balance,
            } => write!(
                f,
                "Request {request}: deposit of {amount:.2} to account {account}, new balance {balance:.2}"
            ),
            Report::Transfer {
                request,
                source,
                dest,
                amount,
                outcome: TransferOutcome::Applied { .. },
            } => write!(
                f,
                "Request {request}: transfer of {amount:.2} from account {source} to account {dest}"
            ),
            Report::Transfer {
                request,
                source,
                amount,
                outcome: TransferOutcome::InsufficientFunds { available },
                ..
            } => write!(
                f,
                "Request {request}: transfer of {amount:.2} failed, insufficient funds in account {source} (available {available:.2})"
            ),
            Report::Audit { request, balances } => {
                write!(f, "Request {request}: audit")?;
                for account in balances {
                    write!(f, "\n  account {}: balance {:.2}", account.id, account.balance)?;
                }
                Ok(())
            }
        }
    }
}
