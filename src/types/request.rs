//! Request-related types for the bank ledger server
//!
//! This module defines the operations a client can ask for, the requests the
//! queue carries to the workers, and the receipt a producer gets back when
//! its operation is admitted.

use super::account::AccountId;
use super::error::BankError;
use rust_decimal::Decimal;
use std::fmt;

/// Request identifier
///
/// Allocated from one shared monotonic sequence, so ids are globally unique
/// and strictly increasing in admission order.
pub type RequestId = u64;

/// Kinds of requests processed by the workers
///
/// Derived from an [`Operation`]; useful for counting and logging without
/// matching on the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// Credit funds to an account
    Deposit,

    /// Move funds between two distinct accounts
    Transfer,

    /// Read and report every account balance
    Audit,
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestKind::Deposit => f.write_str("deposit"),
            RequestKind::Transfer => f.write_str("transfer"),
            RequestKind::Audit => f.write_str("audit"),
        }
    }
}

/// Operation carried by a request
///
/// Each variant holds exactly the fields its kind needs. Use the checked
/// constructors [`Operation::deposit`] and [`Operation::transfer`] to build
/// operations from untrusted input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Add `amount` to `account`
    Deposit { account: AccountId, amount: Decimal },

    /// Move `amount` from `source` to `dest` if `source` can cover it
    Transfer {
        source: AccountId,
        dest: AccountId,
        amount: Decimal,
    },

    /// Snapshot and report all balances
    Audit,
}

impl Operation {
    /// Create a deposit operation
    ///
    /// # Errors
    ///
    /// Returns [`BankError::NegativeAmount`] if `amount` is below zero.
    pub fn deposit(account: AccountId, amount: Decimal) -> Result<Self, BankError> {
        if amount < Decimal::ZERO {
            return Err(BankError::negative_amount(amount));
        }
        Ok(Operation::Deposit { account, amount })
    }

    /// Create a transfer operation
    ///
    /// # Errors
    ///
    /// Returns [`BankError::SameAccount`] if `source == dest` and
    /// [`BankError::NegativeAmount`] if `amount` is below zero.
    pub fn transfer(source: AccountId, dest: AccountId, amount: Decimal) -> Result<Self, BankError> {
        if source == dest {
            return Err(BankError::same_account(source));
        }
        if amount < Decimal::ZERO {
            return Err(BankError::negative_amount(amount));
        }
        Ok(Operation::Transfer {
            source,
            dest,
            amount,
        })
    }

    /// Build an operation from a kind and optional account fields
    ///
    /// Deposits need `source`, transfers need both `source` and `dest`,
    /// audits need neither. Fields a kind does not use are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`BankError::MissingAccount`] for a missing field, otherwise
    /// the errors of the checked constructors.
    pub fn from_parts(
        kind: RequestKind,
        source: Option<AccountId>,
        dest: Option<AccountId>,
        amount: Decimal,
    ) -> Result<Self, BankError> {
        match kind {
            RequestKind::Deposit => {
                let account = source.ok_or_else(|| BankError::missing_account(kind, "source"))?;
                Operation::deposit(account, amount)
            }
            RequestKind::Transfer => {
                let source = source.ok_or_else(|| BankError::missing_account(kind, "source"))?;
                let dest = dest.ok_or_else(|| BankError::missing_account(kind, "destination"))?;
                Operation::transfer(source, dest, amount)
            }
            RequestKind::Audit => Ok(Operation::Audit),
        }
    }

    /// The kind of this operation
    pub fn kind(&self) -> RequestKind {
        match self {
            Operation::Deposit { .. } => RequestKind::Deposit,
            Operation::Transfer { .. } => RequestKind::Transfer,
            Operation::Audit => RequestKind::Audit,
        }
    }

    /// Account ids referenced by this operation
    pub fn accounts(&self) -> impl Iterator<Item = AccountId> {
        let (first, second) = match *self {
            Operation::Deposit { account, .. } => (Some(account), None),
            Operation::Transfer { source, dest, .. } => (Some(source), Some(dest)),
            Operation::Audit => (None, None),
        };
        first.into_iter().chain(second)
    }
}

/// Who created a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Submitted by a producer through the server
    Client,

    /// Synthesized by the audit injector
    Injected,
}

/// A queued unit of work
///
/// Immutable once admitted and consumed by exactly one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request {
    /// Globally unique, monotonically allocated id
    pub id: RequestId,

    /// What the worker should do
    pub operation: Operation,

    /// Who created the request
    pub origin: Origin,
}

impl Request {
    pub fn kind(&self) -> RequestKind {
        self.operation.kind()
    }
}

/// Receipt for an admitted operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    /// Id assigned to the submitted request
    pub id: RequestId,

    /// Id of the audit injected directly behind it, if this admission
    /// crossed the audit threshold
    pub audit: Option<RequestId>,
}
