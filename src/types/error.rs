//! Error types for the bank ledger server
//!
//! This module defines all error types that can occur while admitting and
//! processing requests. Every condition is local and recoverable; none of
//! them is fatal to the process.
//!
//! # Error Categories
//!
//! - **Request Errors**: invalid account references, same-account transfers,
//!   negative amounts
//! - **Ledger Errors**: arithmetic overflow in balance calculations
//! - **Admission Errors**: submissions rejected because shutdown has begun
//! - **Setup Errors**: invalid configuration, thread spawn and output failures
//!
//! A transfer that cannot be covered by its source is *not* an error; it is
//! reported as [`crate::types::TransferOutcome::InsufficientFunds`].

use super::account::AccountId;
use super::request::RequestKind;
use rust_decimal::Decimal;
use thiserror::Error;

/// Main error type for the bank ledger server
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BankError {
    /// Request references an account outside `0..accounts`
    ///
    /// Surfaced to the caller of the ledger operation, never retried.
    #[error("Invalid account {account}: ledger has {accounts} accounts")]
    InvalidAccount {
        /// The account that was referenced
        account: AccountId,
        /// Number of accounts in the ledger
        accounts: usize,
    },

    /// Request of a kind that needs an account was built without one
    #[error("{kind} request requires a {role} account")]
    MissingAccount {
        /// Kind of the incomplete request
        kind: RequestKind,
        /// Which account is missing ("source" or "destination")
        role: &'static str,
    },

    /// Transfer whose source and destination are the same account
    #[error("Transfer source and destination are both account {account}")]
    SameAccount {
        /// The repeated account
        account: AccountId,
    },

    /// Amount below zero
    #[error("Invalid amount {amount}: amounts must not be negative")]
    NegativeAmount {
        /// The rejected amount
        amount: Decimal,
    },

    /// Arithmetic overflow would occur
    ///
    /// The operation is rejected and the ledger is left unchanged.
    #[error("Arithmetic overflow in {operation} for account {account}")]
    ArithmeticOverflow {
        /// Operation that would overflow
        operation: String,
        /// Account whose balance would overflow
        account: AccountId,
    },

    /// The server is shutting down and no longer admits requests
    ///
    /// Producers must stop submitting once they receive this.
    #[error("Server is shutting down; request rejected")]
    ShuttingDown,

    /// Configuration cannot be used to build a server
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// What is wrong with the configuration
        message: String,
    },

    /// I/O error while spawning threads or writing output
    #[error("I/O error: {message}")]
    Io {
        /// Description of the I/O error
        message: String,
    },
}

impl From<std::io::Error> for BankError {
    fn from(error: std::io::Error) -> Self {
        BankError::Io {
            message: error.to_string(),
        }
    }
}

impl From<csv::Error> for BankError {
    fn from(error: csv::Error) -> Self {
        BankError::Io {
            message: error.to_string(),
        }
    }
}

// Helper functions for creating common errors

impl BankError {
    /// Create an InvalidAccount error
    pub fn invalid_account(account: AccountId, accounts: usize) -> Self {
        BankError::InvalidAccount { account, accounts }
    }

    /// Create a MissingAccount error
    pub fn missing_account(kind: RequestKind, role: &'static str) -> Self {
        BankError::MissingAccount { kind, role }
    }

    /// Create a SameAccount error
    pub fn same_account(account: AccountId) -> Self {
        BankError::SameAccount { account }
    }

    /// Create a NegativeAmount error
    pub fn negative_amount(amount: Decimal) -> Self {
        BankError::NegativeAmount { amount }
    }

    /// Create an ArithmeticOverflow error
    pub fn arithmetic_overflow(operation: &str, account: AccountId) -> Self {
        BankError::ArithmeticOverflow {
            operation: operation.to_string(),
            account,
        }
    }

    /// Create an InvalidConfig error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        BankError::InvalidConfig {
            message: message.into(),
        }
    }

    /// Whether this error means the server stopped admitting work
    pub fn is_shutting_down(&self) -> bool {
        matches!(self, BankError::ShuttingDown)
    }
}
