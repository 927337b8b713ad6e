//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `account`: Account state and identifiers
//! - `request`: Operations, queued requests and admission receipts
//! - `report`: Outcome records emitted by the ledger
//! - `error`: Error types for the server

pub mod account;
pub mod error;
pub mod report;
pub mod request;

pub use account::{Account, AccountId};
pub use error::BankError;
pub use report::{Report, TransferOutcome};
pub use request::{Admission, Operation, Origin, Request, RequestId, RequestKind};
