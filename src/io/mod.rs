//! I/O module
//!
//! Handles output of the final ledger state.
//!
//! # Components
//!
//! - `csv_format` - CSV serialization of account balances

pub mod csv_format;

pub use csv_format::{write_balances_csv, BalanceRow};
