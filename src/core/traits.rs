//! Core traits for the pluggable collaborators of the server
//!
//! The ledger does not format or print anything itself; it hands every
//! outcome record to a [`ReportSink`] chosen by whoever builds the server.

use crate::types::Report;

/// Receiver of outcome records
///
/// `emit` is called while the ledger lock is held, so implementations see
/// reports in the exact order the ledger applied them. Keep it short: every
/// worker waits on the ledger lock while a sink runs.
pub trait ReportSink: Send + Sync {
    /// Receive one outcome record
    fn emit(&self, report: &Report);
}

impl<F> ReportSink for F
where
    F: Fn(&Report) + Send + Sync,
{
    fn emit(&self, report: &Report) {
        self(report)
    }
}
