//! Reporting sinks
//!
//! - [`TracingSink`] logs every report through `tracing`
//! - [`MemorySink`] keeps every report in memory, in emission order

use crate::core::traits::ReportSink;
use crate::types::{Report, TransferOutcome};
use parking_lot::Mutex;
use tracing::info;

/// Sink that logs each report as one `tracing` event
///
/// Events are emitted under the `bank_ledger_server::report` target at
/// `INFO` level with the request id and kind as structured fields.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ReportSink for TracingSink {
    fn emit(&self, report: &Report) {
        let applied = match report {
            Report::Transfer { outcome, .. } => outcome.is_applied(),
            _ => true,
        };
        info!(
            target: "bank_ledger_server::report",
            request = report.request(),
            kind = %report.kind(),
            applied,
            "{report}"
        );
    }
}

/// Sink that collects reports in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    reports: Mutex<Vec<Report>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every report received so far, in emission order
    pub fn reports(&self) -> Vec<Report> {
        self.reports.lock().clone()
    }

    /// Number of reports received so far
    pub fn len(&self) -> usize {
        self.reports.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.lock().is_empty()
    }

    /// Number of transfers that were rejected for insufficient funds
    pub fn insufficient_funds(&self) -> usize {
        self.reports
            .lock()
            .iter()
            .filter(|report| {
                matches!(
                    report,
                    Report::Transfer {
                        outcome: TransferOutcome::InsufficientFunds { .. },
                        ..
                    }
                )
            })
            .count()
    }
}

impl ReportSink for MemorySink {
    fn emit(&self, report: &Report) {
        self.reports.lock().push(report.clone());
    }
}
