//! Periodic audit injection
//!
//! The injector counts accepted client requests and tells the queue when an
//! audit has to be inserted behind the one just admitted. It holds no lock of
//! its own: the queue keeps it inside its locked state, so counting and
//! inserting happen in the same critical section.

use crate::types::RequestKind;
use std::num::NonZeroU64;

/// Default number of accepted client requests between two audits
pub const DEFAULT_AUDIT_EVERY: u64 = 10;

/// Counter-triggered audit scheduler
#[derive(Debug, Clone)]
pub struct AuditInjector {
    /// `None` disables injection
    threshold: Option<NonZeroU64>,

    /// Accepted non-audit requests since start
    accepted: u64,
}

impl AuditInjector {
    /// Create an injector that fires after every `threshold` accepted
    /// requests; `0` disables injection
    pub fn new(threshold: u64) -> Self {
        AuditInjector {
            threshold: NonZeroU64::new(threshold),
            accepted: 0,
        }
    }

    /// An injector that never fires
    pub fn disabled() -> Self {
        Self::new(0)
    }

    pub fn is_enabled(&self) -> bool {
        self.threshold.is_some()
    }

    pub fn threshold(&self) -> Option<u64> {
        self.threshold.map(NonZeroU64::get)
    }

    /// Accepted requests counted so far
    pub fn accepted(&self) -> u64 {
        self.accepted
    }

    /// Whether admitting a request of `kind` would trigger an audit
    ///
    /// Audits never count, whether injected or submitted by a client.
    pub fn would_trigger(&self, kind: RequestKind) -> bool {
        match (kind, self.threshold) {
            (RequestKind::Audit, _) | (_, None) => false,
            (_, Some(threshold)) => (self.accepted + 1) % threshold.get() == 0,
        }
    }

    /// Count an accepted request of `kind`
    ///
    /// Returns `true` if an audit must be inserted right behind it.
    pub fn record(&mut self, kind: RequestKind) -> bool {
        if kind == RequestKind::Audit {
            return false;
        }
        let trigger = self.would_trigger(kind);
        self.accepted += 1;
        trigger
    }
}

impl Default for AuditInjector {
    fn default() -> Self {
        Self::new(DEFAULT_AUDIT_EVERY)
    }
}
