//! Diagnostic sinks for sections that fell back to empty.

use parking_lot::Mutex;

use kinder_core::FailureReport;

/// Receives one report per exhausted section.
pub trait FailureSink: Send + Sync {
    fn record(&self, report: &FailureReport);
}

/// Emits each report as a `warn` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl FailureSink for TracingSink {
    fn record(&self, report: &FailureReport) {
        tracing::warn!(
            section = %report.section,
            error = %report.error,
            attempts = report.attempts,
            at = %report.at.to_rfc3339(),
            "Section exhausted retries, serving empty"
        );
    }
}

/// Keeps reports in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    reports: Mutex<Vec<FailureReport>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of recorded reports, in arrival order.
    pub fn reports(&self) -> Vec<FailureReport> {
        self.reports.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.reports.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.lock().is_empty()
    }

    pub fn clear(&self) {
        self.reports.lock().clear();
    }
}

impl FailureSink for MemorySink {
    fn record(&self, report: &FailureReport) {
        self.reports.lock().push(report.clone());
    }
}
