use crate::decision::Decision;
use std::sync::Mutex;
use tracing::info;

/// Trait for reporting resolve progress.
///
/// CLI implements with indicatif spinners. All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    fn on_pass_start(&self, _folders: usize, _records: usize) {}
    fn on_folder_start(&self, _folder: &str, _records: usize) {}
    fn on_folder_complete(&self, _folder: &str, _decisions: usize) {}
    fn on_pass_complete(&self, _decisions: usize, _duration_secs: f64) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}

/// Receives every decision of a pass, in evaluation order.
pub trait DecisionSink: Send + Sync {
    fn emit(&self, decision: &Decision);
}

/// Logs each decision line at info level.
pub struct TracingSink;

impl DecisionSink for TracingSink {
    fn emit(&self, decision: &Decision) {
        info!("{}", decision);
    }
}

/// Keeps decisions in memory.
#[derive(Default)]
pub struct CollectingSink {
    decisions: Mutex<Vec<Decision>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decisions(&self) -> Vec<Decision> {
        match self.decisions.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl DecisionSink for CollectingSink {
    fn emit(&self, decision: &Decision) {
        match self.decisions.lock() {
            Ok(mut guard) => guard.push(decision.clone()),
            Err(poisoned) => poisoned.into_inner().push(decision.clone()),
        }
    }
}
