pub mod diff;
pub mod property;
pub mod reconcile;

use serde::{Deserialize, Serialize};

pub use diff::{diff_unsorted, ListDiff};
pub use property::{mirror_properties, mirror_properties_concurrent, FieldPlan, FieldUpdate, PairOutcome};
pub use reconcile::{mirror, mirror_concurrent};

/// Error code the remote service uses when a write would leave a task
/// starting after it is due. Override it in [`MirrorOptions`] if the
/// service reports a different code.
pub const DEFAULT_DATE_ORDER_ERROR_CODE: u32 = 4100;

const DEFAULT_CONCURRENCY: usize = 8;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Each remote call completes before the next is sent.
    #[default]
    Sequential,
    /// Independent tasks, and independent fields of one task, are sent
    /// concurrently.
    Concurrent,
}

/// Options controlling a mirror run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorOptions {
    pub mode: ExecutionMode,
    /// Upper bound on tasks in flight in concurrent mode.
    pub concurrency: usize,
    pub date_order_error_code: u32,
}

impl Default for MirrorOptions {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::default(),
            concurrency: DEFAULT_CONCURRENCY,
            date_order_error_code: DEFAULT_DATE_ORDER_ERROR_CODE,
        }
    }
}

impl MirrorOptions {
    pub fn concurrent() -> Self {
        Self {
            mode: ExecutionMode::Concurrent,
            ..Self::default()
        }
    }

    pub(crate) fn effective_concurrency(&self) -> usize {
        self.concurrency.max(1)
    }
}

/// Report returned after a mirror run completes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MirrorReport {
    pub deleted: usize,
    pub created: usize,
    /// Matched tasks that needed at least one write.
    pub updated: usize,
    /// Matched tasks already in the desired state.
    pub unchanged: usize,
    /// Remote calls issued, including rejected date writes that were retried.
    pub calls: usize,
    /// Matched tasks whose start/due pair was resent in reverse order.
    pub date_retries: usize,
}

impl MirrorReport {
    pub(crate) fn record_pair(&mut self, outcome: &PairOutcome) {
        if outcome.calls == 0 {
            self.unchanged += 1;
        } else {
            self.updated += 1;
        }
        self.calls += outcome.calls;
        if outcome.date_retried {
            self.date_retries += 1;
        }
    }
}

/// Callbacks for reporting mirror progress.
pub trait MirrorProgress: Send + Sync {
    fn on_plan(&self, _to_delete: usize, _matched: usize, _to_add: usize) {}
    fn on_deleted(&self, _name: &str) {}
    fn on_created(&self, _name: &str) {}
    fn on_mirrored(&self, _name: &str, _outcome: &PairOutcome) {}
}

/// A no-op progress reporter.
pub struct NoopProgress;

impl MirrorProgress for NoopProgress {}
