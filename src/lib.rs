pub mod config;
pub mod error;
pub mod filter;
pub mod mirror;
pub mod service;
pub mod task;

pub use config::Config;
pub use error::{Error, Operation, RemoteError, Result};
pub use filter::{Condition, FilterBuilder};
pub use mirror::{
    ExecutionMode, MirrorOptions, MirrorProgress, MirrorReport, NoopProgress, PairOutcome,
};
pub use service::{MemoryService, TaskService};
pub use task::{DesiredTaskState, ExistingTask, Note, TaskDate, TaskPath};

use chrono::{DateTime, Utc};

/// Main entry point: a task service plus the options mirror runs use.
pub struct TaskMirror<S> {
    service: S,
    options: MirrorOptions,
}

impl<S: TaskService> TaskMirror<S> {
    pub fn new(service: S, options: MirrorOptions) -> Self {
        Self { service, options }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn options(&self) -> &MirrorOptions {
        &self.options
    }

    /// Read the tasks matching `filter`, to be used as the `existing` side of
    /// a later [`TaskMirror::mirror`].
    pub async fn fetch(
        &self,
        filter: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<ExistingTask>> {
        log::info!("Fetching tasks: {filter:?}, since {since:?}");
        self.service
            .list_tasks(filter, since)
            .await
            .map_err(|e| Error::remote(format!("filter {filter:?}"), Operation::ListTasks, e))
    }

    /// Make the remote tasks in `existing` match `desired`, in the mode set
    /// by the options.
    ///
    /// Assumes nothing changed remotely since `existing` was fetched.
    pub async fn mirror(
        &self,
        existing: Vec<ExistingTask>,
        desired: &[DesiredTaskState],
        progress: &dyn MirrorProgress,
    ) -> Result<MirrorReport> {
        match self.options.mode {
            ExecutionMode::Sequential => {
                mirror::mirror(&self.service, existing, desired, &self.options, progress).await
            }
            ExecutionMode::Concurrent => {
                mirror::mirror_concurrent(&self.service, existing, desired, &self.options, progress)
                    .await
            }
        }
    }

    /// Fetch the tasks matching `filter` and mirror `desired` onto them.
    pub async fn sync(
        &self,
        filter: &str,
        desired: &[DesiredTaskState],
        progress: &dyn MirrorProgress,
    ) -> Result<MirrorReport> {
        let existing = self.fetch(filter, None).await?;
        self.mirror(existing, desired, progress).await
    }
}
