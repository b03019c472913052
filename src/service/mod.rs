pub mod memory;

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::RemoteError;
use crate::task::{ExistingTask, TaskDate, TaskPath};

pub use memory::MemoryService;

/// The remote calls the mirror needs from a task-management backend.
///
/// Each method is one remote round trip. Implementations report service-side
/// rejections as [`RemoteError`]; a date-ordering rejection must carry the
/// code configured in [`crate::MirrorOptions::date_order_error_code`].
#[async_trait]
pub trait TaskService: Send + Sync {
    /// Create a task with only its name set.
    async fn create_task(&self, name: &str) -> Result<TaskPath, RemoteError>;

    async fn delete_task(&self, path: &TaskPath) -> Result<(), RemoteError>;

    async fn set_tags(&self, path: &TaskPath, tags: &BTreeSet<String>) -> Result<(), RemoteError>;

    /// `None` clears the start date.
    async fn set_start_date(
        &self,
        path: &TaskPath,
        start: Option<&TaskDate>,
    ) -> Result<(), RemoteError>;

    /// `None` clears the due date.
    async fn set_due_date(&self, path: &TaskPath, due: Option<&TaskDate>)
        -> Result<(), RemoteError>;

    async fn set_complete(&self, path: &TaskPath, complete: bool) -> Result<(), RemoteError>;

    async fn add_note(&self, path: &TaskPath, title: &str, text: &str) -> Result<(), RemoteError>;

    /// Tasks matching a search expression, optionally only those modified
    /// after `since`.
    async fn list_tasks(
        &self,
        filter: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<ExistingTask>, RemoteError>;
}
