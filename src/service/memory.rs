//! In-process task backend.
//!
//! Holds tasks in memory, validates `start <= due` after every single call the
//! way the remote service does, and records each call so callers can inspect
//! exactly what a mirror run would send. Filter expressions are recorded but
//! not evaluated: `list_tasks` returns every task.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

use crate::error::{Operation, RemoteError};
use crate::service::TaskService;
use crate::task::date::is_misordered;
use crate::task::{ExistingTask, Note, TaskDate, TaskPath};

/// Code returned when a path does not address a live task.
pub const TASK_NOT_FOUND: u32 = 340;

const LIST_ID: &str = "inbox";

/// One call as received by [`MemoryService`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum RecordedCall {
    ListTasks { filter: String },
    CreateTask { name: String },
    DeleteTask { path: TaskPath },
    SetTags { path: TaskPath, tags: BTreeSet<String> },
    SetStartDate { path: TaskPath, start: Option<TaskDate> },
    SetDueDate { path: TaskPath, due: Option<TaskDate> },
    SetComplete { path: TaskPath, complete: bool },
    AddNote { path: TaskPath, title: String, text: String },
}

impl RecordedCall {
    pub fn operation(&self) -> Operation {
        match self {
            RecordedCall::ListTasks { .. } => Operation::ListTasks,
            RecordedCall::CreateTask { .. } => Operation::CreateTask,
            RecordedCall::DeleteTask { .. } => Operation::DeleteTask,
            RecordedCall::SetTags { .. } => Operation::SetTags,
            RecordedCall::SetStartDate { .. } => Operation::SetStartDate,
            RecordedCall::SetDueDate { .. } => Operation::SetDueDate,
            RecordedCall::SetComplete { .. } => Operation::SetComplete,
            RecordedCall::AddNote { .. } => Operation::AddNote,
        }
    }
}

#[derive(Default)]
struct State {
    tasks: BTreeMap<TaskPath, ExistingTask>,
    calls: Vec<RecordedCall>,
    failures: Vec<(Operation, String, RemoteError)>,
    next_id: u64,
}

impl State {
    fn take_failure(&mut self, operation: Operation, name: &str) -> Option<RemoteError> {
        let idx = self
            .failures
            .iter()
            .position(|(op, n, _)| *op == operation && n == name)?;
        Some(self.failures.remove(idx).2)
    }

    fn task_mut(&mut self, path: &TaskPath) -> Result<&mut ExistingTask, RemoteError> {
        self.tasks
            .get_mut(path)
            .ok_or_else(|| RemoteError::new(TASK_NOT_FOUND, format!("task {path} not found")))
    }

    fn name_of(&self, path: &TaskPath) -> String {
        self.tasks
            .get(path)
            .map(|t| t.name.clone())
            .unwrap_or_default()
    }
}

pub struct MemoryService {
    state: Mutex<State>,
    date_order_error_code: u32,
}

impl MemoryService {
    pub fn new(date_order_error_code: u32) -> Self {
        Self {
            state: Mutex::new(State::default()),
            date_order_error_code,
        }
    }

    /// Start from a previously fetched snapshot.
    pub fn with_tasks(date_order_error_code: u32, tasks: impl IntoIterator<Item = ExistingTask>) -> Self {
        let service = Self::new(date_order_error_code);
        {
            let mut state = service.state.lock();
            for task in tasks {
                state.tasks.insert(task.path().clone(), task);
            }
        }
        service
    }

    /// Make the next `operation` on the task named `name` fail with `error`.
    pub fn fail_next(&self, operation: Operation, name: &str, error: RemoteError) {
        self.state
            .lock()
            .failures
            .push((operation, name.to_string(), error));
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    pub fn tasks(&self) -> Vec<ExistingTask> {
        self.state.lock().tasks.values().cloned().collect()
    }

    pub fn task_named(&self, name: &str) -> Option<ExistingTask> {
        self.state
            .lock()
            .tasks
            .values()
            .find(|t| t.name == name)
            .cloned()
    }

    /// Record `call`, consume any injected failure, then apply `f` to the
    /// addressed task.
    fn update<F>(&self, path: &TaskPath, call: RecordedCall, f: F) -> Result<(), RemoteError>
    where
        F: FnOnce(&mut ExistingTask, u32) -> Result<(), RemoteError>,
    {
        let mut state = self.state.lock();
        let operation = call.operation();
        state.calls.push(call);
        let name = state.name_of(path);
        if let Some(err) = state.take_failure(operation, &name) {
            return Err(err);
        }
        let code = self.date_order_error_code;
        let task = state.task_mut(path)?;
        f(task, code)?;
        task.modified = Some(Utc::now());
        Ok(())
    }
}

fn check_order(start: Option<&TaskDate>, due: Option<&TaskDate>, code: u32) -> Result<(), RemoteError> {
    if is_misordered(start, due) {
        return Err(RemoteError::new(
            code,
            "start date must not be after due date",
        ));
    }
    Ok(())
}

#[async_trait]
impl TaskService for MemoryService {
    async fn create_task(&self, name: &str) -> Result<TaskPath, RemoteError> {
        let mut state = self.state.lock();
        state.calls.push(RecordedCall::CreateTask {
            name: name.to_string(),
        });
        if let Some(err) = state.take_failure(Operation::CreateTask, name) {
            return Err(err);
        }
        state.next_id += 1;
        let id = state.next_id;
        let path = TaskPath::new(LIST_ID, format!("s{id}"), format!("t{id}"));
        let mut task = ExistingTask::new(path.clone(), name);
        let now = Utc::now();
        task.created = Some(now);
        task.modified = Some(now);
        state.tasks.insert(path.clone(), task);
        Ok(path)
    }

    async fn delete_task(&self, path: &TaskPath) -> Result<(), RemoteError> {
        let mut state = self.state.lock();
        state.calls.push(RecordedCall::DeleteTask { path: path.clone() });
        let name = state.name_of(path);
        if let Some(err) = state.take_failure(Operation::DeleteTask, &name) {
            return Err(err);
        }
        state
            .tasks
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| RemoteError::new(TASK_NOT_FOUND, format!("task {path} not found")))
    }

    async fn set_tags(&self, path: &TaskPath, tags: &BTreeSet<String>) -> Result<(), RemoteError> {
        let call = RecordedCall::SetTags {
            path: path.clone(),
            tags: tags.clone(),
        };
        self.update(path, call, |task, _| {
            task.tags = tags.clone();
            Ok(())
        })
    }

    async fn set_start_date(
        &self,
        path: &TaskPath,
        start: Option<&TaskDate>,
    ) -> Result<(), RemoteError> {
        let call = RecordedCall::SetStartDate {
            path: path.clone(),
            start: start.copied(),
        };
        self.update(path, call, |task, code| {
            check_order(start, task.due_date.as_ref(), code)?;
            task.start_date = start.copied();
            Ok(())
        })
    }

    async fn set_due_date(
        &self,
        path: &TaskPath,
        due: Option<&TaskDate>,
    ) -> Result<(), RemoteError> {
        let call = RecordedCall::SetDueDate {
            path: path.clone(),
            due: due.copied(),
        };
        self.update(path, call, |task, code| {
            check_order(task.start_date.as_ref(), due, code)?;
            task.due_date = due.copied();
            Ok(())
        })
    }

    async fn set_complete(&self, path: &TaskPath, complete: bool) -> Result<(), RemoteError> {
        let call = RecordedCall::SetComplete {
            path: path.clone(),
            complete,
        };
        self.update(path, call, |task, _| {
            task.complete = complete;
            Ok(())
        })
    }

    async fn add_note(&self, path: &TaskPath, title: &str, text: &str) -> Result<(), RemoteError> {
        let call = RecordedCall::AddNote {
            path: path.clone(),
            title: title.to_string(),
            text: text.to_string(),
        };
        self.update(path, call, |task, _| {
            task.notes.push(Note {
                title: title.to_string(),
                body: text.to_string(),
            });
            Ok(())
        })
    }

    async fn list_tasks(
        &self,
        filter: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<ExistingTask>, RemoteError> {
        let mut state = self.state.lock();
        state.calls.push(RecordedCall::ListTasks {
            filter: filter.to_string(),
        });
        Ok(state
            .tasks
            .values()
            .filter(|t| match (since, t.modified) {
                (Some(since), Some(modified)) => modified > since,
                _ => true,
            })
            .cloned()
            .collect())
    }
}
