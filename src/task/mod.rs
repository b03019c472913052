pub mod date;

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use date::TaskDate;

/// Address of a single remote task: every mutation is sent to this triple.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaskPath {
    pub list_id: String,
    pub taskseries_id: String,
    pub task_id: String,
}

impl TaskPath {
    pub fn new(
        list_id: impl Into<String>,
        taskseries_id: impl Into<String>,
        task_id: impl Into<String>,
    ) -> Self {
        Self {
            list_id: list_id.into(),
            taskseries_id: taskseries_id.into(),
            task_id: task_id.into(),
        }
    }
}

impl fmt::Display for TaskPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.list_id, self.taskseries_id, self.task_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    #[serde(default)]
    pub title: String,
    pub body: String,
}

/// A task as last read from the remote service.
///
/// The field values are a cached view; the mirror compares against them but
/// never refreshes them after a successful update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExistingTask {
    path: TaskPath,
    pub name: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub start_date: Option<TaskDate>,
    #[serde(default)]
    pub due_date: Option<TaskDate>,
    #[serde(default)]
    pub complete: bool,
    #[serde(default)]
    pub notes: Vec<Note>,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub modified: Option<DateTime<Utc>>,
}

impl ExistingTask {
    /// A freshly created task: name only, every other field at its default.
    pub fn new(path: TaskPath, name: impl Into<String>) -> Self {
        Self {
            path,
            name: name.into(),
            tags: BTreeSet::new(),
            start_date: None,
            due_date: None,
            complete: false,
            notes: Vec::new(),
            created: None,
            modified: None,
        }
    }

    pub fn path(&self) -> &TaskPath {
        &self.path
    }

    /// Human-readable reference used in logs and errors.
    pub fn describe(&self) -> String {
        format!("'{}' ({})", self.name, self.path)
    }

    pub fn has_note(&self, body: &str) -> bool {
        self.notes.iter().any(|n| n.body == body)
    }
}

/// The state a caller wants one remote task to end up in.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DesiredTaskState {
    pub name: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub start_date: Option<TaskDate>,
    #[serde(default)]
    pub due_date: Option<TaskDate>,
    /// Empty means no note.
    #[serde(default)]
    pub note: String,
    /// `None` leaves the remote completion state alone.
    #[serde(default = "default_complete")]
    pub complete: Option<bool>,
}

fn default_complete() -> Option<bool> {
    Some(false)
}

impl DesiredTaskState {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            complete: default_complete(),
            ..Default::default()
        }
    }

    pub fn with_tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_start(mut self, start: impl Into<TaskDate>) -> Self {
        self.start_date = Some(start.into());
        self
    }

    pub fn with_due(mut self, due: impl Into<TaskDate>) -> Self {
        self.due_date = Some(due.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }

    pub fn with_complete(mut self, complete: Option<bool>) -> Self {
        self.complete = complete;
        self
    }

    /// Copy the current values of `task` so that mirroring the result back
    /// onto the same task is a no-op.
    pub fn from_task(task: &ExistingTask) -> Self {
        Self {
            name: task.name.clone(),
            tags: task.tags.clone(),
            start_date: task.start_date,
            due_date: task.due_date,
            note: task
                .notes
                .first()
                .map(|n| n.body.clone())
                .unwrap_or_default(),
            complete: Some(task.complete),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample() -> ExistingTask {
        let mut task = ExistingTask::new(TaskPath::new("1", "2", "3"), "Pay rent");
        task.tags.insert("home".into());
        task.start_date = Some(NaiveDate::from_ymd_opt(2021, 5, 1).unwrap().into());
        task.complete = true;
        task.notes.push(Note {
            title: String::new(),
            body: "landlord prefers transfer".into(),
        });
        task
    }

    #[test]
    fn test_from_task_copies_fields() {
        let task = sample();
        let desired = DesiredTaskState::from_task(&task);
        assert_eq!(desired.name, "Pay rent");
        assert!(desired.tags.contains("home"));
        assert_eq!(desired.start_date, task.start_date);
        assert_eq!(desired.due_date, None);
        assert_eq!(desired.note, "landlord prefers transfer");
        assert_eq!(desired.complete, Some(true));
    }

    #[test]
    fn test_desired_defaults_to_incomplete() {
        let desired = DesiredTaskState::new("x");
        assert_eq!(desired.complete, Some(false));
        let parsed: DesiredTaskState = serde_json::from_str(r#"{"name": "x"}"#).unwrap();
        assert_eq!(parsed, desired);
        let dont_care: DesiredTaskState =
            serde_json::from_str(r#"{"name": "x", "complete": null}"#).unwrap();
        assert_eq!(dont_care.complete, None);
    }

    #[test]
    fn test_describe_and_path_display() {
        let task = sample();
        assert_eq!(task.describe(), "'Pay rent' (1/2/3)");
        assert!(task.has_note("landlord prefers transfer"));
        assert!(!task.has_note("other"));
    }

    #[test]
    fn test_existing_task_json() {
        let json = r#"{
            "path": {"list_id": "1", "taskseries_id": "2", "task_id": "3"},
            "name": "Pay rent",
            "tags": ["home"],
            "due_date": "2021-06-01"
        }"#;
        let task: ExistingTask = serde_json::from_str(json).unwrap();
        assert_eq!(task.path(), &TaskPath::new("1", "2", "3"));
        assert_eq!(
            task.due_date,
            Some(TaskDate::Date(NaiveDate::from_ymd_opt(2021, 6, 1).unwrap()))
        );
        assert!(!task.complete);
    }
}
