use std::fmt;
use thiserror::Error;

/// A rejection returned by the remote task service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("remote error {code}: {message}")]
pub struct RemoteError {
    pub code: u32,
    pub message: String,
}

impl RemoteError {
    pub fn new(code: u32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// The remote call that was being attempted when an error surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListTasks,
    CreateTask,
    DeleteTask,
    SetTags,
    SetStartDate,
    SetDueDate,
    SetComplete,
    AddNote,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operation::ListTasks => "list tasks",
            Operation::CreateTask => "create task",
            Operation::DeleteTask => "delete task",
            Operation::SetTags => "set tags",
            Operation::SetStartDate => "set start date",
            Operation::SetDueDate => "set due date",
            Operation::SetComplete => "set complete",
            Operation::AddNote => "add note",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("{operation} failed for {task}: {source}")]
    Remote {
        task: String,
        operation: Operation,
        #[source]
        source: RemoteError,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn remote(task: impl Into<String>, operation: Operation, source: RemoteError) -> Self {
        Error::Remote {
            task: task.into(),
            operation,
            source,
        }
    }

    /// The underlying service rejection, if this error came from the remote side.
    pub fn remote_error(&self) -> Option<&RemoteError> {
        match self {
            Error::Remote { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_error_display_names_task_and_operation() {
        let err = Error::remote(
            "'Pay rent' (1/2/3)",
            Operation::SetDueDate,
            RemoteError::new(4100, "start after due"),
        );
        assert_eq!(
            err.to_string(),
            "set due date failed for 'Pay rent' (1/2/3): remote error 4100: start after due"
        );
        assert_eq!(err.remote_error().map(|e| e.code), Some(4100));
    }

    #[test]
    fn test_non_remote_error_has_no_remote_source() {
        let err = Error::Config("missing home".into());
        assert!(err.remote_error().is_none());
    }
}
