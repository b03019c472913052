use std::collections::BTreeSet;

use futures::future::try_join_all;

use crate::error::{Error, Operation, RemoteError, Result};
use crate::service::TaskService;
use crate::task::{DesiredTaskState, ExistingTask, TaskDate};

/// A single field write, carrying the value to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldUpdate {
    Tags(BTreeSet<String>),
    StartDate(Option<TaskDate>),
    DueDate(Option<TaskDate>),
    Complete(bool),
    /// Appended as an untitled note.
    Note(String),
}

impl FieldUpdate {
    pub fn operation(&self) -> Operation {
        match self {
            FieldUpdate::Tags(_) => Operation::SetTags,
            FieldUpdate::StartDate(_) => Operation::SetStartDate,
            FieldUpdate::DueDate(_) => Operation::SetDueDate,
            FieldUpdate::Complete(_) => Operation::SetComplete,
            FieldUpdate::Note(_) => Operation::AddNote,
        }
    }

    fn tags(task: &ExistingTask, desired: &DesiredTaskState) -> Option<Self> {
        (task.tags != desired.tags).then(|| FieldUpdate::Tags(desired.tags.clone()))
    }

    fn start(task: &ExistingTask, desired: &DesiredTaskState) -> Option<Self> {
        (task.start_date != desired.start_date).then_some(FieldUpdate::StartDate(desired.start_date))
    }

    fn due(task: &ExistingTask, desired: &DesiredTaskState) -> Option<Self> {
        (task.due_date != desired.due_date).then_some(FieldUpdate::DueDate(desired.due_date))
    }

    fn complete(task: &ExistingTask, desired: &DesiredTaskState) -> Option<Self> {
        match desired.complete {
            Some(complete) if complete != task.complete => Some(FieldUpdate::Complete(complete)),
            _ => None,
        }
    }

    fn note(task: &ExistingTask, desired: &DesiredTaskState) -> Option<Self> {
        (!desired.note.is_empty() && !task.has_note(&desired.note))
            .then(|| FieldUpdate::Note(desired.note.clone()))
    }

    /// Writes that populate a freshly created task, in the order they are sent.
    pub fn for_new_task(desired: &DesiredTaskState) -> Vec<Self> {
        let mut updates = Vec::new();
        if !desired.tags.is_empty() {
            updates.push(FieldUpdate::Tags(desired.tags.clone()));
        }
        if desired.start_date.is_some() {
            updates.push(FieldUpdate::StartDate(desired.start_date));
        }
        if desired.due_date.is_some() {
            updates.push(FieldUpdate::DueDate(desired.due_date));
        }
        if desired.complete == Some(true) {
            updates.push(FieldUpdate::Complete(true));
        }
        if !desired.note.is_empty() {
            updates.push(FieldUpdate::Note(desired.note.clone()));
        }
        updates
    }

    async fn send<S>(&self, service: &S, task: &ExistingTask) -> std::result::Result<(), RemoteError>
    where
        S: TaskService + ?Sized,
    {
        let path = task.path();
        match self {
            FieldUpdate::Tags(tags) => service.set_tags(path, tags).await,
            FieldUpdate::StartDate(start) => service.set_start_date(path, start.as_ref()).await,
            FieldUpdate::DueDate(due) => service.set_due_date(path, due.as_ref()).await,
            FieldUpdate::Complete(complete) => service.set_complete(path, *complete).await,
            FieldUpdate::Note(text) => service.add_note(path, "", text).await,
        }
    }

    /// Send this update to `task`'s remote identity.
    pub async fn apply<S>(&self, service: &S, task: &ExistingTask) -> Result<()>
    where
        S: TaskService + ?Sized,
    {
        log::debug!("{} {}", self.operation(), task.describe());
        self.send(service, task)
            .await
            .map_err(|e| Error::remote(task.describe(), self.operation(), e))
    }
}

/// The writes needed to move one existing task to its desired state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldPlan {
    /// Tags, completion and note: no ordering between them.
    pub independent: Vec<FieldUpdate>,
    pub start: Option<FieldUpdate>,
    pub due: Option<FieldUpdate>,
}

impl FieldPlan {
    pub fn new(task: &ExistingTask, desired: &DesiredTaskState) -> Self {
        let independent = [
            FieldUpdate::tags(task, desired),
            FieldUpdate::complete(task, desired),
            FieldUpdate::note(task, desired),
        ]
        .into_iter()
        .flatten()
        .collect();
        Self {
            independent,
            start: FieldUpdate::start(task, desired),
            due: FieldUpdate::due(task, desired),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.independent.is_empty() && self.start.is_none() && self.due.is_none()
    }

    /// Number of writes if nothing has to be retried.
    pub fn len(&self) -> usize {
        self.independent.len() + self.start.iter().count() + self.due.iter().count()
    }
}

/// What mirroring one matched pair cost.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PairOutcome {
    /// Remote calls issued, including rejected ones.
    pub calls: usize,
    /// The start/due pair had to be resent in reverse order.
    pub date_retried: bool,
}

/// Bring `task` to `desired`, one call at a time.
pub async fn mirror_properties<S>(
    service: &S,
    task: &ExistingTask,
    desired: &DesiredTaskState,
    date_order_error_code: u32,
) -> Result<PairOutcome>
where
    S: TaskService + ?Sized,
{
    let plan = FieldPlan::new(task, desired);
    let mut outcome = PairOutcome::default();
    // tags, then the date pair, then completion and note
    let (tags, rest): (Vec<_>, Vec<_>) = plan
        .independent
        .iter()
        .partition(|u| matches!(u, FieldUpdate::Tags(_)));

    for update in &tags {
        outcome.calls += 1;
        update.apply(service, task).await?;
    }
    let date_outcome = mirror_dates(service, task, &plan, date_order_error_code).await?;
    outcome.calls += date_outcome.calls;
    outcome.date_retried = date_outcome.date_retried;
    for update in &rest {
        outcome.calls += 1;
        update.apply(service, task).await?;
    }
    Ok(outcome)
}

/// Bring `task` to `desired`, sending the independent fields concurrently
/// with each other and with the start/due sequence.
pub async fn mirror_properties_concurrent<S>(
    service: &S,
    task: &ExistingTask,
    desired: &DesiredTaskState,
    date_order_error_code: u32,
) -> Result<PairOutcome>
where
    S: TaskService + ?Sized,
{
    let plan = FieldPlan::new(task, desired);
    let independent = try_join_all(plan.independent.iter().map(|u| u.apply(service, task)));
    let dates = mirror_dates(service, task, &plan, date_order_error_code);
    let (sent, date_outcome) = futures::try_join!(independent, dates)?;
    Ok(PairOutcome {
        calls: sent.len() + date_outcome.calls,
        date_retried: date_outcome.date_retried,
    })
}

/// Send start then due; if the service rejects a step for breaking
/// `start <= due`, send the pair again as due then start. A second
/// failure is returned as is.
///
/// Which order is safe depends on all four old and new values and on absent
/// dates, so the service decides: the forward order is tried first and the
/// reverse order at most once.
async fn mirror_dates<S>(
    service: &S,
    task: &ExistingTask,
    plan: &FieldPlan,
    date_order_error_code: u32,
) -> Result<PairOutcome>
where
    S: TaskService + ?Sized,
{
    let mut outcome = PairOutcome::default();
    let forward = [plan.start.as_ref(), plan.due.as_ref()];
    let err = match send_in_order(service, task, &forward, &mut outcome.calls).await {
        Ok(()) => return Ok(outcome),
        Err(err) => err,
    };

    let is_order_violation = err
        .remote_error()
        .is_some_and(|e| e.code == date_order_error_code);
    // With a single date to send, the reversed order is the same call.
    if !is_order_violation || plan.start.is_none() || plan.due.is_none() {
        return Err(err);
    }

    log::warn!(
        "{}: start/due rejected in forward order, retrying due first",
        task.describe()
    );
    outcome.date_retried = true;
    let reverse = [plan.due.as_ref(), plan.start.as_ref()];
    send_in_order(service, task, &reverse, &mut outcome.calls).await?;
    Ok(outcome)
}

async fn send_in_order<S>(
    service: &S,
    task: &ExistingTask,
    updates: &[Option<&FieldUpdate>],
    calls: &mut usize,
) -> Result<()>
where
    S: TaskService + ?Sized,
{
    for update in updates.iter().flatten() {
        *calls += 1;
        update.apply(service, task).await?;
    }
    Ok(())
}
