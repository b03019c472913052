use futures::stream::{self, StreamExt, TryStreamExt};

use crate::error::{Error, Operation, Result};
use crate::mirror::diff::{diff_unsorted, ListDiff};
use crate::mirror::property::{
    mirror_properties, mirror_properties_concurrent, FieldUpdate, PairOutcome,
};
use crate::mirror::{MirrorOptions, MirrorProgress, MirrorReport};
use crate::service::TaskService;
use crate::task::{DesiredTaskState, ExistingTask};

type Plan<'a> = ListDiff<ExistingTask, &'a DesiredTaskState>;

fn plan<'a>(existing: Vec<ExistingTask>, desired: &'a [DesiredTaskState]) -> Plan<'a> {
    let plan = diff_unsorted(
        existing,
        desired.iter(),
        |task| task.name.clone(),
        |desired| desired.name.clone(),
    );
    log::info!(
        "Mirror plan: {} to delete, {} matched, {} to add",
        plan.to_delete.len(),
        plan.matched.len(),
        plan.to_add.len()
    );
    plan
}

/// Make the remote tasks match `desired`, one call at a time.
///
/// `existing` must be the remote state as of just before this call: fields
/// that already match according to it are not written, and no remote change
/// made since it was read is detected. Deletions run first, then creations,
/// then matched tasks. A failure stops the run and leaves earlier work in
/// place.
pub async fn mirror<S>(
    service: &S,
    existing: Vec<ExistingTask>,
    desired: &[DesiredTaskState],
    options: &MirrorOptions,
    progress: &dyn MirrorProgress,
) -> Result<MirrorReport>
where
    S: TaskService + ?Sized,
{
    let plan = plan(existing, desired);
    progress.on_plan(plan.to_delete.len(), plan.matched.len(), plan.to_add.len());
    let mut report = MirrorReport::default();

    for task in plan.to_delete {
        let name = delete(service, task).await?;
        report.deleted += 1;
        report.calls += 1;
        progress.on_deleted(&name);
    }

    for desired in plan.to_add {
        report.calls += create(service, desired).await?;
        report.created += 1;
        progress.on_created(&desired.name);
    }

    for (task, desired) in plan.matched {
        let outcome =
            mirror_properties(service, &task, desired, options.date_order_error_code).await?;
        report.record_pair(&outcome);
        progress.on_mirrored(&task.name, &outcome);
    }

    log::info!("Mirror complete: {report:?}");
    Ok(report)
}

/// Same result as [`mirror`], with independent tasks handled concurrently.
///
/// Up to `options.concurrency` tasks are in flight at once. Each phase
/// (deletions, creations, matched tasks) finishes before the next begins,
/// and writes to one task keep their data dependencies: a new task is
/// populated only after its creation returns, and the start/due pair stays
/// sequential.
pub async fn mirror_concurrent<S>(
    service: &S,
    existing: Vec<ExistingTask>,
    desired: &[DesiredTaskState],
    options: &MirrorOptions,
    progress: &dyn MirrorProgress,
) -> Result<MirrorReport>
where
    S: TaskService + ?Sized,
{
    let plan = plan(existing, desired);
    progress.on_plan(plan.to_delete.len(), plan.matched.len(), plan.to_add.len());
    let limit = options.effective_concurrency();
    let mut report = MirrorReport::default();

    let deleted: Vec<()> = stream::iter(plan.to_delete)
        .map(|task| async move {
            let name = delete(service, task).await?;
            progress.on_deleted(&name);
            Ok::<_, Error>(())
        })
        .buffer_unordered(limit)
        .try_collect()
        .await?;
    report.deleted = deleted.len();
    report.calls += deleted.len();

    let created: Vec<usize> = stream::iter(plan.to_add)
        .map(|desired| async move {
            let calls = create(service, desired).await?;
            progress.on_created(&desired.name);
            Ok::<_, Error>(calls)
        })
        .buffer_unordered(limit)
        .try_collect()
        .await?;
    report.created = created.len();
    report.calls += created.iter().sum::<usize>();

    let code = options.date_order_error_code;
    let outcomes: Vec<PairOutcome> = stream::iter(plan.matched)
        .map(|(task, desired)| async move {
            let outcome = mirror_properties_concurrent(service, &task, desired, code).await?;
            progress.on_mirrored(&task.name, &outcome);
            Ok::<_, Error>(outcome)
        })
        .buffer_unordered(limit)
        .try_collect()
        .await?;
    for outcome in &outcomes {
        report.record_pair(outcome);
    }

    log::info!("Mirror complete: {report:?}");
    Ok(report)
}

/// Delete `task` remotely. The handle is consumed: it must not be used again.
async fn delete<S>(service: &S, task: ExistingTask) -> Result<String>
where
    S: TaskService + ?Sized,
{
    log::debug!("{} {}", Operation::DeleteTask, task.describe());
    service
        .delete_task(task.path())
        .await
        .map_err(|e| Error::remote(task.describe(), Operation::DeleteTask, e))?;
    Ok(task.name)
}

/// Create a task for `desired` and populate every non-default field.
/// Returns the number of remote calls issued.
async fn create<S>(service: &S, desired: &DesiredTaskState) -> Result<usize>
where
    S: TaskService + ?Sized,
{
    log::debug!("{} '{}'", Operation::CreateTask, desired.name);
    let path = service
        .create_task(&desired.name)
        .await
        .map_err(|e| Error::remote(format!("'{}'", desired.name), Operation::CreateTask, e))?;
    let task = ExistingTask::new(path, desired.name.as_str());

    // A new task has no dates yet, so start/due order cannot be violated
    // by the order of these writes.
    let updates = FieldUpdate::for_new_task(desired);
    for update in &updates {
        update.apply(service, &task).await?;
    }
    Ok(1 + updates.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mirror::NoopProgress;
    use crate::service::memory::{MemoryService, RecordedCall};
    use crate::task::{TaskDate, TaskPath};
    use chrono::NaiveDate;
    use parking_lot::Mutex;

    const CODE: u32 = 4100;

    fn day(m: u32, d: u32) -> TaskDate {
        TaskDate::Date(NaiveDate::from_ymd_opt(2021, m, d).unwrap())
    }

    fn existing(id: &str, name: &str) -> ExistingTask {
        ExistingTask::new(TaskPath::new("inbox", format!("s-{id}"), format!("t-{id}")), name)
    }

    #[derive(Default)]
    struct RecordingProgress {
        events: Mutex<Vec<String>>,
    }

    impl MirrorProgress for RecordingProgress {
        fn on_plan(&self, to_delete: usize, matched: usize, to_add: usize) {
            self.events
                .lock()
                .push(format!("plan {to_delete}/{matched}/{to_add}"));
        }
        fn on_deleted(&self, name: &str) {
            self.events.lock().push(format!("deleted {name}"));
        }
        fn on_created(&self, name: &str) {
            self.events.lock().push(format!("created {name}"));
        }
        fn on_mirrored(&self, name: &str, outcome: &PairOutcome) {
            self.events
                .lock()
                .push(format!("mirrored {name} {}", outcome.calls));
        }
    }

    #[tokio::test]
    async fn test_end_to_end_scenario() {
        let mut task_a = existing("a", "TaskA");
        task_a.tags.insert("x".into());
        let service = MemoryService::with_tasks(CODE, [task_a.clone()]);
        let desired = vec![
            DesiredTaskState::new("TaskA").with_tags(["x"]),
            DesiredTaskState::new("TaskB"),
        ];
        let progress = RecordingProgress::default();

        let report = mirror(&service, vec![task_a], &desired, &MirrorOptions::default(), &progress)
            .await
            .unwrap();

        assert_eq!(
            report,
            MirrorReport {
                deleted: 0,
                created: 1,
                updated: 0,
                unchanged: 1,
                calls: 1,
                date_retries: 0,
            }
        );
        assert_eq!(
            service.calls(),
            vec![RecordedCall::CreateTask {
                name: "TaskB".into()
            }]
        );
        assert_eq!(
            *progress.events.lock(),
            vec!["plan 0/1/1", "created TaskB", "mirrored TaskA 0"]
        );
    }

    #[tokio::test]
    async fn test_deletes_creates_and_updates() {
        let old = existing("old", "Old");
        let mut keep = existing("keep", "Keep");
        keep.start_date = Some(day(5, 1));
        keep.due_date = Some(day(6, 1));
        let service = MemoryService::with_tasks(CODE, [old.clone(), keep.clone()]);
        let desired = vec![
            DesiredTaskState::new("Keep")
                .with_start(day(6, 2))
                .with_due(day(6, 3))
                .with_complete(Some(true)),
            DesiredTaskState::new("New")
                .with_tags(["home", "errand"])
                .with_start(day(7, 1))
                .with_due(day(7, 2))
                .with_complete(Some(true))
                .with_note("bring bags"),
        ];

        let report = mirror(
            &service,
            vec![old, keep],
            &desired,
            &MirrorOptions::default(),
            &NoopProgress,
        )
        .await
        .unwrap();

        assert_eq!(report.deleted, 1);
        assert_eq!(report.created, 1);
        assert_eq!(report.updated, 1);
        assert_eq!(report.date_retries, 1);
        // delete 1, create 1 + 5 fields, keep: 3 date writes + complete
        assert_eq!(report.calls, 11);

        assert!(service.task_named("Old").is_none());
        let keep = service.task_named("Keep").unwrap();
        assert_eq!(keep.start_date, Some(day(6, 2)));
        assert_eq!(keep.due_date, Some(day(6, 3)));
        assert!(keep.complete);
        let new = service.task_named("New").unwrap();
        assert_eq!(new.tags.len(), 2);
        assert_eq!(new.due_date, Some(day(7, 2)));
        assert!(new.complete);
        assert!(new.has_note("bring bags"));

        // deletions precede creations, which precede matched updates
        let ops: Vec<Operation> = service.calls().iter().map(RecordedCall::operation).collect();
        assert_eq!(ops[0], Operation::DeleteTask);
        assert_eq!(ops[1], Operation::CreateTask);
    }

    #[tokio::test]
    async fn test_concurrent_matches_sequential_end_state() {
        let desired: Vec<DesiredTaskState> = (0..10)
            .map(|i| {
                DesiredTaskState::new(format!("task {i}"))
                    .with_tags([format!("tag{i}")])
                    .with_start(day(6, 2))
                    .with_due(day(6, 3))
                    .with_note(format!("note {i}"))
            })
            .collect();
        let mut snapshot = Vec::new();
        for i in 0..15 {
            let mut task = existing(&i.to_string(), &format!("task {i}"));
            task.start_date = Some(day(5, 1));
            task.due_date = Some(day(6, 1));
            snapshot.push(task);
        }

        let sequential = MemoryService::with_tasks(CODE, snapshot.clone());
        let seq_report = mirror(
            &sequential,
            snapshot.clone(),
            &desired,
            &MirrorOptions::default(),
            &NoopProgress,
        )
        .await
        .unwrap();

        let concurrent = MemoryService::with_tasks(CODE, snapshot.clone());
        let options = MirrorOptions {
            concurrency: 4,
            ..MirrorOptions::concurrent()
        };
        let con_report = mirror_concurrent(&concurrent, snapshot, &desired, &options, &NoopProgress)
            .await
            .unwrap();

        assert_eq!(seq_report, con_report);
        assert_eq!(con_report.deleted, 5);
        assert_eq!(con_report.updated, 10);
        assert_eq!(con_report.date_retries, 10);

        let strip = |mut tasks: Vec<ExistingTask>| {
            for t in &mut tasks {
                t.modified = None;
            }
            tasks
        };
        assert_eq!(strip(sequential.tasks()), strip(concurrent.tasks()));
    }

    #[tokio::test]
    async fn test_snapshot_round_trip_is_noop() {
        let mut task = existing("a", "TaskA");
        task.tags.insert("x".into());
        task.start_date = Some(day(5, 1));
        task.due_date = Some(day(6, 1));
        task.complete = true;
        let service = MemoryService::with_tasks(CODE, [task]);

        let fetched = service.list_tasks("", None).await.unwrap();
        let desired: Vec<DesiredTaskState> =
            fetched.iter().map(DesiredTaskState::from_task).collect();
        service.clear_calls();

        let report = mirror_concurrent(
            &service,
            fetched,
            &desired,
            &MirrorOptions::concurrent(),
            &NoopProgress,
        )
        .await
        .unwrap();
        assert_eq!(report.calls, 0);
        assert_eq!(report.unchanged, 1);
        assert!(service.calls().is_empty());
    }

    #[tokio::test]
    async fn test_delete_failure_names_task_and_stops() {
        let gone = existing("gone", "Gone");
        let service = MemoryService::with_tasks(CODE, [gone.clone()]);
        service.fail_next(
            Operation::DeleteTask,
            "Gone",
            crate::error::RemoteError::new(320, "task already deleted"),
        );
        let desired = vec![DesiredTaskState::new("Fresh")];

        let err = mirror(&service, vec![gone], &desired, &MirrorOptions::default(), &NoopProgress)
            .await
            .unwrap_err();
        match err {
            Error::Remote {
                task, operation, ..
            } => {
                assert_eq!(task, "'Gone' (inbox/s-gone/t-gone)");
                assert_eq!(operation, Operation::DeleteTask);
            }
            other => panic!("unexpected error: {other}"),
        }
        // nothing after the failed delete was attempted
        assert!(service.task_named("Fresh").is_none());
    }

    #[tokio::test]
    async fn test_create_failure_names_desired_task() {
        let service = MemoryService::new(CODE);
        service.fail_next(
            Operation::CreateTask,
            "Fresh",
            crate::error::RemoteError::new(4000, "list is locked"),
        );
        let desired = vec![DesiredTaskState::new("Fresh")];

        let err = mirror_concurrent(
            &service,
            Vec::new(),
            &desired,
            &MirrorOptions::concurrent(),
            &NoopProgress,
        )
        .await
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "create task failed for 'Fresh': remote error 4000: list is locked"
        );
    }
}
