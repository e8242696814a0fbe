//! Integration tests for the import job lifecycle under concurrency.
#![allow(clippy::expect_used, clippy::unwrap_used)]

use metaport::models::RunRequested;
use metaport::observability::EventBus;
use metaport::services::{MpscRunChannel, RunDispatcher};
use metaport::storage::{InMemoryJobStore, SqliteJobStore};
use metaport::{ImportJob, ImportJobStore, ImportLifecycle, ImportStatus, RunnerUpdate};
use std::sync::{Arc, Barrier};
use std::thread;
use tempfile::TempDir;
use tokio::sync::mpsc::UnboundedReceiver;

struct Fixture {
    store: Arc<dyn ImportJobStore>,
    lifecycle: ImportLifecycle,
    dispatcher: RunDispatcher,
    runs: UnboundedReceiver<RunRequested>,
}

fn fixture(store: Arc<dyn ImportJobStore>) -> Fixture {
    let events = EventBus::new(64);
    let (channel, runs) = MpscRunChannel::new();
    Fixture {
        lifecycle: ImportLifecycle::new(Arc::clone(&store), events.clone()),
        dispatcher: RunDispatcher::new(Arc::clone(&store), Arc::new(channel), events),
        store,
        runs,
    }
}

fn finished_job(fixture: &Fixture, status: ImportStatus) -> ImportJob {
    let job = ImportJob::new("acme", "spreadsheet", "contact");
    fixture.store.insert(&job).expect("insert");
    fixture
        .lifecycle
        .apply_runner_update(&RunnerUpdate::new(job.id, ImportStatus::Running))
        .expect("running");
    fixture
        .lifecycle
        .apply_runner_update(&RunnerUpdate::new(job.id, status).with_result("report.csv"))
        .expect("finished")
}

/// Two callers retry the same finished job at once; only one may win.
fn assert_single_winner(mut fixture: Fixture) {
    let job = finished_job(&fixture, ImportStatus::Succeeded);
    let barrier = Arc::new(Barrier::new(2));

    let winners: usize = thread::scope(|scope| {
        let handles: Vec<_> = (0..2)
            .map(|_| {
                let barrier = Arc::clone(&barrier);
                let lifecycle = fixture.lifecycle.clone();
                let dispatcher = fixture.dispatcher.clone();
                let mut local = job.clone();
                scope.spawn(move || {
                    barrier.wait();
                    let reset = lifecycle.reset(&mut local).expect("reset");
                    if reset {
                        dispatcher.dispatch(local.id, "retry").expect("dispatch");
                    }
                    usize::from(reset)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().expect("join")).sum()
    });

    assert_eq!(winners, 1);
    assert_eq!(fixture.runs.try_recv().expect("one run").job_id, job.id);
    assert!(fixture.runs.try_recv().is_err());

    let stored = fixture.store.get_required(job.id).expect("stored");
    assert_eq!(stored.status, ImportStatus::Queued);
    assert_eq!(stored.result_file_path, None);
}

#[test]
fn test_concurrent_reset_in_memory() {
    assert_single_winner(fixture(Arc::new(InMemoryJobStore::new())));
}

#[test]
fn test_concurrent_reset_sqlite() {
    let dir = TempDir::new().expect("tempdir");
    let store = SqliteJobStore::new(dir.path().join("imports.db")).expect("sqlite");
    assert_single_winner(fixture(Arc::new(store)));
}

#[test]
fn test_runner_updates_are_not_validated() {
    let fixture = fixture(Arc::new(InMemoryJobStore::new()));
    let job = finished_job(&fixture, ImportStatus::Failed);

    let back = fixture
        .lifecycle
        .apply_runner_update(&RunnerUpdate::new(job.id, ImportStatus::Queued))
        .expect("update");

    assert_eq!(back.status, ImportStatus::Queued);
    assert_eq!(back.result_file_path.as_deref(), Some("report.csv"));
    assert!(back.last_run_at.is_some());
}

#[test]
fn test_reset_of_running_job_is_noop() {
    let fixture = fixture(Arc::new(InMemoryJobStore::new()));
    let mut job = ImportJob::new("acme", "spreadsheet", "contact");
    fixture.store.insert(&job).expect("insert");
    job = fixture
        .lifecycle
        .apply_runner_update(&RunnerUpdate::new(job.id, ImportStatus::Running))
        .expect("running");

    assert!(!fixture.lifecycle.reset(&mut job).expect("reset"));
    assert_eq!(job.status, ImportStatus::Running);
}
