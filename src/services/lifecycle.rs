//! Import job state machine.
//!
//! ```text
//! Created ──dispatch──▶ Queued ──runner──▶ Running ──runner──▶ Succeeded | Failed
//!    ▲                                                              │
//!    └──────────────────────────── reset ───────────────────────────┘
//! ```
//!
//! Only `reset` is decided here. Runner transitions are persisted as
//! reported, without validation.

use crate::models::{EventMeta, ImportEvent, ImportJob, ImportStatus, RunnerUpdate};
use crate::observability::EventBus;
use crate::storage::ImportJobStore;
use crate::Result;
use chrono::Utc;
use std::sync::Arc;
use tracing::instrument;

/// Applies lifecycle transitions through the job store.
#[derive(Clone)]
pub struct ImportLifecycle {
    store: Arc<dyn ImportJobStore>,
    events: EventBus,
}

impl ImportLifecycle {
    /// Creates a lifecycle over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn ImportJobStore>, events: EventBus) -> Self {
        Self { store, events }
    }

    /// Moves a finished job back to `Created` and clears its result file.
    ///
    /// Returns `false` without any write when the job is queued, running or
    /// already created. The stored status is checked atomically, so of two
    /// concurrent resets of the same job exactly one returns `true`. On
    /// success `job` is updated in place.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be accessed.
    #[instrument(skip(self, job), fields(job_id = %job.id, status = %job.status))]
    pub fn reset(&self, job: &mut ImportJob) -> Result<bool> {
        if !job.status.is_resettable() {
            metrics::counter!("import_jobs_reset_total", "outcome" => "noop").increment(1);
            return Ok(false);
        }

        if !self.store.reset(job.id)? {
            metrics::counter!("import_jobs_reset_total", "outcome" => "lost_race").increment(1);
            tracing::debug!("Job no longer resettable in store");
            return Ok(false);
        }

        let from = job.status;
        job.status = ImportStatus::Created;
        job.result_file_path = None;

        self.events.publish(ImportEvent::StatusChanged {
            meta: EventMeta::new("import_lifecycle"),
            job_id: job.id,
            from,
            to: ImportStatus::Created,
        });
        metrics::counter!("import_jobs_reset_total", "outcome" => "reset").increment(1);
        tracing::info!(%from, "Reset import job");
        Ok(true)
    }

    /// Persists a status reported by the runner.
    ///
    /// `last_run_at` is stamped when the runner reports `Running`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] if the job does not exist.
    #[instrument(skip(self, update), fields(job_id = %update.job_id, status = %update.status))]
    pub fn apply_runner_update(&self, update: &RunnerUpdate) -> Result<ImportJob> {
        let before = self.store.get_required(update.job_id)?;
        let started_at = (update.status == ImportStatus::Running).then(Utc::now);

        let job = self.store.record_run(
            update.job_id,
            update.status,
            update.result_file_path.as_deref(),
            started_at,
        )?;

        if before.status != job.status {
            self.events.publish(ImportEvent::StatusChanged {
                meta: EventMeta::new("import_runner"),
                job_id: job.id,
                from: before.status,
                to: job.status,
            });
        }
        tracing::info!(from = %before.status, "Recorded runner update");
        Ok(job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryJobStore;
    use test_case::test_case;

    fn setup(status: ImportStatus) -> (Arc<InMemoryJobStore>, ImportLifecycle, ImportJob) {
        let store = Arc::new(InMemoryJobStore::new());
        let mut job = ImportJob::new("acme", "spreadsheet", "contact");
        job.status = status;
        job.result_file_path = Some("report.csv".to_string());
        store.insert(&job).expect("insert");
        let lifecycle = ImportLifecycle::new(store.clone(), EventBus::new(16));
        (store, lifecycle, job)
    }

    #[test_case(ImportStatus::Created; "created")]
    #[test_case(ImportStatus::Queued; "queued")]
    #[test_case(ImportStatus::Running; "running")]
    fn test_reset_is_noop_outside_terminal_states(status: ImportStatus) {
        let (store, lifecycle, mut job) = setup(status);

        assert!(!lifecycle.reset(&mut job).expect("reset"));

        assert_eq!(job.status, status);
        let stored = store.get_required(job.id).expect("get");
        assert_eq!(stored.status, status);
        assert_eq!(stored.result_file_path.as_deref(), Some("report.csv"));
    }

    #[test_case(ImportStatus::Succeeded; "succeeded")]
    #[test_case(ImportStatus::Failed; "failed")]
    fn test_reset_terminal_job(status: ImportStatus) {
        let (store, lifecycle, mut job) = setup(status);

        assert!(lifecycle.reset(&mut job).expect("reset"));

        assert_eq!(job.status, ImportStatus::Created);
        assert!(job.result_file_path.is_none());
        let stored = store.get_required(job.id).expect("get");
        assert_eq!(stored.status, ImportStatus::Created);
        assert!(stored.result_file_path.is_none());
    }

    #[test]
    fn test_stale_snapshot_loses_race() {
        let (_store, lifecycle, job) = setup(ImportStatus::Failed);
        let mut first = job.clone();
        let mut second = job;

        assert!(lifecycle.reset(&mut first).expect("first"));
        assert!(!lifecycle.reset(&mut second).expect("second"));
        assert_eq!(second.status, ImportStatus::Failed);
    }

    #[test]
    fn test_runner_update_sets_last_run_and_result() {
        let (store, lifecycle, job) = setup(ImportStatus::Queued);
        let mut bus_events = lifecycle.events.subscribe_event_type("status_changed");

        let running = lifecycle
            .apply_runner_update(&RunnerUpdate::new(job.id, ImportStatus::Running))
            .expect("running");
        assert!(running.last_run_at.is_some());

        let failed = lifecycle
            .apply_runner_update(
                &RunnerUpdate::new(job.id, ImportStatus::Failed).with_result("run-report.csv"),
            )
            .expect("failed");
        assert_eq!(failed.status, ImportStatus::Failed);
        assert_eq!(failed.result_file_path.as_deref(), Some("run-report.csv"));
        assert_eq!(failed.last_run_at, running.last_run_at);

        assert!(bus_events.try_recv().is_ok());
        assert!(bus_events.try_recv().is_ok());
        assert_eq!(store.get_required(job.id).expect("get").status, ImportStatus::Failed);
    }

    #[test]
    fn test_runner_update_for_unknown_job() {
        let (_store, lifecycle, _job) = setup(ImportStatus::Queued);
        let err = lifecycle
            .apply_runner_update(&RunnerUpdate::new(
                crate::models::ImportJobId::new(),
                ImportStatus::Running,
            ))
            .expect_err("unknown job");
        assert!(matches!(err, crate::Error::NotFound { .. }));
    }
}
