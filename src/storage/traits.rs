//! Storage trait definitions.

use crate::models::{ImportJob, ImportJobId, ImportStatus};
use crate::{Error, Result};
use chrono::{DateTime, Utc};

/// Persistence boundary for import jobs.
///
/// Every status write that can race with another actor goes through
/// [`compare_and_set_status`](Self::compare_and_set_status) or
/// [`reset`](Self::reset), which must be atomic with respect to concurrent
/// callers. Implementations must be thread-safe (`Send + Sync`).
pub trait ImportJobStore: Send + Sync {
    /// Inserts a new job.
    ///
    /// # Errors
    ///
    /// Returns an error if a job with the same id exists or storage fails.
    fn insert(&self, job: &ImportJob) -> Result<()>;

    /// Gets a job by id.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be accessed.
    fn get(&self, id: ImportJobId) -> Result<Option<ImportJob>>;

    /// Sets `status` to `new` only if the current status is one of `expected`.
    ///
    /// Returns whether the write happened. A missing job returns `false`.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be accessed.
    fn compare_and_set_status(
        &self,
        id: ImportJobId,
        expected: &[ImportStatus],
        new: ImportStatus,
    ) -> Result<bool>;

    /// Atomically moves a terminal job back to `Created` and clears its
    /// result file.
    ///
    /// Returns `false` without writing when the stored status is not
    /// resettable (or the job does not exist).
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be accessed.
    fn reset(&self, id: ImportJobId) -> Result<bool>;

    /// Persists a runner-reported status, without transition validation.
    ///
    /// `result_file_path` is only written when `Some`; `last_run_at` is only
    /// written when `Some`. Returns the updated job.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the job does not exist.
    fn record_run(
        &self,
        id: ImportJobId,
        status: ImportStatus,
        result_file_path: Option<&str>,
        last_run_at: Option<DateTime<Utc>>,
    ) -> Result<ImportJob>;

    /// Lists jobs, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be accessed.
    fn list(&self, limit: usize) -> Result<Vec<ImportJob>>;

    /// Lists every job currently in `status`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be accessed.
    fn list_by_status(&self, status: ImportStatus) -> Result<Vec<ImportJob>>;

    /// Gets a job by id, failing with [`Error::NotFound`] when absent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] or a storage error.
    fn get_required(&self, id: ImportJobId) -> Result<ImportJob> {
        self.get(id)?
            .ok_or_else(|| Error::not_found("import job", id.to_string()))
    }
}
