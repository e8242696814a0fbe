//! In-memory job store for tests and dry runs.

use super::traits::ImportJobStore;
use crate::models::{ImportJob, ImportJobId, ImportStatus};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Job store backed by a mutex-guarded map.
///
/// The single mutex makes every conditional write atomic.
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    jobs: Mutex<HashMap<ImportJobId, ImportJob>>,
}

impl InMemoryJobStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<ImportJobId, ImportJob>>> {
        self.jobs
            .lock()
            .map_err(|e| Error::operation("lock_job_store", e))
    }
}

impl ImportJobStore for InMemoryJobStore {
    fn insert(&self, job: &ImportJob) -> Result<()> {
        let mut jobs = self.lock()?;
        if jobs.contains_key(&job.id) {
            return Err(Error::InvalidInput(format!(
                "import job {} already exists",
                job.id
            )));
        }
        jobs.insert(job.id, job.clone());
        Ok(())
    }

    fn get(&self, id: ImportJobId) -> Result<Option<ImportJob>> {
        Ok(self.lock()?.get(&id).cloned())
    }

    fn compare_and_set_status(
        &self,
        id: ImportJobId,
        expected: &[ImportStatus],
        new: ImportStatus,
    ) -> Result<bool> {
        let mut jobs = self.lock()?;
        match jobs.get_mut(&id) {
            Some(job) if expected.contains(&job.status) => {
                job.status = new;
                Ok(true)
            },
            _ => Ok(false),
        }
    }

    fn reset(&self, id: ImportJobId) -> Result<bool> {
        let mut jobs = self.lock()?;
        match jobs.get_mut(&id) {
            Some(job) if job.status.is_resettable() => {
                job.status = ImportStatus::Created;
                job.result_file_path = None;
                Ok(true)
            },
            _ => Ok(false),
        }
    }

    fn record_run(
        &self,
        id: ImportJobId,
        status: ImportStatus,
        result_file_path: Option<&str>,
        last_run_at: Option<DateTime<Utc>>,
    ) -> Result<ImportJob> {
        let mut jobs = self.lock()?;
        let job = jobs
            .get_mut(&id)
            .ok_or_else(|| Error::not_found("import job", id.to_string()))?;

        job.status = status;
        if let Some(path) = result_file_path {
            job.result_file_path = Some(path.to_string());
        }
        if last_run_at.is_some() {
            job.last_run_at = last_run_at;
        }
        Ok(job.clone())
    }

    fn list(&self, limit: usize) -> Result<Vec<ImportJob>> {
        let mut jobs: Vec<ImportJob> = self.lock()?.values().cloned().collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs.truncate(limit);
        Ok(jobs)
    }

    fn list_by_status(&self, status: ImportStatus) -> Result<Vec<ImportJob>> {
        let mut jobs: Vec<ImportJob> = self
            .lock()?
            .values()
            .filter(|job| job.status == status)
            .cloned()
            .collect();
        jobs.sort_by_key(|job| job.created_at);
        Ok(jobs)
    }
}
