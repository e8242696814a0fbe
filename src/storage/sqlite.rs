//! `SQLite` backend for import jobs.
//!
//! Conditional status writes are single `UPDATE ... WHERE status IN (...)`
//! statements, so two concurrent resets of one job cannot both apply.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};

use crate::models::{ImportJob, ImportJobId, ImportStatus};
use crate::{Error, Result};

use super::traits::ImportJobStore;

const JOB_COLUMNS: &str = "id, organization, status, adapter_name, target_type_name, \
                           file_path, result_file_path, created_at, last_run_at";

/// SQLite-based import job store.
pub struct SqliteJobStore {
    /// Database connection (mutex for interior mutability).
    conn: Mutex<Connection>,
}

/// Raw column values of one `import_jobs` row.
struct JobRow {
    id: String,
    organization: String,
    status: String,
    adapter_name: String,
    target_type_name: String,
    file_path: Option<String>,
    result_file_path: Option<String>,
    created_at: i64,
    last_run_at: Option<i64>,
}

impl JobRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            organization: row.get(1)?,
            status: row.get(2)?,
            adapter_name: row.get(3)?,
            target_type_name: row.get(4)?,
            file_path: row.get(5)?,
            result_file_path: row.get(6)?,
            created_at: row.get(7)?,
            last_run_at: row.get(8)?,
        })
    }

    fn into_job(self) -> Result<ImportJob> {
        Ok(ImportJob {
            id: self.id.parse()?,
            organization: self.organization,
            status: self.status.parse()?,
            adapter_name: self.adapter_name,
            target_type_name: self.target_type_name,
            file_path: self.file_path,
            result_file_path: self.result_file_path,
            created_at: from_db_timestamp(self.created_at)?,
            last_run_at: self.last_run_at.map(from_db_timestamp).transpose()?,
        })
    }
}

impl SqliteJobStore {
    /// Opens (or creates) a job database at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| Error::operation("create_job_db_dir", e))?;
        }
        let conn = Connection::open(path).map_err(|e| Error::operation("open_job_database", e))?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Creates an in-memory `SQLite` job store (for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::operation("open_job_database_memory", e))?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| Error::operation("lock_connection", e))
    }

    fn initialize_schema(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS import_jobs (
                id TEXT PRIMARY KEY,
                organization TEXT NOT NULL,
                status TEXT NOT NULL,
                adapter_name TEXT NOT NULL,
                target_type_name TEXT NOT NULL,
                file_path TEXT,
                result_file_path TEXT,
                created_at INTEGER NOT NULL,
                last_run_at INTEGER
            );

            CREATE INDEX IF NOT EXISTS idx_import_jobs_status ON import_jobs(status);
            CREATE INDEX IF NOT EXISTS idx_import_jobs_created ON import_jobs(created_at);
            ",
        )
        .map_err(|e| Error::operation("initialize_job_schema", e))
    }

    fn select_job(conn: &Connection, id: ImportJobId) -> Result<Option<ImportJob>> {
        let row = conn
            .query_row(
                &format!("SELECT {JOB_COLUMNS} FROM import_jobs WHERE id = ?1"),
                params![id.to_string()],
                JobRow::from_row,
            )
            .optional()
            .map_err(|e| Error::operation("get_import_job", e))?;

        row.map(JobRow::into_job).transpose()
    }
}

impl ImportJobStore for SqliteJobStore {
    fn insert(&self, job: &ImportJob) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            &format!(
                "INSERT INTO import_jobs ({JOB_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
            ),
            params![
                job.id.to_string(),
                job.organization,
                job.status.as_str(),
                job.adapter_name,
                job.target_type_name,
                job.file_path,
                job.result_file_path,
                job.created_at.timestamp_millis(),
                job.last_run_at.map(|t| t.timestamp_millis()),
            ],
        )
        .map_err(|e| {
            if e.to_string().contains("UNIQUE constraint failed") {
                Error::InvalidInput(format!("import job {} already exists", job.id))
            } else {
                Error::operation("insert_import_job", e)
            }
        })?;
        Ok(())
    }

    fn get(&self, id: ImportJobId) -> Result<Option<ImportJob>> {
        let conn = self.conn()?;
        Self::select_job(&conn, id)
    }

    fn compare_and_set_status(
        &self,
        id: ImportJobId,
        expected: &[ImportStatus],
        new: ImportStatus,
    ) -> Result<bool> {
        if expected.is_empty() {
            return Ok(false);
        }

        let placeholders = (0..expected.len())
            .map(|i| format!("?{}", i + 3))
            .collect::<Vec<_>>()
            .join(", ");
        let values = [new.as_str().to_string(), id.to_string()]
            .into_iter()
            .chain(expected.iter().map(|s| s.as_str().to_string()));

        let conn = self.conn()?;
        let changed = conn
            .execute(
                &format!(
                    "UPDATE import_jobs SET status = ?1
                     WHERE id = ?2 AND status IN ({placeholders})"
                ),
                params_from_iter(values),
            )
            .map_err(|e| Error::operation("compare_and_set_status", e))?;
        Ok(changed == 1)
    }

    fn reset(&self, id: ImportJobId) -> Result<bool> {
        let conn = self.conn()?;
        let changed = conn
            .execute(
                "UPDATE import_jobs SET status = ?1, result_file_path = NULL
                 WHERE id = ?2 AND status IN (?3, ?4)",
                params![
                    ImportStatus::Created.as_str(),
                    id.to_string(),
                    ImportStatus::Succeeded.as_str(),
                    ImportStatus::Failed.as_str(),
                ],
            )
            .map_err(|e| Error::operation("reset_import_job", e))?;
        Ok(changed == 1)
    }

    fn record_run(
        &self,
        id: ImportJobId,
        status: ImportStatus,
        result_file_path: Option<&str>,
        last_run_at: Option<DateTime<Utc>>,
    ) -> Result<ImportJob> {
        let conn = self.conn()?;
        let changed = conn
            .execute(
                "UPDATE import_jobs
                 SET status = ?1,
                     result_file_path = COALESCE(?2, result_file_path),
                     last_run_at = COALESCE(?3, last_run_at)
                 WHERE id = ?4",
                params![
                    status.as_str(),
                    result_file_path,
                    last_run_at.map(|t| t.timestamp_millis()),
                    id.to_string(),
                ],
            )
            .map_err(|e| Error::operation("record_import_run", e))?;

        if changed == 0 {
            return Err(Error::not_found("import job", id.to_string()));
        }
        Self::select_job(&conn, id)?.ok_or_else(|| Error::not_found("import job", id.to_string()))
    }

    fn list(&self, limit: usize) -> Result<Vec<ImportJob>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {JOB_COLUMNS} FROM import_jobs ORDER BY created_at DESC LIMIT ?1"
            ))
            .map_err(|e| Error::operation("prepare_list_import_jobs", e))?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt
            .query_map(params![limit], JobRow::from_row)
            .map_err(|e| Error::operation("list_import_jobs", e))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| Error::operation("list_import_jobs", e))?;

        rows.into_iter().map(JobRow::into_job).collect()
    }

    fn list_by_status(&self, status: ImportStatus) -> Result<Vec<ImportJob>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {JOB_COLUMNS} FROM import_jobs WHERE status = ?1 ORDER BY created_at ASC"
            ))
            .map_err(|e| Error::operation("prepare_list_import_jobs_by_status", e))?;

        let rows = stmt
            .query_map(params![status.as_str()], JobRow::from_row)
            .map_err(|e| Error::operation("list_import_jobs_by_status", e))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| Error::operation("list_import_jobs_by_status", e))?;

        rows.into_iter().map(JobRow::into_job).collect()
    }
}

fn from_db_timestamp(millis: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| Error::InvalidInput(format!("invalid stored timestamp: {millis}")))
}
