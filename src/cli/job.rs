//! Job CLI commands.
//!
//! One-shot commands have no background bridge task, so `create_job`
//! subscribes to uploads before creating the job and drains the subscription
//! afterwards. The dispatch therefore still goes through the bridge.

use super::{OutputFormat, to_json};
use crate::models::{ImportJob, ImportJobId, ImportStatus, RunnerUpdate};
use crate::services::{ServiceContainer, UploadCompletionBridge};
use crate::{Error, Result};
use std::fmt::Write;
use std::path::Path;

/// Creates an import job for `entity` from `file` and dispatches it.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the job cannot be created.
pub fn create_job(
    container: &ServiceContainer,
    entity: &str,
    organization: &str,
    file: &Path,
) -> Result<ImportJob> {
    let extension = file
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| Error::InvalidInput(format!("{} has no extension", file.display())))?;
    let data = std::fs::read(file)
        .map_err(|e| Error::operation("read_import_file", format!("{}: {e}", file.display())))?;

    let mut uploads = UploadCompletionBridge::subscribe(&container.events);
    let job = container
        .imports
        .create_import(entity, organization, &data, extension)?;
    let dispatched = container.bridge.process_pending(&mut uploads);
    tracing::debug!(dispatched, "Processed upload notifications");

    container.imports.get(job.id)
}

/// Shows one job.
///
/// # Errors
///
/// Returns an error if the id is malformed or the job does not exist.
pub fn show_job(container: &ServiceContainer, id: &str) -> Result<ImportJob> {
    container.imports.get(id.parse()?)
}

/// Lists the newest jobs.
///
/// # Errors
///
/// Returns an error if the store cannot be accessed.
pub fn list_jobs(container: &ServiceContainer, limit: usize) -> Result<Vec<ImportJob>> {
    container.imports.list(limit)
}

/// Retries a job. A job that cannot be reset is returned unchanged.
///
/// # Errors
///
/// Returns an error if the id is malformed or the job does not exist.
pub fn retry_job(container: &ServiceContainer, id: &str) -> Result<ImportJob> {
    container.imports.retry(id.parse()?)
}

/// Records a status reported by the runner.
///
/// # Errors
///
/// Returns an error if the id or status is malformed or the job does not exist.
pub fn runner_update(
    container: &ServiceContainer,
    id: &str,
    status: &str,
    result_file: Option<&str>,
) -> Result<ImportJob> {
    let job_id: ImportJobId = id.parse()?;
    let status: ImportStatus = status.parse()?;
    let mut update = RunnerUpdate::new(job_id, status);
    if let Some(path) = result_file {
        update = update.with_result(path);
    }
    container.lifecycle.apply_runner_update(&update)
}

/// Renders one job.
///
/// # Errors
///
/// Returns an error if JSON rendering fails.
pub fn render_job(job: &ImportJob, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => to_json(job),
        OutputFormat::Text => {
            let mut out = String::new();
            let _ = writeln!(out, "id:          {}", job.id);
            let _ = writeln!(out, "status:      {}", job.status);
            let _ = writeln!(out, "entity:      {}", job.target_type_name);
            let _ = writeln!(out, "organization: {}", job.organization);
            let _ = writeln!(out, "adapter:     {}", job.adapter_name);
            let _ = writeln!(out, "file:        {}", job.file_path.as_deref().unwrap_or("-"));
            let _ = writeln!(
                out,
                "result:      {}",
                job.result_file_path.as_deref().unwrap_or("-")
            );
            let _ = writeln!(out, "created:     {}", job.created_at.to_rfc3339());
            let _ = writeln!(
                out,
                "last run:    {}",
                job.last_run_at.map_or_else(|| "-".to_string(), |t| t.to_rfc3339())
            );
            Ok(out)
        },
    }
}

/// Renders a job listing.
///
/// # Errors
///
/// Returns an error if JSON rendering fails.
pub fn render_jobs(jobs: &[ImportJob], format: OutputFormat) -> Result<String> {
    if format == OutputFormat::Json {
        return to_json(jobs);
    }
    let mut out = String::new();
    for job in jobs {
        let _ = writeln!(
            out,
            "{}  {:<9}  {:<16}  {}",
            job.id,
            job.status.as_str(),
            job.target_type_name,
            job.created_at.format("%Y-%m-%d %H:%M:%S")
        );
    }
    Ok(out)
}
