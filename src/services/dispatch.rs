//! Run dispatch to the external runner.
//!
//! Dispatch is at-least-once: a job may be announced more than once (upload
//! completion, an explicit retry and the recovery sweep can all fire), so the
//! runner must be idempotent per job id. Dispatch never waits for the runner.
//!
//! The run request is sent before the job leaves `Created`. A failed send
//! therefore leaves the job in `Created` with its file uploaded, which is
//! exactly what [`RunDispatcher::redispatch_created`] picks up again.

use crate::models::{EventMeta, ImportEvent, ImportJobId, ImportStatus, RunRequested};
use crate::observability::EventBus;
use crate::storage::ImportJobStore;
use crate::{Error, Result};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::instrument;

/// Asynchronous channel carrying [`RunRequested`] messages to the runner.
pub trait RunChannel: Send + Sync {
    /// Publishes one run request without waiting for it to be consumed.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel is closed or cannot be written.
    fn send(&self, request: RunRequested) -> Result<()>;
}

/// In-process channel backed by a tokio unbounded mpsc queue.
#[derive(Debug, Clone)]
pub struct MpscRunChannel {
    sender: mpsc::UnboundedSender<RunRequested>,
}

impl MpscRunChannel {
    /// Creates the channel and the receiver the runner consumes.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<RunRequested>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl RunChannel for MpscRunChannel {
    fn send(&self, request: RunRequested) -> Result<()> {
        self.sender
            .send(request)
            .map_err(|e| Error::operation("send_run_request", e))
    }
}

/// Durable channel appending one JSON line per request to a spool file.
///
/// Used by the CLI, where no runner lives in-process.
#[derive(Debug)]
pub struct SpoolRunChannel {
    path: PathBuf,
    lock: Mutex<()>,
}

impl SpoolRunChannel {
    /// Creates a channel appending to `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Returns the spool file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RunChannel for SpoolRunChannel {
    fn send(&self, request: RunRequested) -> Result<()> {
        let mut line =
            serde_json::to_string(&request).map_err(|e| Error::operation("encode_run_request", e))?;
        line.push('\n');

        let _guard = self
            .lock
            .lock()
            .map_err(|e| Error::operation("lock_run_spool", e))?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::operation("create_spool_dir", e))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| {
                Error::operation("open_run_spool", format!("{}: {e}", self.path.display()))
            })?;
        file.write_all(line.as_bytes())
            .map_err(|e| Error::operation("write_run_spool", e))
    }
}

/// Publishes run requests and moves jobs to `Queued`.
#[derive(Clone)]
pub struct RunDispatcher {
    store: Arc<dyn ImportJobStore>,
    channel: Arc<dyn RunChannel>,
    events: EventBus,
}

impl RunDispatcher {
    /// Creates a dispatcher.
    #[must_use]
    pub fn new(
        store: Arc<dyn ImportJobStore>,
        channel: Arc<dyn RunChannel>,
        events: EventBus,
    ) -> Self {
        Self {
            store,
            channel,
            events,
        }
    }

    /// Dispatches `job_id`, recording `trigger` (`upload`, `retry` or
    /// `recovery`) on the dispatch counter.
    ///
    /// The run request is sent first; the job is then moved `Created → Queued`
    /// when it is still `Created`. A job already past that point is announced
    /// anyway, since redelivery is part of the contract.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel send or the status write fails. When
    /// the send fails the stored status is left untouched.
    #[instrument(skip(self), fields(job_id = %job_id))]
    pub fn dispatch(&self, job_id: ImportJobId, trigger: &'static str) -> Result<()> {
        self.channel.send(RunRequested { job_id })?;
        self.events.publish(ImportEvent::RunRequested {
            meta: EventMeta::new("run_dispatcher"),
            job_id,
        });

        let queued = self.store.compare_and_set_status(
            job_id,
            &[ImportStatus::Created],
            ImportStatus::Queued,
        )?;
        if queued {
            self.events.publish(ImportEvent::StatusChanged {
                meta: EventMeta::new("run_dispatcher"),
                job_id,
                from: ImportStatus::Created,
                to: ImportStatus::Queued,
            });
        }

        metrics::counter!("import_runs_dispatched_total", "trigger" => trigger).increment(1);
        tracing::info!(trigger, queued, "Dispatched import run");
        Ok(())
    }

    /// Dispatches every stored job that is still `Created` with its file
    /// uploaded, oldest first.
    ///
    /// Covers upload notifications that were never handled and sends that
    /// failed. Jobs whose dispatch fails again are logged and skipped.
    /// Returns the number of dispatches.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be listed.
    #[instrument(skip(self))]
    pub fn redispatch_created(&self) -> Result<usize> {
        let pending = self.store.list_by_status(ImportStatus::Created)?;
        let mut dispatched = 0;
        for job in pending.iter().filter(|job| job.file_path.is_some()) {
            match self.dispatch(job.id, "recovery") {
                Ok(()) => dispatched += 1,
                Err(e) => {
                    metrics::counter!("import_dispatch_failures_total").increment(1);
                    tracing::error!(job_id = %job.id, error = %e, "Failed to redispatch import");
                },
            }
        }
        if dispatched > 0 {
            tracing::info!(dispatched, "Redispatched pending imports");
        }
        Ok(dispatched)
    }
}
