//! Import event types for cross-component notification and audit.

use super::{ImportJob, ImportJobId, ImportStatus};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Shared event metadata required for observability.
#[derive(Debug, Clone)]
pub struct EventMeta {
    /// Unique identifier for this event.
    pub event_id: String,
    /// Event source component.
    pub source: &'static str,
    /// Emission time.
    pub timestamp: DateTime<Utc>,
}

impl EventMeta {
    /// Creates new event metadata using the current time.
    #[must_use]
    pub fn new(source: &'static str) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            source,
            timestamp: Utc::now(),
        }
    }
}

/// Payload of a finished upload.
///
/// The content subsystem stores uploads for several owners; only
/// [`UploadPayload::Import`] is relevant to import dispatch.
#[derive(Debug, Clone)]
pub enum UploadPayload {
    /// The upload belongs to an import job.
    Import(ImportJob),
    /// Any other upload owner.
    Other {
        /// Owner kind (e.g. "attachment").
        kind: String,
    },
}

/// A run-request message: the only message carried by the run channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RunRequested {
    /// Job to run.
    pub job_id: ImportJobId,
}

/// Events emitted by the import subsystem.
#[derive(Debug, Clone)]
pub enum ImportEvent {
    /// A file finished uploading.
    UploadCompleted {
        /// Event metadata.
        meta: EventMeta,
        /// Upload owner.
        payload: UploadPayload,
    },
    /// A run was requested for a job.
    RunRequested {
        /// Event metadata.
        meta: EventMeta,
        /// The job.
        job_id: ImportJobId,
    },
    /// A job status transition was persisted.
    StatusChanged {
        /// Event metadata.
        meta: EventMeta,
        /// The job.
        job_id: ImportJobId,
        /// Status before the transition.
        from: ImportStatus,
        /// Status after the transition.
        to: ImportStatus,
    },
}

impl ImportEvent {
    /// Returns the event type as a string.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::UploadCompleted { .. } => "upload_completed",
            Self::RunRequested { .. } => "run_requested",
            Self::StatusChanged { .. } => "status_changed",
        }
    }

    /// Returns the event metadata.
    #[must_use]
    pub const fn meta(&self) -> &EventMeta {
        match self {
            Self::UploadCompleted { meta, .. }
            | Self::RunRequested { meta, .. }
            | Self::StatusChanged { meta, .. } => meta,
        }
    }
}
