//! Import job types and identifiers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier of an import job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImportJobId(Uuid);

impl ImportJobId {
    /// Generates a fresh identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID.
    #[must_use]
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Returns the inner UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Returns true for the nil UUID, which marks an unassigned id.
    #[must_use]
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl Default for ImportJobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ImportJobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ImportJobId {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| crate::Error::InvalidInput(format!("invalid import job id '{s}': {e}")))
    }
}

/// Status of an import job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportStatus {
    /// Created by the import-request handler, not yet dispatched.
    Created,
    /// A run has been requested.
    Queued,
    /// The runner is processing the job.
    Running,
    /// The run completed.
    Succeeded,
    /// The run failed.
    Failed,
}

impl ImportStatus {
    /// Returns all statuses in lifecycle order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Created,
            Self::Queued,
            Self::Running,
            Self::Succeeded,
            Self::Failed,
        ]
    }

    /// Returns the status as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }

    /// Parses a status string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "created" => Some(Self::Created),
            "queued" => Some(Self::Queued),
            "running" => Some(Self::Running),
            "succeeded" | "success" => Some(Self::Succeeded),
            "failed" | "error" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Statuses from which a job may be reset.
    pub const RESETTABLE: &'static [Self] = &[Self::Succeeded, Self::Failed];

    /// Returns true if a job in this status may be reset.
    #[must_use]
    pub const fn is_resettable(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// Returns true for terminal run outcomes.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.is_resettable()
    }
}

impl fmt::Display for ImportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImportStatus {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        Self::parse(s)
            .ok_or_else(|| crate::Error::InvalidInput(format!("unknown import status: {s}")))
    }
}

/// A unit of import work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportJob {
    /// Identifier, assigned on creation.
    pub id: ImportJobId,
    /// Tenant the job belongs to.
    pub organization: String,
    /// Current status.
    pub status: ImportStatus,
    /// File format / mapping strategy used by the runner.
    pub adapter_name: String,
    /// Entity type being populated.
    pub target_type_name: String,
    /// Path of the uploaded file in the content store.
    pub file_path: Option<String>,
    /// Path of the run report, present only after a run produced one.
    pub result_file_path: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Time the last run started.
    pub last_run_at: Option<DateTime<Utc>>,
}

impl ImportJob {
    /// Creates a job in [`ImportStatus::Created`].
    #[must_use]
    pub fn new(
        organization: impl Into<String>,
        adapter_name: impl Into<String>,
        target_type_name: impl Into<String>,
    ) -> Self {
        Self {
            id: ImportJobId::new(),
            organization: organization.into(),
            status: ImportStatus::Created,
            adapter_name: adapter_name.into(),
            target_type_name: target_type_name.into(),
            file_path: None,
            result_file_path: None,
            created_at: Utc::now(),
            last_run_at: None,
        }
    }

    /// Returns the extension of the uploaded file.
    #[must_use]
    pub fn file_extension(&self) -> Option<&str> {
        self.file_path.as_deref().and_then(extension_of)
    }

    /// Returns the extension of the result file.
    #[must_use]
    pub fn result_file_extension(&self) -> Option<&str> {
        self.result_file_path.as_deref().and_then(extension_of)
    }
}

fn extension_of(path: &str) -> Option<&str> {
    Path::new(path).extension().and_then(|e| e.to_str())
}

/// Status report sent by the external runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerUpdate {
    /// Job being reported on.
    pub job_id: ImportJobId,
    /// New status.
    pub status: ImportStatus,
    /// Result report path, if the run produced one.
    #[serde(default)]
    pub result_file_path: Option<String>,
}

impl RunnerUpdate {
    /// Creates an update without a result file.
    #[must_use]
    pub const fn new(job_id: ImportJobId, status: ImportStatus) -> Self {
        Self {
            job_id,
            status,
            result_file_path: None,
        }
    }

    /// Attaches a result file path.
    #[must_use]
    pub fn with_result(mut self, path: impl Into<String>) -> Self {
        self.result_file_path = Some(path.into());
        self
    }
}
