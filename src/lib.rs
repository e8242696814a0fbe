//! # Metaport
//!
//! Metadata-driven bulk import for multi-tenant entity stores.
//!
//! Metaport lets operators import CSV/ODS/XLS/XLSX files into any entity type
//! described by a metadata registry, without writing an importer per type.
//! Routes, permissions, template layout and example data are all derived from
//! the registry at startup.
//!
//! ## Features
//!
//! - Import routes derived from entity metadata ([`ActionConfigDeriver`])
//! - Downloadable spreadsheet templates ([`TemplateGenerator`])
//! - Import job lifecycle with atomic retry/reset ([`ImportLifecycle`])
//! - At-least-once run dispatch to an external runner ([`RunDispatcher`])
//! - Upload completion bridge wiring uploads to dispatch ([`UploadCompletionBridge`])
//!
//! ## Example
//!
//! ```rust,ignore
//! use metaport::{MetadataRegistry, TemplateGenerator};
//!
//! let registry = Arc::new(MetadataRegistry::load_from_file("metadata.toml")?);
//! let generator = TemplateGenerator::new(registry, translator);
//! let file = generator.generate("contact", "xlsx")?;
//! std::fs::write(&file.filename, &file.bytes)?;
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

// Module declarations
pub mod cli;
pub mod config;
#[cfg(feature = "http")]
pub mod http;
pub mod io;
pub mod metadata;
pub mod models;
pub mod observability;
pub mod security;
pub mod services;
pub mod storage;
pub mod translation;

// Re-exports for convenience
pub use config::MetaportConfig;
pub use io::Format;
pub use metadata::MetadataRegistry;
pub use models::{
    ActionConfig, AssociationDescriptor, ChildMetadata, EntityMetadata, FieldDescriptor,
    ImportEvent, ImportJob, ImportJobId, ImportStatus, RunnerUpdate, TypeTag, UploadPayload,
};
pub use services::{
    ActionConfigDeriver, ExampleValueSynthesizer, ImportLifecycle, ImportService, RunDispatcher,
    TemplateFile, TemplateGenerator, UploadCompletionBridge,
};
pub use storage::{ContentStore, ImportJobStore};

/// Error type for metaport operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `NotFound` | Unknown entity type, unknown job, missing result file |
/// | `UnsupportedFormat` | Template extension outside csv/ods/xls/xlsx |
/// | `AccessDenied` | The authorizer refused a required permission |
/// | `InvalidInput` | Malformed metadata, ids, statuses or CLI arguments |
/// | `OperationFailed` | I/O, `SQLite`, channel or config failures |
/// | `Internal` | Template serialization or synthesis failures |
#[derive(Debug, ThisError)]
pub enum Error {
    /// A requested resource does not exist.
    #[error("{kind} not found: {name}")]
    NotFound {
        /// Kind of resource (e.g. "entity type", "import job").
        kind: &'static str,
        /// The name or identifier that was looked up.
        name: String,
    },

    /// The requested template format is not one of csv, ods, xls, xlsx.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The caller lacks a required capability.
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// Invalid input was provided.
    ///
    /// Raised when:
    /// - A metadata definition violates registry invariants
    /// - A job id or status string cannot be parsed
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An operation failed.
    ///
    /// Raised when:
    /// - `SQLite` queries fail
    /// - Filesystem I/O errors occur
    /// - The run channel is closed
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// An internal failure while producing output.
    ///
    /// Template generation never yields partial output: any writer failure
    /// discards the buffer and surfaces here.
    #[error("internal error during {context}: {cause}")]
    Internal {
        /// What was being produced.
        context: String,
        /// The underlying cause.
        cause: String,
    },
}

impl Error {
    /// Builds a [`Error::NotFound`] for the given resource kind.
    #[must_use]
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    /// Builds an [`Error::OperationFailed`] from any displayable cause.
    #[must_use]
    pub fn operation(operation: &str, cause: impl std::fmt::Display) -> Self {
        Self::OperationFailed {
            operation: operation.to_string(),
            cause: cause.to_string(),
        }
    }

    /// Builds an [`Error::Internal`] from any displayable cause.
    #[must_use]
    pub fn internal(context: &str, cause: impl std::fmt::Display) -> Self {
        Self::Internal {
            context: context.to_string(),
            cause: cause.to_string(),
        }
    }

    /// Returns the HTTP status code class used at the request boundary.
    ///
    /// Internal failures map to a generic bad request.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::NotFound { .. } => 404,
            Self::UnsupportedFormat(_) | Self::InvalidInput(_) | Self::Internal { .. } => 400,
            Self::AccessDenied(_) => 403,
            Self::OperationFailed { .. } => 500,
        }
    }
}

/// Result type alias for metaport operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::not_found("entity type", "Unknown");
        assert_eq!(err.to_string(), "entity type not found: Unknown");

        let err = Error::operation("open_job_database", "disk full");
        assert_eq!(err.to_string(), "operation 'open_job_database' failed: disk full");

        let err = Error::UnsupportedFormat("pdf".to_string());
        assert_eq!(err.to_string(), "unsupported format: pdf");
    }

    #[test]
    fn test_error_status_codes() {
        assert_eq!(Error::not_found("import job", "x").status_code(), 404);
        assert_eq!(Error::UnsupportedFormat("pdf".into()).status_code(), 400);
        assert_eq!(Error::AccessDenied("import".into()).status_code(), 403);
        assert_eq!(Error::internal("template", "boom").status_code(), 400);
        assert_eq!(Error::operation("sqlite", "locked").status_code(), 500);
    }
}
