//! Import operations exposed to the routing layer and the CLI.
//!
//! Every operation checks permissions through the [`Authorizer`] before it
//! touches storage or generates output.

use super::actions::ActionConfigDeriver;
use super::dispatch::RunDispatcher;
use super::lifecycle::ImportLifecycle;
use super::template::{TemplateFile, TemplateGenerator};
use crate::io::Format;
use crate::metadata::MetadataRegistry;
use crate::models::{ImportJob, ImportJobId};
use crate::security::{Authorizer, Permission, require};
use crate::storage::{ContentUploader, Download, IMPORT_BUCKET, ImportJobStore};
use crate::{Error, Result};
use std::sync::Arc;
use tracing::instrument;

/// Dependencies of [`ImportService`].
#[derive(Clone)]
pub struct ImportServiceParts {
    /// Entity metadata.
    pub registry: Arc<MetadataRegistry>,
    /// Import action deriver, for the adapter of new jobs.
    pub deriver: ActionConfigDeriver,
    /// Job persistence.
    pub store: Arc<dyn ImportJobStore>,
    /// Uploaded file storage.
    pub uploader: ContentUploader,
    /// Reset logic.
    pub lifecycle: ImportLifecycle,
    /// Run dispatch, used by retry.
    pub dispatcher: RunDispatcher,
    /// Template generation.
    pub generator: TemplateGenerator,
    /// Permission decisions.
    pub authorizer: Arc<dyn Authorizer>,
}

/// Import request handling.
#[derive(Clone)]
pub struct ImportService {
    parts: ImportServiceParts,
}

impl ImportService {
    /// Creates the service.
    #[must_use]
    pub const fn new(parts: ImportServiceParts) -> Self {
        Self { parts }
    }

    /// Creates an import job for `type_name` from an uploaded file.
    ///
    /// The job is stored in `Created`; its dispatch follows from the upload
    /// completion event.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if the entity type is unknown.
    /// - [`Error::InvalidInput`] if the type is not importable.
    /// - [`Error::UnsupportedFormat`] if the extension is not a spreadsheet format.
    /// - [`Error::AccessDenied`] without create, update and import rights.
    #[instrument(skip(self, data), fields(entity = %type_name, bytes = data.len()))]
    pub fn create_import(
        &self,
        type_name: &str,
        organization: &str,
        data: &[u8],
        extension: &str,
    ) -> Result<ImportJob> {
        let meta = self.parts.registry.get(type_name)?;
        let action = self.parts.deriver.derive(meta).ok_or_else(|| {
            Error::InvalidInput(format!("entity type {} is not importable", meta.name))
        })?;
        require(
            self.parts.authorizer.as_ref(),
            &[
                (Permission::Create, Some(meta.name.as_str())),
                (Permission::Update, Some(meta.name.as_str())),
                (Permission::Import, None),
            ],
        )?;
        let format: Format = extension.parse()?;

        let adapter = action
            .import_adapter
            .unwrap_or_else(|| crate::config::DEFAULT_ADAPTER.to_string());
        let mut job = ImportJob::new(organization, adapter, &meta.name);
        let store = Arc::clone(&self.parts.store);
        self.parts
            .uploader
            .upload_import(&mut job, data, format.extension(), |job| store.insert(job))?;

        metrics::counter!("import_jobs_created_total").increment(1);
        tracing::info!(job_id = %job.id, organization, "Created import job");
        Ok(job)
    }

    /// Resets a finished job and dispatches it again.
    ///
    /// A job that cannot be reset is returned unchanged and not dispatched.
    /// If the dispatch fails after the reset, the job stays `Created` with its
    /// file uploaded and is announced by the next recovery sweep.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if the job does not exist.
    /// - [`Error::AccessDenied`] without update and import rights.
    /// - [`Error::OperationFailed`] if the run request cannot be sent.
    #[instrument(skip(self), fields(job_id = %id))]
    pub fn retry(&self, id: ImportJobId) -> Result<ImportJob> {
        let mut job = self.parts.store.get_required(id)?;
        require(
            self.parts.authorizer.as_ref(),
            &[
                (Permission::Update, Some(job.target_type_name.as_str())),
                (Permission::Import, None),
            ],
        )?;

        if self.parts.lifecycle.reset(&mut job)? {
            self.parts.dispatcher.dispatch(job.id, "retry")?;
        } else {
            tracing::debug!(status = %job.status, "Retry ignored");
        }
        Ok(job)
    }

    /// Returns a job.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if the job does not exist.
    /// - [`Error::AccessDenied`] without view rights on the target type.
    pub fn get(&self, id: ImportJobId) -> Result<ImportJob> {
        let job = self.parts.store.get_required(id)?;
        require(
            self.parts.authorizer.as_ref(),
            &[(Permission::View, Some(job.target_type_name.as_str()))],
        )?;
        Ok(job)
    }

    /// Lists the newest jobs.
    ///
    /// Jobs on types the caller may not view are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be accessed.
    pub fn list(&self, limit: usize) -> Result<Vec<ImportJob>> {
        let jobs = self.parts.store.list(limit)?;
        Ok(jobs
            .into_iter()
            .filter(|job| {
                self.parts
                    .authorizer
                    .is_granted(Permission::View, Some(job.target_type_name.as_str()))
            })
            .collect())
    }

    /// Downloads the uploaded source file of a job.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if the job or its file does not exist.
    /// - [`Error::AccessDenied`] without view and import rights.
    #[instrument(skip(self), fields(job_id = %id))]
    pub fn download_original(&self, id: ImportJobId) -> Result<Download> {
        let job = self.downloadable(id)?;
        let path = job
            .file_path
            .as_deref()
            .ok_or_else(|| Error::not_found("import file", id.to_string()))?;
        self.download(&job, path, job.file_extension())
    }

    /// Downloads the run report of a job.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if the job does not exist or has no report.
    /// - [`Error::AccessDenied`] without view and import rights.
    #[instrument(skip(self), fields(job_id = %id))]
    pub fn download_result(&self, id: ImportJobId) -> Result<Download> {
        let job = self.downloadable(id)?;
        let path = job
            .result_file_path
            .as_deref()
            .ok_or_else(|| Error::not_found("import result", id.to_string()))?;
        self.download(&job, path, job.result_file_extension())
    }

    /// Generates the import template of `name`.
    ///
    /// Permissions are checked before any file is generated.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if the entity type is unknown.
    /// - [`Error::AccessDenied`] without create, update and import rights.
    /// - [`Error::UnsupportedFormat`] or [`Error::Internal`] from generation.
    #[instrument(skip(self), fields(entity = %name, ext = %extension))]
    pub fn download_template(&self, name: &str, extension: &str) -> Result<TemplateFile> {
        if !self.parts.registry.has_by_name(name) {
            return Err(Error::not_found("entity type", name));
        }
        require(
            self.parts.authorizer.as_ref(),
            &[
                (Permission::Create, Some(name)),
                (Permission::Update, Some(name)),
                (Permission::Import, None),
            ],
        )?;
        self.parts.generator.generate(name, extension)
    }

    fn downloadable(&self, id: ImportJobId) -> Result<ImportJob> {
        let job = self.parts.store.get_required(id)?;
        require(
            self.parts.authorizer.as_ref(),
            &[
                (Permission::View, Some(job.target_type_name.as_str())),
                (Permission::Import, None),
            ],
        )?;
        Ok(job)
    }

    fn download(&self, job: &ImportJob, path: &str, extension: Option<&str>) -> Result<Download> {
        let display_name = match extension {
            Some(ext) => format!("Import {}.{ext}", job.id),
            None => format!("Import {}", job.id),
        };
        self.parts
            .uploader
            .store()
            .download(IMPORT_BUCKET, path, &display_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EntityMetadata, FieldDescriptor, ImportStatus, RunRequested, RunnerUpdate};
    use crate::observability::EventBus;
    use crate::security::{Role, RoleAuthorizer};
    use crate::services::dispatch::MpscRunChannel;
    use crate::storage::{ContentStore, FsContentStore, InMemoryJobStore};
    use crate::translation::CatalogTranslator;
    use tempfile::TempDir;
    use tokio::sync::mpsc;

    struct Harness {
        _dir: TempDir,
        service: ImportService,
        lifecycle: ImportLifecycle,
        content: Arc<FsContentStore>,
        runs: mpsc::UnboundedReceiver<RunRequested>,
    }

    fn harness(role: Role) -> Harness {
        let dir = TempDir::new().expect("tempdir");
        let registry = Arc::new(
            MetadataRegistry::from_entities(vec![
                EntityMetadata::new("contact", "contacts")
                    .importable()
                    .with_field(FieldDescriptor::new("id", "guid").read_only())
                    .with_field(FieldDescriptor::new("name", "string")),
                EntityMetadata::new("tag", "tags")
                    .with_field(FieldDescriptor::new("id", "guid").read_only()),
            ])
            .expect("registry"),
        );
        let store: Arc<dyn ImportJobStore> = Arc::new(InMemoryJobStore::new());
        let content = Arc::new(FsContentStore::new(dir.path()));
        let events = EventBus::new(16);
        let (channel, runs) = MpscRunChannel::new();
        let dispatcher = RunDispatcher::new(Arc::clone(&store), Arc::new(channel), events.clone());
        let lifecycle = ImportLifecycle::new(Arc::clone(&store), events.clone());

        let service = ImportService::new(ImportServiceParts {
            registry: Arc::clone(&registry),
            deriver: ActionConfigDeriver::new("csv_mapping"),
            store,
            uploader: ContentUploader::new(content.clone(), events),
            lifecycle: lifecycle.clone(),
            dispatcher,
            generator: TemplateGenerator::new(registry, Arc::new(CatalogTranslator::new())),
            authorizer: Arc::new(RoleAuthorizer::new(role)),
        });
        Harness {
            _dir: dir,
            service,
            lifecycle,
            content,
            runs,
        }
    }

    #[test]
    fn test_create_import_stores_file_and_job() {
        let h = harness(Role::Operator);
        let job = h
            .service
            .create_import("contact", "acme", b"name\nAda\n", "CSV")
            .expect("create");

        assert_eq!(job.status, ImportStatus::Created);
        assert_eq!(job.adapter_name, "csv_mapping");
        assert_eq!(job.organization, "acme");
        assert_eq!(job.file_path, Some(format!("{}.csv", job.id)));

        let download = h.service.download_original(job.id).expect("original");
        assert_eq!(download.bytes, b"name\nAda\n");
        assert_eq!(download.filename, format!("Import {}.csv", job.id));
    }

    #[test]
    fn test_create_import_rejects_non_importable_and_unauthorized() {
        let h = harness(Role::Operator);
        let err = h
            .service
            .create_import("tag", "acme", b"", "csv")
            .expect_err("not importable");
        assert!(matches!(err, Error::InvalidInput(_)));

        let h = harness(Role::User);
        let err = h
            .service
            .create_import("contact", "acme", b"", "csv")
            .expect_err("no import right");
        assert!(matches!(err, Error::AccessDenied(_)));
    }

    #[test]
    fn test_download_result_requires_report() {
        let mut h = harness(Role::Operator);
        let job = h
            .service
            .create_import("contact", "acme", b"name\n", "csv")
            .expect("create");

        let err = h.service.download_result(job.id).expect_err("no report");
        assert!(matches!(err, Error::NotFound { .. }));

        h.content
            .store(IMPORT_BUCKET, "report.csv", b"row,error\n")
            .expect("store report");
        h.lifecycle
            .apply_runner_update(
                &RunnerUpdate::new(job.id, ImportStatus::Failed).with_result("report.csv"),
            )
            .expect("runner update");

        let report = h.service.download_result(job.id).expect("result");
        assert_eq!(report.bytes, b"row,error\n");

        let retried = h.service.retry(job.id).expect("retry");
        assert_eq!(retried.status, ImportStatus::Created);
        assert!(retried.result_file_path.is_none());
        assert_eq!(h.runs.try_recv().expect("run").job_id, job.id);
    }

    #[test]
    fn test_retry_of_running_job_is_silent_noop() {
        let mut h = harness(Role::Operator);
        let job = h
            .service
            .create_import("contact", "acme", b"name\n", "csv")
            .expect("create");
        h.lifecycle
            .apply_runner_update(&RunnerUpdate::new(job.id, ImportStatus::Running))
            .expect("running");

        let unchanged = h.service.retry(job.id).expect("retry");
        assert_eq!(unchanged.status, ImportStatus::Running);
        assert!(h.runs.try_recv().is_err());
    }

    #[test]
    fn test_failed_retry_dispatch_leaves_job_created() {
        let h = harness(Role::Operator);
        let job = h
            .service
            .create_import("contact", "acme", b"name\n", "csv")
            .expect("create");
        h.lifecycle
            .apply_runner_update(&RunnerUpdate::new(job.id, ImportStatus::Failed))
            .expect("failed");
        drop(h.runs);

        let err = h.service.retry(job.id).expect_err("closed channel");
        assert!(matches!(err, Error::OperationFailed { .. }));

        let stored = h.service.get(job.id).expect("get");
        assert_eq!(stored.status, ImportStatus::Created);
        assert!(stored.file_path.is_some());
    }

    #[test]
    fn test_download_template_checks_existence_then_permissions() {
        let h = harness(Role::Auditor);
        let err = h.service.download_template("Unknown", "csv").expect_err("unknown");
        assert!(matches!(err, Error::NotFound { .. }));

        let err = h.service.download_template("contact", "pdf").expect_err("denied");
        assert!(matches!(err, Error::AccessDenied(_)));

        let h = harness(Role::Admin);
        let file = h.service.download_template("contact", "ods").expect("ods");
        assert_eq!(file.format, Format::Ods);
        assert_eq!(file.filename, "Import template - contact.ods");
    }

    #[test]
    fn test_list_filters_by_view_permission() {
        let h = harness(Role::Operator);
        h.service
            .create_import("contact", "acme", b"name\n", "xlsx")
            .expect("create");
        assert_eq!(h.service.list(10).expect("list").len(), 1);
    }
}
