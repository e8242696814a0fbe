//! Binary content storage for uploaded import files and runner reports.
//!
//! Paths handed out by a [`ContentStore`] are relative to its bucket and are
//! what [`ImportJob::file_path`] and [`ImportJob::result_file_path`] record.

use crate::io::Format;
use crate::models::{EventMeta, ImportEvent, ImportJob, UploadPayload};
use crate::observability::EventBus;
use crate::{Error, Result};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// Bucket holding import source files and result reports.
pub const IMPORT_BUCKET: &str = "import";

const OCTET_STREAM: &str = "application/octet-stream";

/// A file ready to be streamed back to a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    /// File contents.
    pub bytes: Vec<u8>,
    /// Display filename.
    pub filename: String,
    /// MIME type guessed from the stored path.
    pub content_type: &'static str,
}

/// Storage boundary for binary content.
pub trait ContentStore: Send + Sync {
    /// Stores `data` as `name` in `bucket` and returns the stored path.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is not a plain relative path or the
    /// write fails.
    fn store(&self, bucket: &str, name: &str, data: &[u8]) -> Result<String>;

    /// Reads a stored file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the file does not exist.
    fn read(&self, bucket: &str, path: &str) -> Result<Vec<u8>>;

    /// Reads a stored file for download under `display_name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the file does not exist.
    fn download(&self, bucket: &str, path: &str, display_name: &str) -> Result<Download> {
        let bytes = self.read(bucket, path)?;
        let content_type = Format::from_path(Path::new(path))
            .map_or(OCTET_STREAM, |format| format.mime_type());
        Ok(Download {
            bytes,
            filename: display_name.to_string(),
            content_type,
        })
    }
}

/// Filesystem content store rooted at one directory, one subdirectory per bucket.
#[derive(Debug, Clone)]
pub struct FsContentStore {
    root: PathBuf,
}

impl FsContentStore {
    /// Creates a store rooted at `root`. Directories are created lazily.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the store root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, bucket: &str, path: &str) -> Result<PathBuf> {
        for part in [bucket, path] {
            let plain = !part.is_empty()
                && Path::new(part)
                    .components()
                    .all(|c| matches!(c, Component::Normal(_)));
            if !plain {
                return Err(Error::InvalidInput(format!(
                    "content path must be relative without parent segments: {part}"
                )));
            }
        }
        Ok(self.root.join(bucket).join(path))
    }
}

impl ContentStore for FsContentStore {
    fn store(&self, bucket: &str, name: &str, data: &[u8]) -> Result<String> {
        let target = self.resolve(bucket, name)?;
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::operation("create_content_dir", e))?;
        }
        std::fs::write(&target, data)
            .map_err(|e| Error::operation("write_content", format!("{}: {e}", target.display())))?;

        tracing::debug!(bucket, name, bytes = data.len(), "Stored content");
        Ok(name.to_string())
    }

    fn read(&self, bucket: &str, path: &str) -> Result<Vec<u8>> {
        let source = self.resolve(bucket, path)?;
        std::fs::read(&source).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::not_found("content file", path)
            } else {
                Error::operation("read_content", format!("{}: {e}", source.display()))
            }
        })
    }
}

/// Stores uploaded import files and announces completed uploads.
#[derive(Clone)]
pub struct ContentUploader {
    store: Arc<dyn ContentStore>,
    events: EventBus,
}

impl ContentUploader {
    /// Creates an uploader publishing to `events`.
    #[must_use]
    pub fn new(store: Arc<dyn ContentStore>, events: EventBus) -> Self {
        Self { store, events }
    }

    /// Returns the underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn ContentStore> {
        &self.store
    }

    /// Stores the source file of `job`, persists the job through `persist`
    /// and then publishes [`ImportEvent::UploadCompleted`].
    ///
    /// The event is only published once both the file and the job row exist,
    /// so a dispatched runner always finds both.
    ///
    /// # Errors
    ///
    /// Returns an error if storing the file or persisting the job fails; no
    /// event is published in that case.
    pub fn upload_import<F>(
        &self,
        job: &mut ImportJob,
        data: &[u8],
        extension: &str,
        persist: F,
    ) -> Result<()>
    where
        F: FnOnce(&ImportJob) -> Result<()>,
    {
        let name = format!("{}.{}", job.id, extension.to_lowercase());
        let path = self.store.store(IMPORT_BUCKET, &name, data)?;
        job.file_path = Some(path);

        persist(job)?;

        self.events.publish(ImportEvent::UploadCompleted {
            meta: EventMeta::new("content_uploader"),
            payload: UploadPayload::Import(job.clone()),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_store_and_download() {
        let dir = TempDir::new().expect("tempdir");
        let store = FsContentStore::new(dir.path());

        let path = store
            .store(IMPORT_BUCKET, "abc.csv", b"name\nAda\n")
            .expect("store");
        let download = store
            .download(IMPORT_BUCKET, &path, "Import abc.csv")
            .expect("download");

        assert_eq!(download.bytes, b"name\nAda\n");
        assert_eq!(download.filename, "Import abc.csv");
        assert_eq!(download.content_type, "text/csv");
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = TempDir::new().expect("tempdir");
        let store = FsContentStore::new(dir.path());
        assert!(matches!(
            store.read(IMPORT_BUCKET, "missing.csv"),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn test_rejects_traversal() {
        let dir = TempDir::new().expect("tempdir");
        let store = FsContentStore::new(dir.path());
        assert!(store.store(IMPORT_BUCKET, "../escape.csv", b"x").is_err());
        assert!(store.read("/etc", "passwd").is_err());
    }

    #[tokio::test]
    async fn test_upload_publishes_after_persist() {
        let dir = TempDir::new().expect("tempdir");
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe_event_type("upload_completed");
        let uploader = ContentUploader::new(Arc::new(FsContentStore::new(dir.path())), bus);

        let mut job = ImportJob::new("acme", "spreadsheet", "contact");
        assert!(
            uploader
                .upload_import(&mut job, b"x", "CSV", |_| Err(Error::operation("insert", "locked")))
                .is_err()
        );
        assert!(rx.try_recv().is_err());

        uploader
            .upload_import(&mut job, b"x", "CSV", |_| Ok(()))
            .expect("upload");
        assert_eq!(job.file_path, Some(format!("{}.csv", job.id)));

        let event = rx.recv().await.expect("event");
        match event {
            ImportEvent::UploadCompleted {
                payload: UploadPayload::Import(uploaded),
                ..
            } => assert_eq!(uploaded.id, job.id),
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
