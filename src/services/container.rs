//! Service wiring from configuration.
//!
//! ```text
//! ServiceContainer
//!   ├── registry    → Arc<MetadataRegistry>
//!   ├── store       → Arc<dyn ImportJobStore>   (memory | sqlite)
//!   ├── content     → Arc<dyn ContentStore>     (filesystem)
//!   ├── events      → EventBus
//!   ├── dispatcher  → RunDispatcher              (caller-supplied RunChannel)
//!   ├── lifecycle   → ImportLifecycle
//!   ├── bridge      → UploadCompletionBridge
//!   ├── translator  → Arc<dyn Translator>
//!   └── imports     → ImportService
//! ```

use super::actions::ActionConfigDeriver;
use super::dispatch::{RunChannel, RunDispatcher};
use super::imports::{ImportService, ImportServiceParts};
use super::lifecycle::ImportLifecycle;
use super::template::TemplateGenerator;
use super::upload_bridge::UploadCompletionBridge;
use crate::config::{JobStoreBackend, MetaportConfig};
use crate::metadata::MetadataRegistry;
use crate::observability::EventBus;
use crate::security::{Authorizer, RoleAuthorizer};
use crate::storage::{
    ContentStore, ContentUploader, FsContentStore, ImportJobStore, InMemoryJobStore,
    SqliteJobStore,
};
use crate::translation::{CatalogTranslator, Translator};
use crate::Result;
use std::sync::Arc;

/// Default `SQLite` database filename inside the data directory.
pub const DEFAULT_DATABASE_FILE: &str = "imports.db";

/// All services of one process, built once at startup.
#[derive(Clone)]
pub struct ServiceContainer {
    /// Loaded configuration.
    pub config: MetaportConfig,
    /// Entity metadata.
    pub registry: Arc<MetadataRegistry>,
    /// Job persistence.
    pub store: Arc<dyn ImportJobStore>,
    /// Uploaded file storage.
    pub content: Arc<dyn ContentStore>,
    /// Import event stream.
    pub events: EventBus,
    /// Import action deriver.
    pub deriver: ActionConfigDeriver,
    /// Run dispatcher.
    pub dispatcher: RunDispatcher,
    /// Lifecycle transitions.
    pub lifecycle: ImportLifecycle,
    /// Upload completion bridge.
    pub bridge: UploadCompletionBridge,
    /// Template generation.
    pub generator: TemplateGenerator,
    /// Message translation.
    pub translator: Arc<dyn Translator>,
    /// Import operations.
    pub imports: ImportService,
}

impl ServiceContainer {
    /// Builds every service from `config`, loading the metadata file.
    ///
    /// # Errors
    ///
    /// Returns an error if the metadata file, the translation catalog or the
    /// job database cannot be loaded.
    pub fn from_config(config: MetaportConfig, channel: Arc<dyn RunChannel>) -> Result<Self> {
        let registry = Arc::new(MetadataRegistry::load_from_file(&config.metadata_path)?);
        let authorizer: Arc<dyn Authorizer> = Arc::new(RoleAuthorizer::new(config.default_role));
        Self::with_parts(config, registry, channel, authorizer)
    }

    /// Builds every service around an already loaded registry and authorizer.
    ///
    /// # Errors
    ///
    /// Returns an error if the translation catalog or the job database cannot
    /// be loaded.
    pub fn with_parts(
        config: MetaportConfig,
        registry: Arc<MetadataRegistry>,
        channel: Arc<dyn RunChannel>,
        authorizer: Arc<dyn Authorizer>,
    ) -> Result<Self> {
        let store = create_job_store(&config)?;
        let content: Arc<dyn ContentStore> = Arc::new(FsContentStore::new(config.content_root()));
        let translator = create_translator(&config)?;
        let events = EventBus::new(config.event_bus_capacity);

        let deriver = ActionConfigDeriver::new(config.default_adapter.clone());
        let dispatcher = RunDispatcher::new(Arc::clone(&store), channel, events.clone());
        let lifecycle = ImportLifecycle::new(Arc::clone(&store), events.clone());
        let bridge = UploadCompletionBridge::new(dispatcher.clone());
        let generator = TemplateGenerator::new(Arc::clone(&registry), Arc::clone(&translator));

        let imports = ImportService::new(ImportServiceParts {
            registry: Arc::clone(&registry),
            deriver: deriver.clone(),
            store: Arc::clone(&store),
            uploader: ContentUploader::new(Arc::clone(&content), events.clone()),
            lifecycle: lifecycle.clone(),
            dispatcher: dispatcher.clone(),
            generator: generator.clone(),
            authorizer,
        });

        tracing::debug!(
            entities = registry.len(),
            content_root = %config.content_root().display(),
            "Service container ready"
        );

        Ok(Self {
            config,
            registry,
            store,
            content,
            events,
            deriver,
            dispatcher,
            lifecycle,
            bridge,
            generator,
            translator,
            imports,
        })
    }
}

/// Creates the configured job store.
///
/// # Errors
///
/// Returns an error if the `SQLite` database cannot be opened.
pub fn create_job_store(config: &MetaportConfig) -> Result<Arc<dyn ImportJobStore>> {
    match &config.job_store {
        JobStoreBackend::Memory => Ok(Arc::new(InMemoryJobStore::new())),
        JobStoreBackend::Sqlite(path) => {
            let path = path
                .clone()
                .unwrap_or_else(|| config.data_dir.join(DEFAULT_DATABASE_FILE));
            Ok(Arc::new(SqliteJobStore::new(&path)?))
        },
    }
}

/// Creates the translator: built-in messages, overlaid with the configured
/// catalog when there is one.
///
/// # Errors
///
/// Returns an error if the configured catalog cannot be loaded.
pub fn create_translator(config: &MetaportConfig) -> Result<Arc<dyn Translator>> {
    let catalog = match &config.translations_path {
        Some(path) => CatalogTranslator::load_from_file(path)?,
        None => CatalogTranslator::new(),
    };
    Ok(Arc::new(catalog))
}
