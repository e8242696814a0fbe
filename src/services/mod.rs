//! Business logic services.
//!
//! Derivation services (actions, templates, example values) are pure over
//! the metadata registry. Lifecycle services (dispatch, reset, upload bridge)
//! orchestrate the job store, the content store and the event bus.

mod actions;
mod container;
mod dispatch;
mod examples;
mod imports;
mod lifecycle;
mod template;
mod upload_bridge;

pub use actions::{ActionConfigDeriver, IMPORT_ACTION, IMPORT_PRIORITY, import_path};
pub use container::{DEFAULT_DATABASE_FILE, ServiceContainer, create_job_store, create_translator};
pub use dispatch::{MpscRunChannel, RunChannel, RunDispatcher, SpoolRunChannel};
pub use examples::ExampleValueSynthesizer;
pub use imports::{ImportService, ImportServiceParts};
pub use lifecycle::ImportLifecycle;
pub use template::{TEMPLATE_CACHE_CONTROL, TemplateFile, TemplateGenerator};
pub use upload_bridge::{UPLOAD_COMPLETED, UploadCompletionBridge};
