//! Data models for metaport.
//!
//! This module contains the core data structures shared by the registry,
//! the derivation engine and the import job lifecycle.

mod action;
mod events;
mod job;
mod metadata;

pub use action::{ActionConfig, ActionHandler, HttpMethod};
pub use events::{EventMeta, ImportEvent, RunRequested, UploadPayload};
pub use job::{ImportJob, ImportJobId, ImportStatus, RunnerUpdate};
pub use metadata::{
    AssociationDescriptor, ChildCommon, ChildMetadata, EntityMetadata, FieldDescriptor, TypeTag,
};
