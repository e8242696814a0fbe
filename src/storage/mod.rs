//! Storage layer.
//!
//! Two independent boundaries:
//! - **Job store** ([`ImportJobStore`]): authoritative import job rows
//!   (`SQLite` or in-memory), with atomic conditional status writes.
//! - **Content store** ([`ContentStore`]): uploaded source files and runner
//!   result reports, addressed by bucket and relative path.

// Allow significant_drop_tightening - dropping database connections slightly early
// provides no meaningful benefit.
#![allow(clippy::significant_drop_tightening)]

pub mod content;
pub mod memory;
pub mod sqlite;
pub mod traits;

pub use content::{ContentStore, ContentUploader, Download, FsContentStore, IMPORT_BUCKET};
pub use memory::InMemoryJobStore;
pub use sqlite::SqliteJobStore;
pub use traits::ImportJobStore;
