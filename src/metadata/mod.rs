//! Entity metadata registry.
//!
//! The registry is the single source from which import routes, permissions,
//! template columns and example values are derived. It is read-only for the
//! lifetime of the process.
//!
//! # Definition file
//!
//! ```toml
//! [[entities]]
//! name = "contact"
//! plural_name = "contacts"
//! label = "entity.contact"
//! importable = true
//!
//! [[entities.fields]]
//! name = "id"
//! type = "guid"
//! read_only = true
//!
//! [[entities.associations]]
//! name = "account"
//! type = "many_to_one"
//! target = "account"
//! ```

mod registry;

pub use registry::MetadataRegistry;
