//! Security features.
//!
//! Role-based authorization checks for import operations.

pub mod rbac;

pub use rbac::{AccessControl, Authorizer, Permission, Role, RoleAuthorizer, require};
