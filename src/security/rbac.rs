//! Role-Based Access Control (RBAC).
//!
//! Import operations call out to an [`Authorizer`]; this crate never decides
//! identity. [`RoleAuthorizer`] is the built-in implementation, granting a
//! fixed role's permission set to every caller.
//!
//! # Roles
//!
//! | Role | Description | Permissions |
//! |------|-------------|-------------|
//! | `Admin` | Full access | All permissions |
//! | `Operator` | Runs imports | Create, Update, View, Import |
//! | `User` | Edits records, no bulk import | Create, Update, View |
//! | `Auditor` | Reviews import results | View |
//! | `ReadOnly` | Read-only data access | View |
//!
//! # Example
//!
//! ```rust
//! use metaport::security::rbac::{AccessControl, Permission, Role};
//!
//! let ac = AccessControl::new();
//! assert!(ac.has_permission(&Role::Operator, &Permission::Import));
//! assert!(!ac.has_permission(&Role::User, &Permission::Import));
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Caller roles. Each maps to a fixed permission set in [`AccessControl`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Everything.
    Admin,
    /// Runs imports.
    Operator,
    /// Edits records one at a time.
    User,
    /// Reviews jobs and their reports.
    Auditor,
    /// View only.
    ReadOnly,
}

impl Role {
    /// Parses a role name (`admin`, `operator`, `user`, `auditor`, `read_only`).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "admin" => Some(Self::Admin),
            "operator" => Some(Self::Operator),
            "user" => Some(Self::User),
            "auditor" => Some(Self::Auditor),
            "read_only" | "readonly" => Some(Self::ReadOnly),
            _ => None,
        }
    }
}

/// Permissions checked by import operations.
///
/// `Create`, `Update` and `View` are checked against an entity type;
/// `Import` is global.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// Create records of an entity type.
    Create,
    /// Update records of an entity type.
    Update,
    /// View records of an entity type.
    View,
    /// Use the bulk import feature.
    Import,
}

impl Permission {
    /// Returns all available permissions.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Create, Self::Update, Self::View, Self::Import]
    }

    /// Returns the permission name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::View => "view",
            Self::Import => "import",
        }
    }
}

/// Access control manager mapping roles to permissions.
#[derive(Debug, Clone)]
pub struct AccessControl {
    role_permissions: HashMap<Role, HashSet<Permission>>,
}

impl Default for AccessControl {
    fn default() -> Self {
        Self::new()
    }
}

impl AccessControl {
    const DEFAULT_GRANTS: &'static [(Role, &'static [Permission])] = &[
        (Role::Admin, Permission::all()),
        (Role::Operator, Permission::all()),
        (
            Role::User,
            &[Permission::Create, Permission::Update, Permission::View],
        ),
        (Role::Auditor, &[Permission::View]),
        (Role::ReadOnly, &[Permission::View]),
    ];

    /// Creates the default role-permission mapping.
    #[must_use]
    pub fn new() -> Self {
        let role_permissions = Self::DEFAULT_GRANTS
            .iter()
            .map(|(role, grants)| (*role, grants.iter().copied().collect()))
            .collect();
        Self { role_permissions }
    }

    /// Returns whether `role` holds `permission`.
    #[must_use]
    pub fn has_permission(&self, role: &Role, permission: &Permission) -> bool {
        self.role_permissions
            .get(role)
            .is_some_and(|perms| perms.contains(permission))
    }

    /// Returns the permission set of `role`.
    #[must_use]
    pub fn permissions_for(&self, role: &Role) -> HashSet<Permission> {
        self.role_permissions.get(role).cloned().unwrap_or_default()
    }

    /// Grants `permission` to `role`.
    pub fn grant_permission(&mut self, role: &Role, permission: Permission) {
        self.role_permissions
            .entry(*role)
            .or_default()
            .insert(permission);
    }

    /// Withdraws `permission` from `role`.
    pub fn revoke_permission(&mut self, role: &Role, permission: &Permission) {
        if let Some(perms) = self.role_permissions.get_mut(role) {
            perms.remove(permission);
        }
    }
}

/// Authorization decision boundary.
///
/// `subject` is the entity type name for type-scoped permissions and `None`
/// for global ones.
pub trait Authorizer: Send + Sync {
    /// Returns whether the caller holds `permission` on `subject`.
    fn is_granted(&self, permission: Permission, subject: Option<&str>) -> bool;
}

impl<F> Authorizer for F
where
    F: Fn(Permission, Option<&str>) -> bool + Send + Sync,
{
    fn is_granted(&self, permission: Permission, subject: Option<&str>) -> bool {
        self(permission, subject)
    }
}

/// Grants one role's permissions to every caller.
#[derive(Debug, Clone)]
pub struct RoleAuthorizer {
    role: Role,
    access: AccessControl,
}

impl RoleAuthorizer {
    /// Creates an authorizer for `role` with the default mapping.
    #[must_use]
    pub fn new(role: Role) -> Self {
        Self {
            role,
            access: AccessControl::new(),
        }
    }

    /// Replaces the role-permission mapping.
    #[must_use]
    pub fn with_access_control(mut self, access: AccessControl) -> Self {
        self.access = access;
        self
    }

    /// Returns the granted role.
    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }
}

impl Authorizer for RoleAuthorizer {
    fn is_granted(&self, permission: Permission, _subject: Option<&str>) -> bool {
        self.access.has_permission(&self.role, &permission)
    }
}

/// Requires every `(permission, subject)` pair, failing on the first refusal.
///
/// # Errors
///
/// Returns [`Error::AccessDenied`] naming the refused permission.
pub fn require(authorizer: &dyn Authorizer, checks: &[(Permission, Option<&str>)]) -> Result<()> {
    for (permission, subject) in checks {
        if !authorizer.is_granted(*permission, *subject) {
            tracing::debug!(
                permission = permission.as_str(),
                subject = subject.unwrap_or("*"),
                "Access denied"
            );
            return Err(Error::AccessDenied(match subject {
                Some(subject) => format!("{} on {subject}", permission.as_str()),
                None => permission.as_str().to_string(),
            }));
        }
    }
    Ok(())
}
