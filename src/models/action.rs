//! Action configuration: how an entity action is exposed to the routing layer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// HTTP methods an action may accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// GET.
    Get,
    /// POST.
    Post,
    /// PUT.
    Put,
    /// PATCH.
    Patch,
    /// DELETE.
    Delete,
}

impl HttpMethod {
    /// Returns the method name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handler bound to an action.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActionHandler {
    /// The generic import-request handler.
    ImportRequest,
    /// A handler registered elsewhere, by name.
    Named(String),
}

impl ActionHandler {
    /// Name of the generic import-request handler.
    pub const IMPORT_REQUEST: &'static str = "import_request";

    /// Returns the handler name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::ImportRequest => Self::IMPORT_REQUEST,
            Self::Named(name) => name,
        }
    }
}

impl From<String> for ActionHandler {
    fn from(s: String) -> Self {
        if s == Self::IMPORT_REQUEST {
            Self::ImportRequest
        } else {
            Self::Named(s)
        }
    }
}

impl From<ActionHandler> for String {
    fn from(handler: ActionHandler) -> Self {
        handler.as_str().to_string()
    }
}

/// Configuration of a single entity action.
///
/// Every attribute is optional so that explicitly declared configuration
/// can be merged with derived defaults without being overridden.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionConfig {
    /// Action name (e.g. `import`).
    #[serde(default)]
    pub name: String,
    /// Accepted methods; empty means "not configured".
    #[serde(default)]
    pub methods: Vec<HttpMethod>,
    /// Route path template.
    #[serde(default)]
    pub path: Option<String>,
    /// Bound handler.
    #[serde(default)]
    pub handler: Option<ActionHandler>,
    /// Action kind tag carried to the handler.
    #[serde(default)]
    pub action_kind: Option<String>,
    /// Target entity type tag carried to the handler.
    #[serde(default)]
    pub target_type: Option<String>,
    /// Route matching priority; lower values match later.
    #[serde(default)]
    pub priority: Option<i32>,
    /// Import adapter recorded on jobs created through this action.
    #[serde(default)]
    pub import_adapter: Option<String>,
}

impl ActionConfig {
    /// Creates an empty configuration for the named action.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Returns the effective priority (0 when unset).
    #[must_use]
    pub fn effective_priority(&self) -> i32 {
        self.priority.unwrap_or(0)
    }
}
