//! Entity metadata: the schema of an importable entity type.
//!
//! Fields and associations are stored in declaration order and exposed
//! together through the [`ChildMetadata`] view.

use super::ActionConfig;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Type names that mark a child as an association.
const ASSOCIATION_KINDS: &[&str] = &[
    "association",
    "many_to_one",
    "one_to_one",
    "one_to_many",
    "many_to_many",
];

/// Type tag of a field or association.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TypeTag {
    /// Globally unique identifier (`guid`).
    Guid,
    /// Alias of [`TypeTag::Guid`] (`uuid`).
    Uuid,
    /// Free text.
    String,
    /// Boolean flag.
    Boolean,
    /// Whole number.
    Integer,
    /// Decimal number.
    Float,
    /// Calendar date.
    Date,
    /// Date and time.
    DateTime,
    /// Time of day.
    Time,
    /// Association marker with its cardinality kind.
    Association(String),
    /// Any other type the registry declares.
    Other(String),
}

impl TypeTag {
    /// Returns the string form used in metadata files and template annotations.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Guid => "guid",
            Self::Uuid => "uuid",
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Date => "date",
            Self::DateTime => "datetime",
            Self::Time => "time",
            Self::Association(kind) | Self::Other(kind) => kind,
        }
    }

    /// Returns true for association markers.
    #[must_use]
    pub const fn is_association(&self) -> bool {
        matches!(self, Self::Association(_))
    }
}

impl From<&str> for TypeTag {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "guid" => Self::Guid,
            "uuid" => Self::Uuid,
            "string" => Self::String,
            "boolean" | "bool" => Self::Boolean,
            "integer" | "int" => Self::Integer,
            "float" => Self::Float,
            "date" => Self::Date,
            "datetime" => Self::DateTime,
            "time" => Self::Time,
            other if ASSOCIATION_KINDS.contains(&other) => Self::Association(other.to_string()),
            _ => Self::Other(s.to_string()),
        }
    }
}

impl From<String> for TypeTag {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<TypeTag> for String {
    fn from(tag: TypeTag) -> Self {
        tag.as_str().to_string()
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attributes shared by fields and associations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildCommon {
    /// Name, unique within the parent entity.
    pub name: String,
    /// Translation key of the human label. Defaults to the name.
    #[serde(default)]
    pub label: Option<String>,
    /// Translation domain of the label.
    #[serde(default)]
    pub translation_domain: Option<String>,
    /// Type tag.
    #[serde(rename = "type")]
    pub type_tag: TypeTag,
    /// Whether the child is read-only for imports.
    #[serde(default)]
    pub read_only: bool,
}

/// A scalar field of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Shared attributes.
    #[serde(flatten)]
    pub common: ChildCommon,
}

impl FieldDescriptor {
    /// Creates a writable field.
    #[must_use]
    pub fn new(name: impl Into<String>, type_tag: impl Into<TypeTag>) -> Self {
        Self {
            common: ChildCommon {
                name: name.into(),
                label: None,
                translation_domain: None,
                type_tag: type_tag.into(),
                read_only: false,
            },
        }
    }

    /// Marks the field read-only.
    #[must_use]
    pub const fn read_only(mut self) -> Self {
        self.common.read_only = true;
        self
    }

    /// Sets the label translation key.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.common.label = Some(label.into());
        self
    }
}

/// An association to another entity type.
///
/// `target` is a registry lookup key, never an owning reference: association
/// graphs between entity types may be cyclic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociationDescriptor {
    /// Shared attributes.
    #[serde(flatten)]
    pub common: ChildCommon,
    /// Name of the target entity type.
    pub target: String,
}

impl AssociationDescriptor {
    /// Creates a writable many-to-one association.
    #[must_use]
    pub fn new(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            common: ChildCommon {
                name: name.into(),
                label: None,
                translation_domain: None,
                type_tag: TypeTag::Association("many_to_one".to_string()),
                read_only: false,
            },
            target: target.into(),
        }
    }

    /// Marks the association read-only.
    #[must_use]
    pub const fn read_only(mut self) -> Self {
        self.common.read_only = true;
        self
    }
}

/// Borrowed view over either kind of child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildMetadata<'a> {
    /// A scalar field.
    Field(&'a FieldDescriptor),
    /// An association.
    Association(&'a AssociationDescriptor),
}

impl<'a> ChildMetadata<'a> {
    /// Returns the shared attributes.
    #[must_use]
    pub const fn common(&self) -> &'a ChildCommon {
        match self {
            Self::Field(field) => &field.common,
            Self::Association(association) => &association.common,
        }
    }

    /// Returns the child name.
    #[must_use]
    pub fn name(&self) -> &'a str {
        &self.common().name
    }

    /// Returns the label translation key, falling back to the name.
    #[must_use]
    pub fn label(&self) -> &'a str {
        let common = self.common();
        common.label.as_deref().unwrap_or(&common.name)
    }

    /// Returns the type tag.
    #[must_use]
    pub const fn type_tag(&self) -> &'a TypeTag {
        &self.common().type_tag
    }

    /// Returns whether the child is read-only.
    #[must_use]
    pub const fn is_read_only(&self) -> bool {
        self.common().read_only
    }

    /// Returns the kind label used in template annotations.
    #[must_use]
    pub const fn kind_label(&self) -> &'static str {
        match self {
            Self::Field(_) => "Field",
            Self::Association(_) => "Association",
        }
    }
}

fn default_true() -> bool {
    true
}

/// Schema of one entity type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMetadata {
    /// Type name, the registry key.
    pub name: String,
    /// Optional class name the type is also known by.
    #[serde(default)]
    pub class: Option<String>,
    /// Plural name used in derived routes.
    pub plural_name: String,
    /// Translation key of the human label. Defaults to the name.
    #[serde(default)]
    pub label: Option<String>,
    /// Translation domain for labels.
    #[serde(default)]
    pub translation_domain: Option<String>,
    /// Name of the identifier field.
    #[serde(default = "EntityMetadata::default_identifier")]
    pub identifier: String,
    /// Whether the type accepts bulk imports.
    #[serde(default)]
    pub importable: bool,
    /// Whether default actions are derived at all.
    #[serde(default = "default_true")]
    pub build_default_actions: bool,
    /// Default actions that must not be derived.
    #[serde(default)]
    pub excluded_default_actions: BTreeSet<String>,
    /// Fields in declaration order.
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
    /// Associations in declaration order.
    #[serde(default)]
    pub associations: Vec<AssociationDescriptor>,
    /// Explicitly configured actions, keyed by action name.
    #[serde(default)]
    pub actions: BTreeMap<String, ActionConfig>,
}

impl EntityMetadata {
    fn default_identifier() -> String {
        "id".to_string()
    }

    /// Creates metadata with no children.
    #[must_use]
    pub fn new(name: impl Into<String>, plural_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            class: None,
            plural_name: plural_name.into(),
            label: None,
            translation_domain: None,
            identifier: Self::default_identifier(),
            importable: false,
            build_default_actions: true,
            excluded_default_actions: BTreeSet::new(),
            fields: Vec::new(),
            associations: Vec::new(),
            actions: BTreeMap::new(),
        }
    }

    /// Marks the type importable.
    #[must_use]
    pub const fn importable(mut self) -> Self {
        self.importable = true;
        self
    }

    /// Adds a field.
    #[must_use]
    pub fn with_field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Adds an association.
    #[must_use]
    pub fn with_association(mut self, association: AssociationDescriptor) -> Self {
        self.associations.push(association);
        self
    }

    /// Excludes a default action from derivation.
    #[must_use]
    pub fn excluding_action(mut self, action: impl Into<String>) -> Self {
        self.excluded_default_actions.insert(action.into());
        self
    }

    /// Returns the label translation key, falling back to the name.
    #[must_use]
    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }

    /// Returns fields followed by associations, in declaration order.
    #[must_use]
    pub fn children(&self) -> Vec<ChildMetadata<'_>> {
        self.fields
            .iter()
            .map(ChildMetadata::Field)
            .chain(self.associations.iter().map(ChildMetadata::Association))
            .collect()
    }

    /// Looks up a field by name.
    #[must_use]
    pub fn field_by_name(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.common.name == name)
    }

    /// Returns the identifier field descriptor, if declared.
    #[must_use]
    pub fn identifier_field(&self) -> Option<&FieldDescriptor> {
        self.field_by_name(&self.identifier)
    }
}
