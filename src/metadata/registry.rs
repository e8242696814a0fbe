//! Load-once metadata registry.

use crate::models::{ChildMetadata, EntityMetadata};
use crate::{Error, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Arc;

/// On-disk layout of a metadata definition file.
#[derive(Debug, Deserialize, Default)]
struct DefinitionFile {
    #[serde(default)]
    entities: Vec<EntityMetadata>,
}

/// Read-only registry of entity metadata.
///
/// Built once at process start and shared behind an `Arc`. Construction
/// validates the registry invariants; a registry that exists is consistent.
#[derive(Debug, Clone, Default)]
pub struct MetadataRegistry {
    entities: BTreeMap<String, Arc<EntityMetadata>>,
    classes: BTreeMap<String, String>,
}

impl MetadataRegistry {
    /// Builds a registry from entity definitions.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if:
    /// - two entities share a name or plural name
    /// - an entity has two children with the same name
    /// - the identifier field is missing
    /// - an association targets an unknown entity type
    pub fn from_entities(entities: Vec<EntityMetadata>) -> Result<Self> {
        let mut registry = Self::default();
        let mut plurals = HashSet::new();

        for entity in entities {
            if registry.entities.contains_key(&entity.name) {
                return Err(Error::InvalidInput(format!(
                    "duplicate entity type: {}",
                    entity.name
                )));
            }
            if !plurals.insert(entity.plural_name.clone()) {
                return Err(Error::InvalidInput(format!(
                    "duplicate plural name '{}' on entity type {}",
                    entity.plural_name, entity.name
                )));
            }
            validate_children(&entity)?;

            if let Some(class) = &entity.class {
                registry.classes.insert(class.clone(), entity.name.clone());
            }
            registry
                .entities
                .insert(entity.name.clone(), Arc::new(entity));
        }

        registry.validate_targets()?;

        tracing::debug!(entities = registry.len(), "Metadata registry built");
        Ok(registry)
    }

    /// Loads a registry from a TOML, YAML or JSON definition file.
    ///
    /// The format is chosen by file extension.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::operation("read_metadata_file", format!("{}: {e}", path.display()))
        })?;

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        let file: DefinitionFile = match ext.as_deref() {
            Some("yaml" | "yml") => serde_yaml_ng::from_str(&contents)
                .map_err(|e| Error::operation("parse_metadata_yaml", e))?,
            Some("json") => serde_json::from_str(&contents)
                .map_err(|e| Error::operation("parse_metadata_json", e))?,
            _ => toml::from_str(&contents).map_err(|e| Error::operation("parse_metadata_toml", e))?,
        };

        tracing::info!(path = %path.display(), "Loaded metadata definitions");
        Self::from_entities(file.entities)
    }

    /// Parses a TOML definition document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be parsed or validated.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let file: DefinitionFile =
            toml::from_str(contents).map_err(|e| Error::operation("parse_metadata_toml", e))?;
        Self::from_entities(file.entities)
    }

    /// Returns true if an entity type with this name exists.
    #[must_use]
    pub fn has_by_name(&self, name: &str) -> bool {
        self.entities.contains_key(name)
    }

    /// Returns the entity type with this name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the type is unknown.
    pub fn get_by_name(&self, name: &str) -> Result<&EntityMetadata> {
        self.entities
            .get(name)
            .map(AsRef::as_ref)
            .ok_or_else(|| Error::not_found("entity type", name))
    }

    /// Returns the entity type with this name or class.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if neither lookup matches.
    pub fn get(&self, name_or_class: &str) -> Result<&EntityMetadata> {
        if let Some(name) = self.classes.get(name_or_class) {
            return self.get_by_name(name);
        }
        self.get_by_name(name_or_class)
    }

    /// Returns a shared handle to the entity type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the type is unknown.
    pub fn get_shared(&self, name: &str) -> Result<Arc<EntityMetadata>> {
        self.entities
            .get(name)
            .cloned()
            .ok_or_else(|| Error::not_found("entity type", name))
    }

    /// Iterates over all entity types in name order.
    pub fn iter(&self) -> impl Iterator<Item = &EntityMetadata> {
        self.entities.values().map(AsRef::as_ref)
    }

    /// Returns the number of entity types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns true if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    fn validate_targets(&self) -> Result<()> {
        for entity in self.entities.values() {
            for association in &entity.associations {
                if !self.has_by_name(&association.target) {
                    return Err(Error::InvalidInput(format!(
                        "association {}.{} targets unknown entity type {}",
                        entity.name, association.common.name, association.target
                    )));
                }
            }
        }
        Ok(())
    }
}

fn validate_children(entity: &EntityMetadata) -> Result<()> {
    let mut names = HashSet::new();
    for child in entity.children() {
        if !names.insert(child.name()) {
            return Err(Error::InvalidInput(format!(
                "duplicate child '{}' on entity type {}",
                child.name(),
                entity.name
            )));
        }
    }

    match entity.children().iter().find(|c| c.name() == entity.identifier) {
        Some(ChildMetadata::Field(_)) => Ok(()),
        Some(ChildMetadata::Association(_)) => Err(Error::InvalidInput(format!(
            "identifier '{}' of entity type {} must be a field",
            entity.identifier, entity.name
        ))),
        None => Err(Error::InvalidInput(format!(
            "identifier field '{}' missing on entity type {}",
            entity.identifier, entity.name
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AssociationDescriptor, FieldDescriptor};

    fn account() -> EntityMetadata {
        EntityMetadata::new("account", "accounts")
            .with_field(FieldDescriptor::new("id", "integer").read_only())
    }

    #[test]
    fn test_lookup_by_name_and_class() {
        let mut contact = EntityMetadata::new("contact", "contacts")
            .with_field(FieldDescriptor::new("id", "guid").read_only())
            .with_association(AssociationDescriptor::new("account", "account"));
        contact.class = Some("App\\Entity\\Contact".to_string());

        let registry = MetadataRegistry::from_entities(vec![contact, account()]).expect("build");

        assert!(registry.has_by_name("contact"));
        assert!(!registry.has_by_name("Contact"));
        assert_eq!(registry.get("App\\Entity\\Contact").expect("by class").name, "contact");
        assert_eq!(registry.get("account").expect("by name").plural_name, "accounts");
        assert!(matches!(
            registry.get_by_name("unknown"),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn test_rejects_missing_identifier() {
        let entity =
            EntityMetadata::new("tag", "tags").with_field(FieldDescriptor::new("label", "string"));
        let err = MetadataRegistry::from_entities(vec![entity]).expect_err("must fail");
        assert!(err.to_string().contains("identifier field 'id' missing"));
    }

    #[test]
    fn test_rejects_duplicate_child_names() {
        let entity = account().with_association(AssociationDescriptor::new("id", "account"));
        let err = MetadataRegistry::from_entities(vec![entity]).expect_err("must fail");
        assert!(err.to_string().contains("duplicate child 'id'"));
    }

    #[test]
    fn test_rejects_unknown_association_target() {
        let entity = account().with_association(AssociationDescriptor::new("owner", "user"));
        let err = MetadataRegistry::from_entities(vec![entity]).expect_err("must fail");
        assert!(err.to_string().contains("unknown entity type user"));
    }

    #[test]
    fn test_allows_cyclic_associations() {
        let parent = EntityMetadata::new("folder", "folders")
            .with_field(FieldDescriptor::new("id", "guid"))
            .with_association(AssociationDescriptor::new("parent", "folder"));
        let registry = MetadataRegistry::from_entities(vec![parent]).expect("self reference");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_rejects_duplicate_plural_names() {
        let other = EntityMetadata::new("account_alias", "accounts")
            .with_field(FieldDescriptor::new("id", "guid"));
        let err = MetadataRegistry::from_entities(vec![account(), other]).expect_err("must fail");
        assert!(err.to_string().contains("duplicate plural name"));
    }

    #[test]
    fn test_from_toml_str() {
        let registry = MetadataRegistry::from_toml_str(
            r#"
            [[entities]]
            name = "account"
            plural_name = "accounts"
            importable = true

            [[entities.fields]]
            name = "id"
            type = "guid"
            read_only = true

            [[entities.fields]]
            name = "name"
            type = "string"
            "#,
        )
        .expect("parse registry");

        let account = registry.get_by_name("account").expect("account");
        assert!(account.importable);
        assert_eq!(account.fields.len(), 2);
    }
}
