//! Derivation of default import actions from entity metadata.
//!
//! For every importable entity type the deriver produces the `import` action
//! the routing layer mounts: `POST /{organization}/import/{plural}` bound to
//! the generic import handler. Anything already configured upstream wins.

use crate::config::DEFAULT_ADAPTER;
use crate::metadata::MetadataRegistry;
use crate::models::{ActionConfig, ActionHandler, EntityMetadata, HttpMethod};

/// Name of the derived action.
pub const IMPORT_ACTION: &str = "import";

/// Route priority of derived import actions.
///
/// Negative so explicitly declared routes on the same prefix match first.
pub const IMPORT_PRIORITY: i32 = -50;

/// Derives import action configurations.
#[derive(Debug, Clone)]
pub struct ActionConfigDeriver {
    default_adapter: String,
}

impl Default for ActionConfigDeriver {
    fn default() -> Self {
        Self::new(DEFAULT_ADAPTER)
    }
}

impl ActionConfigDeriver {
    /// Creates a deriver recording `default_adapter` on actions that name none.
    #[must_use]
    pub fn new(default_adapter: impl Into<String>) -> Self {
        Self {
            default_adapter: default_adapter.into(),
        }
    }

    /// Derives the import action for `meta`.
    ///
    /// Returns `None` when the type is not importable, default actions are
    /// disabled, or `import` is excluded. An explicitly declared `import`
    /// action is used as the base of the merge.
    #[must_use]
    pub fn derive(&self, meta: &EntityMetadata) -> Option<ActionConfig> {
        if !meta.importable
            || !meta.build_default_actions
            || meta.excluded_default_actions.contains(IMPORT_ACTION)
        {
            return None;
        }

        let base = meta
            .actions
            .get(IMPORT_ACTION)
            .cloned()
            .unwrap_or_else(|| ActionConfig::new(IMPORT_ACTION));
        Some(self.guess_import(meta, base))
    }

    /// Fills the unset parts of an import action.
    ///
    /// Pure and idempotent: `guess_import(m, guess_import(m, c)) ==
    /// guess_import(m, c)`.
    #[must_use]
    pub fn guess_import(&self, meta: &EntityMetadata, mut config: ActionConfig) -> ActionConfig {
        if config.name.is_empty() {
            config.name = IMPORT_ACTION.to_string();
        }
        config.action_kind = Some(IMPORT_ACTION.to_string());
        config.target_type = Some(meta.name.clone());
        config.priority = Some(IMPORT_PRIORITY);

        if config.methods.is_empty() {
            config.methods = vec![HttpMethod::Post];
        }
        if config.path.is_none() {
            config.path = Some(import_path(meta));
        }
        if config.handler.is_none() {
            config.handler = Some(ActionHandler::ImportRequest);
        }
        if config.import_adapter.is_none() {
            config.import_adapter = Some(self.default_adapter.clone());
        }
        config
    }

    /// Derives import actions for every registered type, highest priority
    /// first, then by path.
    #[must_use]
    pub fn derive_all(&self, registry: &MetadataRegistry) -> Vec<ActionConfig> {
        let mut actions: Vec<ActionConfig> =
            registry.iter().filter_map(|m| self.derive(m)).collect();
        actions.sort_by(|a, b| {
            b.effective_priority()
                .cmp(&a.effective_priority())
                .then_with(|| a.path.cmp(&b.path))
        });
        tracing::debug!(count = actions.len(), "Derived import actions");
        actions
    }
}

/// Default route of the import action of `meta`.
#[must_use]
pub fn import_path(meta: &EntityMetadata) -> String {
    format!("/{{organization}}/import/{}", meta.plural_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FieldDescriptor;

    fn entity(name: &str, plural: &str) -> EntityMetadata {
        EntityMetadata::new(name, plural).with_field(FieldDescriptor::new("id", "guid").read_only())
    }

    fn contact() -> EntityMetadata {
        entity("contact", "contacts").importable()
    }

    #[test]
    fn test_derive_defaults() {
        let config = ActionConfigDeriver::default()
            .derive(&contact())
            .expect("importable");

        assert_eq!(config.name, "import");
        assert_eq!(config.methods, vec![HttpMethod::Post]);
        assert_eq!(config.path.as_deref(), Some("/{organization}/import/contacts"));
        assert_eq!(config.handler, Some(ActionHandler::ImportRequest));
        assert_eq!(config.action_kind.as_deref(), Some("import"));
        assert_eq!(config.target_type.as_deref(), Some("contact"));
        assert_eq!(config.priority, Some(-50));
        assert_eq!(config.import_adapter.as_deref(), Some("spreadsheet"));
    }

    #[test]
    fn test_derive_skips_non_importable_and_excluded() {
        let deriver = ActionConfigDeriver::default();
        assert!(deriver.derive(&EntityMetadata::new("tag", "tags")).is_none());
        assert!(deriver.derive(&contact().excluding_action("import")).is_none());

        let mut no_defaults = contact();
        no_defaults.build_default_actions = false;
        assert!(deriver.derive(&no_defaults).is_none());
    }

    #[test]
    fn test_explicit_configuration_is_kept() {
        let mut meta = contact();
        let mut explicit = ActionConfig::new("import");
        explicit.methods = vec![HttpMethod::Put];
        explicit.path = Some("/legacy/contacts/upload".to_string());
        explicit.handler = Some(ActionHandler::Named("legacy_upload".to_string()));
        explicit.import_adapter = Some("legacy_csv".to_string());
        meta.actions.insert("import".to_string(), explicit);

        let config = ActionConfigDeriver::default().derive(&meta).expect("derived");
        assert_eq!(config.methods, vec![HttpMethod::Put]);
        assert_eq!(config.path.as_deref(), Some("/legacy/contacts/upload"));
        assert_eq!(
            config.handler,
            Some(ActionHandler::Named("legacy_upload".to_string()))
        );
        assert_eq!(config.import_adapter.as_deref(), Some("legacy_csv"));
        assert_eq!(config.priority, Some(IMPORT_PRIORITY));
    }

    #[test]
    fn test_guess_import_is_idempotent() {
        let deriver = ActionConfigDeriver::new("xlsx_mapping");
        let meta = contact();
        let once = deriver.guess_import(&meta, ActionConfig::default());
        let twice = deriver.guess_import(&meta, once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_derive_all_orders_by_path() {
        let registry = MetadataRegistry::from_entities(vec![
            entity("product", "products").importable(),
            contact(),
            entity("tag", "tags"),
        ])
        .expect("registry");

        let paths: Vec<String> = ActionConfigDeriver::default()
            .derive_all(&registry)
            .into_iter()
            .filter_map(|c| c.path)
            .collect();
        assert_eq!(
            paths,
            vec![
                "/{organization}/import/contacts",
                "/{organization}/import/products"
            ]
        );
    }
}
