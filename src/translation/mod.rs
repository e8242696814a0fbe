//! Message translation.
//!
//! Labels in entity metadata are translation keys. A [`Translator`] resolves
//! a key within a domain and substitutes `{placeholder}` parameters. Unknown
//! keys translate to themselves, so metadata without a catalog still renders
//! readable (if untranslated) labels.
//!
//! Catalog files are TOML, one table per domain:
//!
//! ```toml
//! [messages]
//! "contact.email" = "E-mail address"
//!
//! [exceptions]
//! "import.not_found" = "Nothing here"
//! ```

use crate::{Error, Result};
use std::collections::HashMap;
use std::path::Path;

/// Domain used when a label declares none.
pub const DEFAULT_DOMAIN: &str = "messages";

/// Domain of user-facing error messages.
pub const EXCEPTIONS_DOMAIN: &str = "exceptions";

/// Key of the template download filename.
pub const TEMPLATE_FILENAME_KEY: &str = "metadata.import.template_file.filename";

const BUILTIN_MESSAGES: &[(&str, &str, &str)] = &[
    (
        DEFAULT_DOMAIN,
        TEMPLATE_FILENAME_KEY,
        "Import template - {metadata}.{ext}",
    ),
    (
        EXCEPTIONS_DOMAIN,
        "import.not_found",
        "The requested resource does not exist",
    ),
    (
        EXCEPTIONS_DOMAIN,
        "import.invalid_format",
        "The format \"{format}\" is not supported",
    ),
    (
        EXCEPTIONS_DOMAIN,
        "import.access_denied",
        "You are not allowed to perform this action",
    ),
    (
        EXCEPTIONS_DOMAIN,
        "import.invalid_input",
        "The request is invalid: {reason}",
    ),
    (
        EXCEPTIONS_DOMAIN,
        "import.error",
        "An error occurred while processing the import",
    ),
];

/// Translation boundary.
pub trait Translator: Send + Sync {
    /// Translates `key` in `domain` (default domain when `None`), replacing
    /// each `{name}` with its value from `params`.
    fn trans(&self, key: &str, params: &[(&str, &str)], domain: Option<&str>) -> String;
}

/// In-memory message catalog keyed by domain then message key.
#[derive(Debug, Clone)]
pub struct CatalogTranslator {
    domains: HashMap<String, HashMap<String, String>>,
}

impl Default for CatalogTranslator {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogTranslator {
    /// Creates a catalog holding the built-in messages.
    #[must_use]
    pub fn new() -> Self {
        let mut catalog = Self {
            domains: HashMap::new(),
        };
        for (domain, key, message) in BUILTIN_MESSAGES {
            catalog.insert(domain, key, message);
        }
        catalog
    }

    /// Adds or replaces one message.
    pub fn insert(&mut self, domain: &str, key: &str, message: &str) {
        self.domains
            .entry(domain.to_string())
            .or_default()
            .insert(key.to_string(), message.to_string());
    }

    /// Merges a TOML catalog over the current messages.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not a table of string tables.
    pub fn merge_toml_str(&mut self, contents: &str) -> Result<()> {
        let parsed: HashMap<String, HashMap<String, String>> =
            toml::from_str(contents).map_err(|e| Error::operation("parse_translations", e))?;
        for (domain, messages) in parsed {
            for (key, message) in messages {
                self.insert(&domain, &key, &message);
            }
        }
        Ok(())
    }

    /// Loads the built-in messages overlaid with a catalog file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::operation("read_translations", format!("{}: {e}", path.display()))
        })?;
        let mut catalog = Self::new();
        catalog.merge_toml_str(&contents)?;
        tracing::debug!(path = %path.display(), "Loaded translation catalog");
        Ok(catalog)
    }
}

impl Translator for CatalogTranslator {
    fn trans(&self, key: &str, params: &[(&str, &str)], domain: Option<&str>) -> String {
        let template = self
            .domains
            .get(domain.unwrap_or(DEFAULT_DOMAIN))
            .and_then(|messages| messages.get(key))
            .map_or(key, String::as_str);
        substitute(template, params)
    }
}

/// Replaces `{name}` placeholders; unknown placeholders are left as is.
fn substitute(template: &str, params: &[(&str, &str)]) -> String {
    params
        .iter()
        .fold(template.to_string(), |acc, (name, value)| {
            acc.replace(&format!("{{{name}}}"), value)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_key_falls_back_to_key() {
        let translator = CatalogTranslator::new();
        assert_eq!(translator.trans("contact.email", &[], None), "contact.email");
        assert_eq!(
            translator.trans("contact.email", &[], Some("crm")),
            "contact.email"
        );
    }

    #[test]
    fn test_builtin_filename_substitution() {
        let translator = CatalogTranslator::new();
        let name = translator.trans(
            TEMPLATE_FILENAME_KEY,
            &[("metadata", "Contact"), ("ext", "xlsx")],
            None,
        );
        assert_eq!(name, "Import template - Contact.xlsx");
    }

    #[test]
    fn test_merge_overrides_and_adds_domains() {
        let mut translator = CatalogTranslator::new();
        translator
            .merge_toml_str(
                r#"
                [messages]
                "contact.email" = "E-mail"

                [crm]
                "contact.label" = "Contact person"

                [exceptions]
                "import.not_found" = "Nothing here"
                "#,
            )
            .expect("merge");

        assert_eq!(translator.trans("contact.email", &[], None), "E-mail");
        assert_eq!(
            translator.trans("contact.label", &[], Some("crm")),
            "Contact person"
        );
        assert_eq!(
            translator.trans("import.not_found", &[], Some(EXCEPTIONS_DOMAIN)),
            "Nothing here"
        );
    }

    #[test]
    fn test_unused_placeholders_are_kept() {
        assert_eq!(substitute("{a} and {b}", &[("a", "x")]), "x and {b}");
    }
}
