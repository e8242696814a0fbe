//! Import template generation.
//!
//! A template has one column per importable child of an entity type, in name
//! order. Row 1 holds the child names with an annotation describing the
//! column, row 3 the `DATA EXAMPLE` marker and rows 4 to 6 synthesized
//! example values. Association columns show example values of the target
//! type's identifier, which is what the importer expects in that column.

use super::examples::ExampleValueSynthesizer;
use crate::io::sheet::EXAMPLE_ROW_COUNT;
use crate::io::{CellValue, Format, TemplateColumn, TemplateSheet};
use crate::metadata::MetadataRegistry;
use crate::models::{ChildMetadata, EntityMetadata, TypeTag};
use crate::translation::{TEMPLATE_FILENAME_KEY, Translator};
use crate::{Error, Result};
use chrono::{DateTime, Local};
use rand::RngCore;
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

/// Cache directives of every template response.
pub const TEMPLATE_CACHE_CONTROL: &str = "private, no-cache, must-revalidate";

/// A generated template, ready to be sent as an attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateFile {
    /// Serialized template.
    pub bytes: Vec<u8>,
    /// Translated download filename.
    pub filename: String,
    /// Output format.
    pub format: Format,
    /// MIME type of `format`.
    pub content_type: &'static str,
    /// Cache-Control header value.
    pub cache_control: &'static str,
}

impl TemplateFile {
    /// Returns the `Content-Disposition` header value.
    ///
    /// Header values must be ASCII; other characters become `?` and double
    /// quotes are dropped.
    #[must_use]
    pub fn content_disposition(&self) -> String {
        let ascii: String = self
            .filename
            .chars()
            .filter(|c| *c != '"')
            .map(|c| if c.is_ascii() && !c.is_ascii_control() { c } else { '?' })
            .collect();
        format!("attachment;filename=\"{ascii}\"")
    }
}

/// Builds import templates from entity metadata.
#[derive(Clone)]
pub struct TemplateGenerator {
    registry: Arc<MetadataRegistry>,
    translator: Arc<dyn Translator>,
    synthesizer: ExampleValueSynthesizer,
}

impl TemplateGenerator {
    /// Creates a generator.
    #[must_use]
    pub fn new(registry: Arc<MetadataRegistry>, translator: Arc<dyn Translator>) -> Self {
        Self {
            registry,
            translator,
            synthesizer: ExampleValueSynthesizer::new(),
        }
    }

    /// Generates the template of `type_name` in `format` (`csv`, `ods`,
    /// `xls` or `xlsx`).
    ///
    /// Nothing is returned unless the whole file was serialized.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if the entity type is unknown.
    /// - [`Error::UnsupportedFormat`] if the format is not supported.
    /// - [`Error::Internal`] if building or serializing the sheet fails.
    #[instrument(skip(self), fields(entity = %type_name, format = %format))]
    pub fn generate(&self, type_name: &str, format: &str) -> Result<TemplateFile> {
        let started = Instant::now();
        let meta = self.registry.get_by_name(type_name)?;
        let format: Format = format.parse()?;

        let sheet = self.build_sheet(meta)?;
        let bytes = format.writer().write(&sheet)?;

        let filename = self.filename(meta, format.extension());
        metrics::counter!("import_templates_generated_total", "format" => format.extension())
            .increment(1);
        metrics::histogram!("import_template_generation_duration_ms")
            .record(started.elapsed().as_secs_f64() * 1000.0);
        tracing::info!(columns = sheet.len(), bytes = bytes.len(), "Generated import template");

        Ok(TemplateFile {
            bytes,
            filename,
            format,
            content_type: format.mime_type(),
            cache_control: TEMPLATE_CACHE_CONTROL,
        })
    }

    /// Returns the translated download filename for `meta`.
    #[must_use]
    pub fn filename(&self, meta: &EntityMetadata, extension: &str) -> String {
        let label = self
            .translator
            .trans(meta.label(), &[], meta.translation_domain.as_deref());
        self.translator.trans(
            TEMPLATE_FILENAME_KEY,
            &[("metadata", label.as_str()), ("ext", extension)],
            None,
        )
    }

    /// Builds the sheet of `meta` with the thread RNG and the local clock.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Internal`] if an association target cannot be resolved.
    pub fn build_sheet(&self, meta: &EntityMetadata) -> Result<TemplateSheet> {
        let now = Local::now().fixed_offset();
        self.build_sheet_with(meta, &mut rand::thread_rng(), &now)
    }

    /// Builds the sheet of `meta` from an explicit RNG and clock.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Internal`] if an association target cannot be resolved.
    pub fn build_sheet_with<R, Tz>(
        &self,
        meta: &EntityMetadata,
        rng: &mut R,
        now: &DateTime<Tz>,
    ) -> Result<TemplateSheet>
    where
        R: RngCore + ?Sized,
        Tz: chrono::TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        let mut children = meta.children();
        children.sort_by(|a, b| a.name().cmp(b.name()));

        let mut sheet = TemplateSheet::new();
        for child in children {
            if child.is_read_only() && child.name() != meta.identifier {
                continue;
            }

            let example_tag = self.example_tag(&child)?;
            let examples: Vec<CellValue> = (0..EXAMPLE_ROW_COUNT)
                .map(|_| self.synthesizer.synthesize_with(example_tag, rng, now))
                .collect();
            sheet.push(TemplateColumn::new(
                child.name(),
                self.annotation(&child),
                examples,
            ));
        }
        Ok(sheet)
    }

    /// Type tag the examples of `child` are synthesized from.
    fn example_tag<'a>(&'a self, child: &ChildMetadata<'a>) -> Result<&'a TypeTag> {
        match child {
            ChildMetadata::Field(field) => Ok(&field.common.type_tag),
            ChildMetadata::Association(association) => {
                let target = self
                    .registry
                    .get_by_name(&association.target)
                    .map_err(|e| Error::internal("resolve_association_target", e))?;
                target
                    .identifier_field()
                    .map(|field| &field.common.type_tag)
                    .ok_or_else(|| {
                        Error::internal(
                            "resolve_association_target",
                            format!("{} has no identifier field", target.name),
                        )
                    })
            },
        }
    }

    fn annotation(&self, child: &ChildMetadata<'_>) -> String {
        let label = self.translator.trans(
            child.label(),
            &[],
            child.common().translation_domain.as_deref(),
        );
        format!(
            "{label}\n[{} Type: {}]",
            child.kind_label(),
            child.type_tag()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AssociationDescriptor, FieldDescriptor};
    use crate::translation::CatalogTranslator;
    use chrono::{TimeZone, Utc};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn registry() -> Arc<MetadataRegistry> {
        let contact = EntityMetadata::new("contact", "contacts")
            .importable()
            .with_field(FieldDescriptor::new("id", "guid").read_only())
            .with_field(FieldDescriptor::new("email", "string").with_label("contact.email"))
            .with_field(FieldDescriptor::new("created_at", "datetime").read_only())
            .with_field(FieldDescriptor::new("age", "integer"))
            .with_association(AssociationDescriptor::new("account", "account"));
        let account = EntityMetadata::new("account", "accounts")
            .with_field(FieldDescriptor::new("id", "integer").read_only());
        Arc::new(MetadataRegistry::from_entities(vec![contact, account]).expect("registry"))
    }

    fn generator() -> TemplateGenerator {
        let mut catalog = CatalogTranslator::new();
        catalog.insert("messages", "contact.email", "E-mail");
        catalog.insert("messages", "contact", "Contact");
        TemplateGenerator::new(registry(), Arc::new(catalog))
    }

    fn sheet() -> TemplateSheet {
        let generator = generator();
        let meta = generator.registry.get_by_name("contact").expect("meta").clone();
        let now = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).single().expect("time");
        generator
            .build_sheet_with(&meta, &mut StdRng::seed_from_u64(1), &now)
            .expect("sheet")
    }

    #[test]
    fn test_columns_sorted_and_filtered() {
        assert_eq!(sheet().headers(), vec!["account", "age", "email", "id"]);
    }

    #[test]
    fn test_annotations() {
        let sheet = sheet();
        assert_eq!(sheet.columns[2].annotation, "E-mail\n[Field Type: string]");
        assert_eq!(sheet.columns[0].annotation, "account\n[Association Type: many_to_one]");
    }

    #[test]
    fn test_association_examples_use_target_identifier() {
        let sheet = sheet();
        assert_eq!(sheet.columns[0].examples.len(), 3);
        assert!(
            sheet.columns[0]
                .examples
                .iter()
                .all(|v| matches!(v, CellValue::Integer(1..=10_000)))
        );
    }

    #[test]
    fn test_generate_unknown_type() {
        let err = generator().generate("Unknown", "csv").expect_err("unknown");
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn test_generate_unsupported_format() {
        let err = generator().generate("contact", "pdf").expect_err("pdf");
        assert!(matches!(err, Error::UnsupportedFormat(ref f) if f == "pdf"));
    }

    #[test]
    fn test_generate_csv_file() {
        let file = generator().generate("contact", "CSV").expect("csv");
        assert_eq!(file.filename, "Import template - Contact.csv");
        assert_eq!(file.content_type, "text/csv");
        assert_eq!(file.cache_control, "private, no-cache, must-revalidate");
        assert_eq!(
            file.content_disposition(),
            "attachment;filename=\"Import template - Contact.csv\""
        );
        let text = String::from_utf8(file.bytes).expect("utf8");
        assert!(text.starts_with("account,age,email,id"));
        assert!(text.contains("DATA EXAMPLE"));
    }

    #[test]
    fn test_content_disposition_is_ascii() {
        let file = TemplateFile {
            bytes: Vec::new(),
            filename: "Modèle \"contacts\".xlsx".to_string(),
            format: Format::Xlsx,
            content_type: Format::Xlsx.mime_type(),
            cache_control: TEMPLATE_CACHE_CONTROL,
        };
        assert_eq!(
            file.content_disposition(),
            "attachment;filename=\"Mod?le contacts.xlsx\""
        );
    }

    #[test]
    fn test_missing_association_target_is_internal() {
        let generator = generator();
        let orphan = EntityMetadata::new("note", "notes")
            .with_field(FieldDescriptor::new("id", "guid"))
            .with_association(AssociationDescriptor::new("owner", "ghost"));
        let err = generator.build_sheet(&orphan).expect_err("unresolvable");
        assert!(matches!(err, Error::Internal { .. }));
    }
}
