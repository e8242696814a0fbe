//! Template CLI command.

use crate::services::ImportService;
use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// Generates the template of `entity` and writes it to `output`, or to the
/// translated download filename inside `dir` when no output is given.
///
/// Returns the written path.
///
/// # Errors
///
/// Returns the generation error, or an error if the file cannot be written.
pub fn write_template(
    imports: &ImportService,
    entity: &str,
    format: &str,
    output: Option<&Path>,
    dir: &Path,
) -> Result<PathBuf> {
    let template = imports.download_template(entity, format)?;
    let target = output.map_or_else(|| dir.join(&template.filename), Path::to_path_buf);

    std::fs::write(&target, &template.bytes)
        .map_err(|e| Error::operation("write_template", format!("{}: {e}", target.display())))?;
    tracing::info!(path = %target.display(), bytes = template.bytes.len(), "Wrote import template");
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{JobStoreBackend, MetaportConfig};
    use crate::services::{MpscRunChannel, ServiceContainer};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn imports(dir: &TempDir) -> ImportService {
        let metadata = dir.path().join("metadata.json");
        std::fs::write(
            &metadata,
            r#"{"entities": [{"name": "contact", "plural_name": "contacts", "importable": true,
                "fields": [{"name": "id", "type": "guid", "read_only": true}]}]}"#,
        )
        .expect("metadata");
        let mut config = MetaportConfig::new()
            .with_data_dir(dir.path().join("data"))
            .with_metadata_path(metadata);
        config.job_store = JobStoreBackend::Memory;
        let (channel, _runs) = MpscRunChannel::new();
        ServiceContainer::from_config(config, Arc::new(channel))
            .expect("container")
            .imports
    }

    #[test]
    fn test_writes_translated_filename_by_default() {
        let dir = TempDir::new().expect("tempdir");
        let path = write_template(&imports(&dir), "contact", "csv", None, dir.path())
            .expect("template");

        assert_eq!(path, dir.path().join("Import template - contact.csv"));
        let text = std::fs::read_to_string(path).expect("read");
        assert!(text.starts_with("id\n"));
    }

    #[test]
    fn test_explicit_output_path() {
        let dir = TempDir::new().expect("tempdir");
        let output = dir.path().join("out.xlsx");
        let path = write_template(&imports(&dir), "contact", "xlsx", Some(&output), dir.path())
            .expect("template");

        assert_eq!(path, output);
        let bytes = std::fs::read(&output).expect("read");
        assert!(bytes.starts_with(b"PK"));
    }
}
