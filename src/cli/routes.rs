//! Routes CLI command.

use super::{OutputFormat, to_json};
use crate::Result;
use crate::metadata::MetadataRegistry;
use crate::services::ActionConfigDeriver;
use std::fmt::Write;

/// Renders the derived import routes, highest priority first.
///
/// # Errors
///
/// Returns an error if JSON rendering fails.
pub fn render_routes(
    registry: &MetadataRegistry,
    deriver: &ActionConfigDeriver,
    format: OutputFormat,
) -> Result<String> {
    let actions = deriver.derive_all(registry);
    if format == OutputFormat::Json {
        return to_json(&actions);
    }

    let mut out = String::new();
    for action in &actions {
        let methods: Vec<&str> = action.methods.iter().map(|m| m.as_str()).collect();
        let _ = writeln!(
            out,
            "{:<8} {:<40} {:<16} priority={} adapter={}",
            methods.join(","),
            action.path.as_deref().unwrap_or("-"),
            action.target_type.as_deref().unwrap_or("-"),
            action.effective_priority(),
            action.import_adapter.as_deref().unwrap_or("-"),
        );
    }
    if actions.is_empty() {
        out.push_str("No importable entity types\n");
    }
    Ok(out)
}
