//! CLI command implementations.
//!
//! Argument parsing lives in the binary; the functions here do the work and
//! return values or rendered text, so they can be tested without a terminal.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `routes` | List the derived import routes |
//! | `template` | Write an import template to disk |
//! | `job create` | Create an import job from a file and dispatch it |
//! | `job show` / `job list` | Inspect jobs |
//! | `job retry` | Reset a finished job and dispatch it again |
//! | `job runner-update` | Record a status reported by the runner |
//! | `serve` | Run the HTTP surface (feature `http`) |
//!
//! # Example Usage
//!
//! ```bash
//! metaport routes
//! metaport template contact --format xlsx
//! metaport job create contact --organization acme contacts.csv
//! metaport job runner-update 0b1c... failed --result report.csv
//! metaport job retry 0b1c...
//! ```

mod job;
mod routes;
mod serve;
mod template;

pub use job::{create_job, list_jobs, render_job, render_jobs, retry_job, runner_update, show_job};
pub use routes::render_routes;
pub use serve::serve;
pub use template::write_template;

use crate::{Error, Result};
use std::str::FromStr;

/// Output format of listing commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable table.
    #[default]
    Text,
    /// JSON document.
    Json,
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" | "table" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(Error::InvalidInput(format!("unknown output format: {s}"))),
        }
    }
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(|e| Error::operation("render_json", e))
}
