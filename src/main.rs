//! Binary entry point for metaport.
//!
//! This binary provides the CLI for metadata-driven import jobs and templates.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow needless_pass_by_value for command functions
#![allow(clippy::needless_pass_by_value)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use anyhow::Context;
use clap::{Parser, Subcommand};
use metaport::cli::{self, OutputFormat};
use metaport::config::MetaportConfig;
use metaport::observability::{self, ObservabilityConfig};
use metaport::services::{ServiceContainer, SpoolRunChannel};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

/// Metaport - metadata-driven bulk imports and spreadsheet templates.
#[derive(Parser)]
#[command(name = "metaport")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// List the import routes derived from entity metadata.
    Routes {
        /// Output format: text or json.
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Write an import template for an entity type.
    Template {
        /// Entity type name.
        entity: String,

        /// File format: csv, ods, xls or xlsx.
        #[arg(short, long, default_value = "xlsx")]
        format: String,

        /// Output file (default: the translated template filename).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Manage import jobs.
    Job {
        /// Job subcommand.
        #[command(subcommand)]
        action: JobAction,
    },

    /// Run the HTTP surface.
    Serve {
        /// Port to listen on (default: from configuration).
        #[arg(short, long)]
        port: Option<u16>,
    },
}

/// Job subcommands.
#[derive(Subcommand)]
enum JobAction {
    /// Create an import job from a file.
    Create {
        /// Entity type name.
        entity: String,

        /// File to import; its extension selects the format.
        file: PathBuf,

        /// Organization the job belongs to.
        #[arg(short, long, default_value = "")]
        organization: String,

        /// Output format: text or json.
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show one job.
    Show {
        /// Job id.
        id: String,

        /// Output format: text or json.
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// List the newest jobs.
    List {
        /// Maximum number of jobs.
        #[arg(short, long, default_value = "20")]
        limit: usize,

        /// Output format: text or json.
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Reset a finished job and dispatch it again.
    Retry {
        /// Job id.
        id: String,
    },

    /// Record a status reported by the runner.
    RunnerUpdate {
        /// Job id.
        id: String,

        /// New status: running, succeeded or failed.
        status: String,

        /// Path of the run report in the content store.
        #[arg(short, long)]
        result: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };

    if let Err(e) = observability::init(&ObservabilityConfig::from_config(&config, cli.verbose)) {
        eprintln!("Failed to initialize observability: {e}");
        return ExitCode::FAILURE;
    }

    match run_command(cli.command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        },
    }
}

/// Runs the selected command.
async fn run_command(command: Commands, config: MetaportConfig) -> anyhow::Result<()> {
    let channel = Arc::new(SpoolRunChannel::new(config.run_spool_path()));
    let container =
        ServiceContainer::from_config(config, channel).context("failed to build services")?;

    match command {
        Commands::Routes { format } => {
            let format: OutputFormat = format.parse()?;
            print!(
                "{}",
                cli::render_routes(&container.registry, &container.deriver, format)?
            );
        },
        Commands::Template {
            entity,
            format,
            output,
        } => {
            let path = cli::write_template(
                &container.imports,
                &entity,
                &format,
                output.as_deref(),
                Path::new("."),
            )?;
            println!("{}", path.display());
        },
        Commands::Job { action } => run_job(&container, action)?,
        Commands::Serve { port } => {
            let port = port.unwrap_or(container.config.port);
            cli::serve(&container, port).await?;
        },
    }
    Ok(())
}

/// Runs a job subcommand.
fn run_job(container: &ServiceContainer, action: JobAction) -> anyhow::Result<()> {
    match action {
        JobAction::Create {
            entity,
            file,
            organization,
            format,
        } => {
            let format: OutputFormat = format.parse()?;
            let job = cli::create_job(container, &entity, &organization, &file)?;
            print!("{}", cli::render_job(&job, format)?);
        },
        JobAction::Show { id, format } => {
            let format: OutputFormat = format.parse()?;
            print!("{}", cli::render_job(&cli::show_job(container, &id)?, format)?);
        },
        JobAction::List { limit, format } => {
            let format: OutputFormat = format.parse()?;
            print!("{}", cli::render_jobs(&cli::list_jobs(container, limit)?, format)?);
        },
        JobAction::Retry { id } => {
            let job = cli::retry_job(container, &id)?;
            println!("{} {}", job.id, job.status);
        },
        JobAction::RunnerUpdate { id, status, result } => {
            let job = cli::runner_update(container, &id, &status, result.as_deref())?;
            println!("{} {}", job.id, job.status);
        },
    }
    Ok(())
}

/// Loads configuration from an explicit path, `METAPORT_CONFIG`, or the
/// default locations, then applies environment overrides.
fn load_config(path: Option<&str>) -> metaport::Result<MetaportConfig> {
    if let Some(config_path) = path {
        return MetaportConfig::load_from_file(Path::new(config_path))
            .map(MetaportConfig::with_env_overrides);
    }

    if let Ok(config_path) = std::env::var("METAPORT_CONFIG") {
        if !config_path.trim().is_empty() {
            return MetaportConfig::load_from_file(Path::new(&config_path))
                .map(MetaportConfig::with_env_overrides);
        }
    }

    Ok(MetaportConfig::load_default().with_env_overrides())
}
