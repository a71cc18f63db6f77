use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use crate::catalog::Catalog;
use crate::generator::{render_single, Generator, HttpChatClient, RenderContext};
use crate::introspect::Connection;
use crate::ollama::{self, DEFAULT_OLLAMA_HOST};
use crate::runtime_config::RuntimeConfig;

/// Listing pulled models is quick; a server that takes longer is stuck.
const SYNC_TIMEOUT: Duration = Duration::from_secs(30);

/// Command-line interface for omnigen
///
/// Generates source files from database table schemas using user-authored
/// MiniJinja templates, optionally through an LLM provider.
#[derive(Parser)]
#[command(name = "omnigen")]
#[command(about = "Schema-driven code generator", long_about = None)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Generate every template of a group for the given tables
    Generate {
        /// Catalog file holding template groups and LLM providers
        #[arg(short, long, env = "OMNIGEN_CATALOG")]
        catalog: PathBuf,

        /// `sqlite:`, `mysql:` or `postgres:` URL, or a directory of schema snapshots
        #[arg(short, long, env = "OMNIGEN_DATABASE")]
        database: String,

        /// Tables to generate for (comma-separated or repeated)
        #[arg(short, long, required = true, num_args = 1.., value_delimiter = ',')]
        table: Vec<String>,

        /// Template group id
        #[arg(short, long)]
        group: i64,

        /// Use the template prompts and the active LLM provider
        #[arg(long, default_value_t = false)]
        llm: bool,

        /// Render worker threads (overrides OMNIGEN_WORKERS)
        #[arg(long)]
        workers: Option<usize>,

        /// LLM worker threads (overrides OMNIGEN_LLM_WORKERS)
        #[arg(long)]
        llm_workers: Option<usize>,

        /// Exit with an error if any unit failed to generate or write
        #[arg(long, default_value_t = false)]
        fail_on_error: bool,
    },
    /// Render a single template without writing files
    ///
    /// The context comes from a live table (`--database` and `--table`), a
    /// JSON file (`--context`), or is empty.
    Preview {
        /// Catalog file holding the template
        #[arg(short, long, env = "OMNIGEN_CATALOG")]
        catalog: PathBuf,

        /// Template id
        #[arg(long)]
        template: i64,

        /// JSON file used as the render context
        #[arg(long, conflicts_with = "table")]
        context: Option<PathBuf>,

        /// `sqlite:`, `mysql:` or `postgres:` URL, or a directory of schema snapshots
        #[arg(short, long, env = "OMNIGEN_DATABASE")]
        database: Option<String>,

        /// Table whose schema is the render context
        #[arg(short, long, requires = "database")]
        table: Option<String>,
    },
    /// Print the introspected schema of one table
    Inspect {
        /// `sqlite:`, `mysql:` or `postgres:` URL, or a directory of schema snapshots
        #[arg(short, long, env = "OMNIGEN_DATABASE")]
        database: String,

        /// Table name
        #[arg(short, long)]
        table: String,
    },
    /// List the tables of a database
    Tables {
        /// `sqlite:`, `mysql:` or `postgres:` URL, or a directory of schema snapshots
        #[arg(short, long, env = "OMNIGEN_DATABASE")]
        database: String,
    },
    /// Mark one LLM provider active and deactivate the others
    Activate {
        /// Catalog file holding the providers
        #[arg(short, long, env = "OMNIGEN_CATALOG")]
        catalog: PathBuf,

        /// Provider id
        #[arg(short, long)]
        provider: i64,
    },
    /// Register every model of an Ollama server as an LLM provider
    ///
    /// Models that already have an `ollama` provider are skipped. If no
    /// provider is active, the first new one is activated.
    SyncOllama {
        /// Catalog file holding the providers
        #[arg(short, long, env = "OMNIGEN_CATALOG")]
        catalog: PathBuf,

        /// Ollama server address
        #[arg(long, env = "OMNIGEN_OLLAMA_HOST", default_value = DEFAULT_OLLAMA_HOST)]
        host: String,
    },
}

/// Execute the CLI command provided by the user
///
/// # Errors
///
/// Returns an error if the catalog or database cannot be read, the request
/// is invalid (unknown group, missing table), or `--fail-on-error` is set and
/// a unit failed.
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    run_command(&cli.command, &mut out)
}

/// Execute one command, writing its JSON result to `out`.
pub fn run_command(command: &Commands, out: &mut dyn Write) -> Result<()> {
    match command {
        Commands::Generate {
            catalog,
            database,
            table,
            group,
            llm,
            workers,
            llm_workers,
            fail_on_error,
        } => {
            let catalog = Catalog::load(catalog)?;
            let source = Connection::parse(database).open()?;

            let mut config = RuntimeConfig::from_env();
            if let Some(n) = workers {
                config.workers = (*n).max(1);
            }
            if let Some(n) = llm_workers {
                config.llm_workers = (*n).max(1);
            }
            let client = HttpChatClient::new(config.llm_timeout)?;

            let batch = Generator::new(&catalog, &catalog, &client)
                .with_config(config)
                .generate(source.as_ref(), table, *group, *llm)?;
            write_json(out, &batch)?;

            let failed = batch
                .units()
                .filter(|u| u.error().is_some() || u.write_error().is_some())
                .count();
            if *fail_on_error && failed > 0 {
                bail!("{failed} generation unit(s) failed");
            }
            Ok(())
        }
        Commands::Preview {
            catalog,
            template,
            context,
            database,
            table,
        } => {
            let catalog = Catalog::load(catalog)?;
            let context: serde_json::Value = match (context, database, table) {
                (Some(path), _, _) => {
                    let text = fs::read_to_string(path)
                        .with_context(|| format!("Failed to read context: {}", path.display()))?;
                    serde_json::from_str(&text)
                        .with_context(|| format!("Failed to parse context JSON: {}", path.display()))?
                }
                (None, Some(database), Some(table)) => {
                    let schema = Connection::parse(database).open()?.table_schema(table)?;
                    serde_json::to_value(RenderContext::new(&schema))?
                }
                _ => serde_json::json!({}),
            };
            let code = render_single(&catalog, *template, &context)?;
            writeln!(out, "{code}")?;
            Ok(())
        }
        Commands::Inspect { database, table } => {
            let schema = Connection::parse(database).open()?.table_schema(table)?;
            write_json(out, &schema)
        }
        Commands::Tables { database } => {
            let tables = Connection::parse(database).open()?.list_tables()?;
            write_json(out, &tables)
        }
        Commands::Activate { catalog, provider } => {
            let mut loaded = Catalog::read(catalog)?;
            loaded.activate(*provider)?;
            loaded.save(catalog)?;
            info!(provider, catalog = %catalog.display(), "provider activated");
            Ok(())
        }
        Commands::SyncOllama { catalog, host } => {
            let mut loaded = Catalog::read(catalog)?;
            let report = ollama::sync(&mut loaded, host, SYNC_TIMEOUT)?;
            if !report.added.is_empty() {
                loaded.save(catalog)?;
            }
            write_json(out, &report)
        }
    }
}

fn write_json<T: serde::Serialize>(out: &mut dyn Write, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}
