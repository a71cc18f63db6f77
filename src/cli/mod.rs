//! # CLI Module
//!
//! Command-line interface for the code generator.
//!
//! ## Commands
//!
//! ### `generate`
//!
//! Run a template group against one or more tables and print the batch
//! result as JSON:
//!
//! ```bash
//! omnigen generate --catalog catalog.yaml --database sqlite://app.db \
//!     --table user,order_item --group 1
//! ```
//!
//! Options:
//! - `--llm` - use template prompts and the active LLM provider
//! - `--workers <N>` / `--llm-workers <N>` - worker pool sizes
//! - `--fail-on-error` - exit non-zero if any unit failed
//!
//! ### `preview`
//!
//! Render one template to stdout without writing files:
//!
//! ```bash
//! omnigen preview --catalog catalog.yaml --template 10 --database schemas/ --table user
//! omnigen preview --catalog catalog.yaml --template 10 --context ctx.json
//! ```
//!
//! ### `inspect` / `tables`
//!
//! Print an introspected table schema, or the list of tables:
//!
//! ```bash
//! omnigen inspect --database sqlite://app.db --table user
//! omnigen tables --database postgres://app@localhost/shop
//! ```
//!
//! ### `activate`
//!
//! Make one provider the active LLM configuration:
//!
//! ```bash
//! omnigen activate --catalog catalog.yaml --provider 2
//! ```
//!
//! ### `sync-ollama`
//!
//! Register every model pulled into a local Ollama server as a provider:
//!
//! ```bash
//! omnigen sync-ollama --catalog catalog.yaml --host http://localhost:11434
//! ```
//!
//! `--catalog` and `--database` also read `OMNIGEN_CATALOG` and
//! `OMNIGEN_DATABASE`.

mod commands;


pub use commands::{run_cli, run_command, Cli, Commands};
