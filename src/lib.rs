//! # omnigen
//!
//! **omnigen** generates source files from relational table schemas using
//! user-authored [MiniJinja](https://docs.rs/minijinja) templates, with an
//! optional LLM path that sends a rendered prompt to an OpenAI-compatible
//! chat-completion endpoint instead.
//!
//! ## Architecture
//!
//! - **[`introspect`]** - reads table schemas from SQLite, MySQL,
//!   PostgreSQL or schema snapshot files
//! - **[`catalog`]** - template groups and LLM provider configurations
//! - **[`ollama`]** - registers a local Ollama server's models as providers
//! - **[`generator`]** - identifier filters, template rendering, path
//!   templating, the LLM fallback and the batch orchestrator
//! - **[`worker_pool`]** - bounded pools generation units run on
//! - **[`runtime_config`]** / **[`logging`]** - environment-driven settings
//! - **[`cli`]** - the `omnigen` command line
//!
//! ### Generation Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant CLI as CLI<br/>(omnigen generate)
//!     participant Catalog as catalog::Catalog
//!     participant Source as introspect::SchemaSource
//!     participant Gen as generator::Generator
//!     participant LLM as Chat provider
//!     participant FS as File System
//!
//!     CLI->>Catalog: load(catalog.yaml)
//!     CLI->>Gen: generate(source, tables, group, use_llm)
//!     Gen->>Catalog: group_templates(group)
//!     Gen->>Source: table_schema(t) for every table
//!     loop every (table, template)
//!         alt use_llm and template has a prompt
//!             Gen->>LLM: rendered prompt
//!             LLM-->>Gen: sanitized code
//!         else
//!             Gen->>Gen: render template body
//!         end
//!         Gen->>Gen: render relative path (literal on failure)
//!         Gen->>FS: write artifact
//!     end
//!     Gen-->>CLI: BatchResult
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use omnigen::catalog::Catalog;
//! use omnigen::generator::{Generator, HttpChatClient};
//! use omnigen::introspect::Connection;
//! use omnigen::runtime_config::RuntimeConfig;
//! use std::path::Path;
//!
//! # fn main() -> anyhow::Result<()> {
//! let catalog = Catalog::load(Path::new("catalog.yaml"))?;
//! let source = Connection::parse("sqlite://app.db").open()?;
//! let config = RuntimeConfig::from_env();
//! let client = HttpChatClient::new(config.llm_timeout)?;
//!
//! let batch = Generator::new(&catalog, &catalog, &client)
//!     .with_config(config)
//!     .generate(source.as_ref(), &["user".to_string()], 1, false)?;
//! println!("{}", serde_json::to_string_pretty(&batch)?);
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod cli;
pub mod generator;
pub mod introspect;
pub mod logging;
pub mod ollama;
pub mod runtime_config;
pub mod worker_pool;

pub use catalog::{Catalog, TemplateSpec};
pub use generator::{BatchResult, Generator};
