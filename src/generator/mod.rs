//! # Generator Module
//!
//! Turns table schemas into source files by running a group of templates
//! against every requested table.
//!
//! ## Overview
//!
//! A generation request names some tables and one template group. Every
//! (table, template) pair is a *generation unit*:
//!
//! ```text
//! SchemaSource → TableSchema → RenderContext → template body / LLM prompt → code
//!                                            → relative-path pattern       → file path
//! ```
//!
//! - **Template path** - the template body is rendered with MiniJinja.
//! - **LLM path** - when the caller asks for it and the template carries a
//!   prompt, the prompt is rendered instead and sent to the active
//!   chat-completion provider (see [`llm`]).
//!
//! The code is written to `root_path` + rendered relative path and also
//! returned in the [`BatchResult`].
//!
//! ## Template Context
//!
//! | Key            | Value                                              |
//! |----------------|----------------------------------------------------|
//! | `table_name`   | table name as introspected                         |
//! | `TableName`    | table name in PascalCase                           |
//! | `comment`      | table comment, may be `none`                       |
//! | `columns`      | list of `{name, type, nullable, default, primary_key, comment}` |
//! | `primary_keys` | names of the primary-key columns                   |
//! | `schema_text`  | human-readable schema (prompts only)               |
//!
//! ## Filters
//!
//! `to_camel_case`, `to_pascal_case`, `to_kebab_case` and `to_java_type`
//! (see [`naming`]).
//!
//! ## Failure Model
//!
//! Unknown or empty groups and tables that fail to introspect abort the
//! whole request with a [`GenerateError`]. Everything else is local to one
//! unit: a failed render or model call is recorded as
//! [`UnitOutcome::Failed`], a failed write as `write_error` next to the code.

mod error;
mod generate;
pub mod llm;
pub mod naming;
mod schema;
mod templates;


pub use error::GenerateError;
pub use generate::{
    join_output_path, render_single, BatchResult, GenerationUnitResult, Generator, ResolvedPath,
    TableResult, UnitError, UnitOutcome,
};
pub use llm::{ChatClient, HttpChatClient, LlmError, LlmFallback};
pub use schema::{Column, RenderContext, TableSchema};
pub use templates::{RenderError, TemplateRenderer};
