//! # Schema Introspection
//!
//! Produces [`TableSchema`] values for the generator:
//!
//! - [`SqliteSource`], [`MySqlSource`] and [`PostgresSource`] read a live
//!   database through `sqlx`, including table and column comments where the
//!   database keeps them
//! - [`SnapshotSource`] reads one JSON/YAML schema file per table from a
//!   directory, for databases the CLI cannot reach directly
//!
//! [`Connection::parse`] picks a source from a connection descriptor by its
//! URL scheme; anything without a known scheme is a snapshot directory.
//!
//! Schemas are fetched fresh for every request and never cached.

mod mysql;
mod postgres;
mod snapshot;
mod sqlite;

pub use mysql::MySqlSource;
pub use postgres::PostgresSource;
pub use snapshot::SnapshotSource;
pub use sqlite::SqliteSource;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use tokio::runtime::{Builder, Runtime};

use crate::generator::{Column, TableSchema};

/// Introspection failure for a connection or a single table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntrospectError {
    /// The connection could not be opened
    Connection {
        /// Connection descriptor
        target: String,
        /// Underlying error text
        cause: String,
    },
    /// The table does not exist in the source
    TableNotFound {
        /// Requested table
        table: String,
    },
    /// Reading the table's metadata failed
    Inspect {
        /// Requested table
        table: String,
        /// Underlying error text
        cause: String,
    },
}

impl fmt::Display for IntrospectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntrospectError::Connection { target, cause } => {
                write!(f, "Failed to connect to database {target}: {cause}")
            }
            IntrospectError::TableNotFound { table } => {
                write!(f, "Failed to inspect table {table}: table not found")
            }
            IntrospectError::Inspect { table, cause } => {
                write!(f, "Failed to inspect table {table}: {cause}")
            }
        }
    }
}

impl std::error::Error for IntrospectError {}

/// A table name with its comment, as listed by a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableInfo {
    pub name: String,
    pub comment: Option<String>,
}

/// Anything that can describe tables.
pub trait SchemaSource: Send + Sync {
    /// Columns, keys and comments of one table, in introspection order.
    fn table_schema(&self, table: &str) -> Result<TableSchema, IntrospectError>;

    /// All tables the source knows about, sorted by name.
    fn list_tables(&self) -> Result<Vec<TableInfo>, IntrospectError>;
}

/// Build a column from an `information_schema`-style row.
///
/// `is_nullable` is the `YES`/`NO` text the catalogs report. Empty comments
/// count as missing, since MySQL reports an unset comment as `''`.
pub(crate) fn column_from_row(
    name: String,
    sql_type: String,
    is_nullable: &str,
    default_literal: Option<String>,
    comment: Option<String>,
) -> Column {
    Column {
        name,
        sql_type,
        nullable: is_nullable.trim().eq_ignore_ascii_case("YES"),
        default_literal,
        is_primary_key: false,
        comment: non_empty(comment),
    }
}

/// Private runtime for a database source; the generator itself is
/// synchronous and drives each query with `block_on`.
pub(crate) fn current_thread_runtime(target: &str) -> Result<Runtime, IntrospectError> {
    Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| IntrospectError::Connection {
            target: target.to_string(),
            cause: e.to_string(),
        })
}

/// `None` for missing or blank text.
pub(crate) fn non_empty(text: Option<String>) -> Option<String> {
    text.filter(|t| !t.trim().is_empty())
}

/// A parsed connection descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Connection {
    /// `sqlite:` URL
    Sqlite(String),
    /// `mysql:` or `mariadb:` URL
    MySql(String),
    /// `postgres:` or `postgresql:` URL
    Postgres(String),
    /// Directory of schema snapshot files
    Snapshot(PathBuf),
}

impl Connection {
    pub fn parse(descriptor: &str) -> Self {
        let descriptor = descriptor.trim();
        let scheme = descriptor
            .split_once(':')
            .map(|(scheme, _)| scheme.to_ascii_lowercase());
        match scheme.as_deref() {
            Some("sqlite") => Connection::Sqlite(descriptor.to_string()),
            Some("mysql" | "mariadb") => Connection::MySql(descriptor.to_string()),
            Some("postgres" | "postgresql") => Connection::Postgres(descriptor.to_string()),
            _ => Connection::Snapshot(PathBuf::from(descriptor)),
        }
    }

    pub fn open(&self) -> Result<Box<dyn SchemaSource>, IntrospectError> {
        match self {
            Connection::Sqlite(url) => Ok(Box::new(SqliteSource::new(url)?)),
            Connection::MySql(url) => Ok(Box::new(MySqlSource::new(url)?)),
            Connection::Postgres(url) => Ok(Box::new(PostgresSource::new(url)?)),
            Connection::Snapshot(dir) => Ok(Box::new(SnapshotSource::new(dir)?)),
        }
    }
}
