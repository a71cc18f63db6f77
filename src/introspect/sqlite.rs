use sqlx::{Connection as _, Row, SqliteConnection};
use tokio::runtime::Runtime;
use tracing::debug;

use super::{current_thread_runtime, IntrospectError, SchemaSource, TableInfo};
use crate::generator::{Column, TableSchema};

/// Introspects a SQLite database.
///
/// The generator is synchronous, so every call drives a private
/// current-thread runtime to completion. A new connection is opened per call.
pub struct SqliteSource {
    url: String,
    runtime: Runtime,
}

impl SqliteSource {
    pub fn new(url: &str) -> Result<Self, IntrospectError> {
        Ok(Self {
            url: url.to_string(),
            runtime: current_thread_runtime(url)?,
        })
    }

    async fn connect(&self) -> Result<SqliteConnection, IntrospectError> {
        SqliteConnection::connect(&self.url)
            .await
            .map_err(|e| IntrospectError::Connection {
                target: self.url.clone(),
                cause: e.to_string(),
            })
    }

    async fn inspect(&self, table: &str) -> Result<TableSchema, IntrospectError> {
        let query_err = |e: sqlx::Error| IntrospectError::Inspect {
            table: table.to_string(),
            cause: e.to_string(),
        };
        let mut conn = self.connect().await?;

        let exists = sqlx::query(
            "SELECT name FROM sqlite_master WHERE type IN ('table', 'view') AND name = ?1",
        )
        .bind(table)
        .fetch_optional(&mut conn)
        .await
        .map_err(query_err)?;
        if exists.is_none() {
            return Err(IntrospectError::TableNotFound {
                table: table.to_string(),
            });
        }

        let rows = sqlx::query(
            "SELECT name, type, \"notnull\", dflt_value FROM pragma_table_info(?1) ORDER BY cid",
        )
        .bind(table)
        .fetch_all(&mut conn)
        .await
        .map_err(query_err)?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in &rows {
            let name: String = row.try_get("name").map_err(query_err)?;
            let sql_type: String = row.try_get("type").map_err(query_err)?;
            let not_null: i64 = row.try_get("notnull").map_err(query_err)?;
            let default_literal: Option<String> = row.try_get("dflt_value").map_err(query_err)?;
            columns.push(Column {
                name,
                sql_type,
                nullable: not_null == 0,
                default_literal,
                is_primary_key: false,
                comment: None,
            });
        }

        // Key membership comes from its own lookup and is joined by name.
        let primary_keys: Vec<String> =
            sqlx::query("SELECT name FROM pragma_table_info(?1) WHERE pk > 0 ORDER BY pk")
                .bind(table)
                .fetch_all(&mut conn)
                .await
                .map_err(query_err)?
                .iter()
                .map(|row| row.try_get::<String, _>("name"))
                .collect::<Result<_, _>>()
                .map_err(query_err)?;

        debug!(
            table,
            columns = columns.len(),
            primary_keys = primary_keys.len(),
            "introspected sqlite table"
        );
        // SQLite keeps no table or column comments.
        Ok(TableSchema::with_primary_keys(
            table,
            None,
            columns,
            &primary_keys,
        ))
    }

    async fn tables(&self) -> Result<Vec<TableInfo>, IntrospectError> {
        let mut conn = self.connect().await?;
        let rows = sqlx::query(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(&mut conn)
        .await
        .map_err(|e| IntrospectError::Connection {
            target: self.url.clone(),
            cause: e.to_string(),
        })?;
        rows.iter()
            .map(|row| {
                row.try_get::<String, _>("name")
                    .map(|name| TableInfo {
                        name,
                        comment: None,
                    })
                    .map_err(|e| IntrospectError::Connection {
                        target: self.url.clone(),
                        cause: e.to_string(),
                    })
            })
            .collect()
    }
}

impl SchemaSource for SqliteSource {
    fn table_schema(&self, table: &str) -> Result<TableSchema, IntrospectError> {
        self.runtime.block_on(self.inspect(table))
    }

    fn list_tables(&self) -> Result<Vec<TableInfo>, IntrospectError> {
        self.runtime.block_on(self.tables())
    }
}
