use sqlx::mysql::MySqlRow;
use sqlx::{Connection as _, MySqlConnection, Row};
use tokio::runtime::Runtime;
use tracing::debug;

use super::{column_from_row, current_thread_runtime, non_empty, IntrospectError, SchemaSource, TableInfo};
use crate::generator::{Column, TableSchema};

// information_schema text columns are cast to CHAR so they decode as
// strings on servers that report them as binary.
const TABLE_COMMENT: &str = "SELECT CAST(TABLE_COMMENT AS CHAR) AS comment \
     FROM information_schema.tables \
     WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ?";

const COLUMNS: &str = "SELECT CAST(COLUMN_NAME AS CHAR) AS column_name, \
     CAST(COLUMN_TYPE AS CHAR) AS column_type, \
     CAST(IS_NULLABLE AS CHAR) AS is_nullable, \
     CAST(COLUMN_DEFAULT AS CHAR) AS column_default, \
     CAST(COLUMN_COMMENT AS CHAR) AS column_comment \
     FROM information_schema.columns \
     WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? \
     ORDER BY ORDINAL_POSITION";

const PRIMARY_KEYS: &str = "SELECT CAST(COLUMN_NAME AS CHAR) AS column_name \
     FROM information_schema.key_column_usage \
     WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? AND CONSTRAINT_NAME = 'PRIMARY' \
     ORDER BY ORDINAL_POSITION";

const TABLES: &str = "SELECT CAST(TABLE_NAME AS CHAR) AS table_name, \
     CAST(TABLE_COMMENT AS CHAR) AS comment \
     FROM information_schema.tables \
     WHERE TABLE_SCHEMA = DATABASE() AND TABLE_TYPE = 'BASE TABLE' \
     ORDER BY TABLE_NAME";

/// Introspects the database named in a MySQL/MariaDB URL.
///
/// Column types are reported as MySQL prints them (`varchar(64)`,
/// `bigint unsigned`). Table and column comments are read from
/// `information_schema`.
pub struct MySqlSource {
    url: String,
    runtime: Runtime,
}

impl MySqlSource {
    pub fn new(url: &str) -> Result<Self, IntrospectError> {
        Ok(Self {
            url: url.to_string(),
            runtime: current_thread_runtime(url)?,
        })
    }

    async fn connect(&self) -> Result<MySqlConnection, IntrospectError> {
        MySqlConnection::connect(&self.url)
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

        let Some(table_row) = sqlx::query(TABLE_COMMENT)
            .bind(table)
            .fetch_optional(&mut conn)
            .await
            .map_err(query_err)?
        else {
            return Err(IntrospectError::TableNotFound {
                table: table.to_string(),
            });
        };
        let comment = non_empty(table_row.try_get("comment").map_err(query_err)?);

        let columns = sqlx::query(COLUMNS)
            .bind(table)
            .fetch_all(&mut conn)
            .await
            .map_err(query_err)?
            .iter()
            .map(|row: &MySqlRow| -> Result<Column, sqlx::Error> {
                Ok(column_from_row(
                    row.try_get("column_name")?,
                    row.try_get("column_type")?,
                    &row.try_get::<String, _>("is_nullable")?,
                    row.try_get("column_default")?,
                    row.try_get("column_comment")?,
                ))
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(query_err)?;

        let primary_keys: Vec<String> = sqlx::query(PRIMARY_KEYS)
            .bind(table)
            .fetch_all(&mut conn)
            .await
            .map_err(query_err)?
            .iter()
            .map(|row| row.try_get::<String, _>("column_name"))
            .collect::<Result<_, _>>()
            .map_err(query_err)?;

        debug!(
            table,
            columns = columns.len(),
            primary_keys = primary_keys.len(),
            "introspected mysql table"
        );
        Ok(TableSchema::with_primary_keys(
            table,
            comment,
            columns,
            &primary_keys,
        ))
    }

    async fn tables(&self) -> Result<Vec<TableInfo>, IntrospectError> {
        let list_err = |e: sqlx::Error| IntrospectError::Connection {
            target: self.url.clone(),
            cause: e.to_string(),
        };
        let mut conn = self.connect().await?;
        sqlx::query(TABLES)
            .fetch_all(&mut conn)
            .await
            .map_err(list_err)?
            .iter()
            .map(|row| -> Result<TableInfo, sqlx::Error> {
                Ok(TableInfo {
                    name: row.try_get("table_name")?,
                    comment: non_empty(row.try_get("comment")?),
                })
            })
            .collect::<Result<_, _>>()
            .map_err(list_err)
    }
}

impl SchemaSource for MySqlSource {
    fn table_schema(&self, table: &str) -> Result<TableSchema, IntrospectError> {
        self.runtime.block_on(self.inspect(table))
    }

    fn list_tables(&self) -> Result<Vec<TableInfo>, IntrospectError> {
        self.runtime.block_on(self.tables())
    }
}
