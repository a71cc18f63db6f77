use sqlx::postgres::PgRow;
use sqlx::{Connection as _, PgConnection, Row};
use tokio::runtime::Runtime;
use tracing::debug;

use super::{column_from_row, current_thread_runtime, non_empty, IntrospectError, SchemaSource, TableInfo};
use crate::generator::{Column, TableSchema};

const TABLE_COMMENT: &str = "SELECT obj_description(c.oid, 'pg_class') AS comment \
     FROM pg_catalog.pg_class c \
     JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace \
     WHERE n.nspname = current_schema() AND c.relname = $1 \
       AND c.relkind IN ('r', 'p', 'v', 'm')";

// format_type keeps length and precision (`character varying(64)`), which
// information_schema.columns.data_type drops.
const COLUMNS: &str = "SELECT c.column_name::text AS column_name, \
     format_type(a.atttypid, a.atttypmod) AS column_type, \
     c.is_nullable::text AS is_nullable, \
     c.column_default::text AS column_default, \
     col_description(a.attrelid, a.attnum) AS column_comment \
     FROM information_schema.columns c \
     JOIN pg_catalog.pg_namespace n ON n.nspname = c.table_schema \
     JOIN pg_catalog.pg_class t ON t.relnamespace = n.oid AND t.relname = c.table_name \
     JOIN pg_catalog.pg_attribute a ON a.attrelid = t.oid AND a.attname = c.column_name \
     WHERE c.table_schema = current_schema() AND c.table_name = $1 \
     ORDER BY c.ordinal_position";

const PRIMARY_KEYS: &str = "SELECT kcu.column_name::text AS column_name \
     FROM information_schema.table_constraints tc \
     JOIN information_schema.key_column_usage kcu \
       ON tc.constraint_name = kcu.constraint_name \
      AND tc.table_schema = kcu.table_schema \
     WHERE tc.table_schema = current_schema() AND tc.table_name = $1 \
       AND tc.constraint_type = 'PRIMARY KEY' \
     ORDER BY kcu.ordinal_position";

const TABLES: &str = "SELECT c.relname::text AS table_name, \
     obj_description(c.oid, 'pg_class') AS comment \
     FROM pg_catalog.pg_class c \
     JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace \
     WHERE n.nspname = current_schema() AND c.relkind IN ('r', 'p') \
     ORDER BY c.relname";

/// Introspects the current schema (normally `public`) of a PostgreSQL
/// database.
///
/// Comments set with `COMMENT ON` are read through `obj_description` and
/// `col_description`.
pub struct PostgresSource {
    url: String,
    runtime: Runtime,
}

impl PostgresSource {
    pub fn new(url: &str) -> Result<Self, IntrospectError> {
        Ok(Self {
            url: url.to_string(),
            runtime: current_thread_runtime(url)?,
        })
    }

    async fn connect(&self) -> Result<PgConnection, IntrospectError> {
        PgConnection::connect(&self.url)
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
            .map(|row: &PgRow| -> Result<Column, sqlx::Error> {
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
            "introspected postgres table"
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

impl SchemaSource for PostgresSource {
    fn table_schema(&self, table: &str) -> Result<TableSchema, IntrospectError> {
        self.runtime.block_on(self.inspect(table))
    }

    fn list_tables(&self) -> Result<Vec<TableInfo>, IntrospectError> {
        self.runtime.block_on(self.tables())
    }
}
