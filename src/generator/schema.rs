use serde::{Deserialize, Serialize};

use super::naming::to_pascal_case;

/// One introspected column.
///
/// Field names are serialized the way templates address them:
/// `col.name`, `col.type`, `col.nullable`, `col.default`,
/// `col.primary_key`, `col.comment`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub sql_type: String,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    #[serde(rename = "default", default)]
    pub default_literal: Option<String>,
    #[serde(rename = "primary_key", default)]
    pub is_primary_key: bool,
    #[serde(default)]
    pub comment: Option<String>,
}

fn default_nullable() -> bool {
    true
}

impl Column {
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
            nullable: true,
            default_literal: None,
            is_primary_key: false,
            comment: None,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self
    }

    pub fn with_default(mut self, literal: impl Into<String>) -> Self {
        self.default_literal = Some(literal.into());
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// Dialect-independent description of one table.
///
/// `columns` keeps introspection order; templates iterate it as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub table_name: String,
    #[serde(default)]
    pub comment: Option<String>,
    pub columns: Vec<Column>,
}

impl TableSchema {
    pub fn new(table_name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            table_name: table_name.into(),
            comment: None,
            columns,
        }
    }

    /// Build a schema from raw columns and a separately looked-up key set.
    ///
    /// Key names that match no column are ignored.
    pub fn with_primary_keys(
        table_name: impl Into<String>,
        comment: Option<String>,
        mut columns: Vec<Column>,
        primary_keys: &[String],
    ) -> Self {
        for column in &mut columns {
            column.is_primary_key = primary_keys.iter().any(|pk| pk == &column.name);
        }
        Self {
            table_name: table_name.into(),
            comment,
            columns,
        }
    }

    pub fn primary_keys(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| c.is_primary_key)
    }

    /// Human-readable serialization handed to prompt templates as
    /// `schema_text`. Prompt authors depend on this exact shape.
    pub fn schema_text(&self) -> String {
        let mut lines = Vec::with_capacity(self.columns.len() + 3);
        lines.push(format!("Table Name: {}", self.table_name));
        if let Some(comment) = self.comment.as_deref().filter(|c| !c.is_empty()) {
            lines.push(format!("Table Comment: {comment}"));
        }
        lines.push("Columns:".to_string());
        for col in &self.columns {
            let pk = if col.is_primary_key { " (PK)" } else { "" };
            let comment = match col.comment.as_deref() {
                Some(c) if !c.is_empty() => format!(" - {c}"),
                _ => String::new(),
            };
            lines.push(format!("- {} ({}){pk}{comment}", col.name, col.sql_type));
        }
        lines.join("\n")
    }
}

/// The data a template sees while rendering.
///
/// A closed mapping: the schema fields plus a few derived keys. Built fresh
/// for every (table, template) pair and never mutated while rendering.
#[derive(Debug, Clone, Serialize)]
pub struct RenderContext<'a> {
    pub table_name: &'a str,
    #[serde(rename = "TableName")]
    pub pascal_table_name: String,
    pub comment: Option<&'a str>,
    pub columns: &'a [Column],
    pub primary_keys: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_text: Option<String>,
}

impl<'a> RenderContext<'a> {
    pub fn new(schema: &'a TableSchema) -> Self {
        Self {
            table_name: &schema.table_name,
            pascal_table_name: to_pascal_case(&schema.table_name),
            comment: schema.comment.as_deref(),
            columns: &schema.columns,
            primary_keys: schema.primary_keys().map(|c| c.name.as_str()).collect(),
            schema_text: None,
        }
    }

    /// Context for prompt rendering: the same keys plus `schema_text`.
    pub fn for_prompt(schema: &'a TableSchema) -> Self {
        Self {
            schema_text: Some(schema.schema_text()),
            ..Self::new(schema)
        }
    }
}
