use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{IntrospectError, SchemaSource, TableInfo};
use crate::generator::{Column, TableSchema};

const EXTENSIONS: [&str; 3] = ["json", "yaml", "yml"];

/// On-disk shape of a schema snapshot.
///
/// `primary_keys`, when present, is joined onto the columns by name the same
/// way a live key-constraint lookup is.
#[derive(Debug, Deserialize)]
struct SnapshotFile {
    #[serde(default)]
    table_name: Option<String>,
    #[serde(default)]
    comment: Option<String>,
    columns: Vec<Column>,
    #[serde(default)]
    primary_keys: Vec<String>,
}

/// Reads `<table>.json`, `<table>.yaml` or `<table>.yml` from a directory.
pub struct SnapshotSource {
    dir: PathBuf,
}

impl SnapshotSource {
    pub fn new(dir: &Path) -> Result<Self, IntrospectError> {
        if !dir.is_dir() {
            return Err(IntrospectError::Connection {
                target: dir.display().to_string(),
                cause: "not a directory".to_string(),
            });
        }
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    fn snapshot_path(&self, table: &str) -> Option<PathBuf> {
        if table.is_empty() || table.contains(['/', '\\']) || table.contains("..") {
            return None;
        }
        EXTENSIONS
            .iter()
            .map(|ext| self.dir.join(format!("{table}.{ext}")))
            .find(|p| p.is_file())
    }

    fn parse(path: &Path, table: &str) -> Result<SnapshotFile, IntrospectError> {
        let inspect_err = |cause: String| IntrospectError::Inspect {
            table: table.to_string(),
            cause,
        };
        let text = fs::read_to_string(path).map_err(|e| inspect_err(e.to_string()))?;
        let is_json = path.extension().and_then(|e| e.to_str()) == Some("json");
        if is_json {
            serde_json::from_str(&text).map_err(|e| inspect_err(e.to_string()))
        } else {
            serde_yaml::from_str(&text).map_err(|e| inspect_err(e.to_string()))
        }
    }
}

impl SchemaSource for SnapshotSource {
    fn table_schema(&self, table: &str) -> Result<TableSchema, IntrospectError> {
        let path = self
            .snapshot_path(table)
            .ok_or_else(|| IntrospectError::TableNotFound {
                table: table.to_string(),
            })?;
        let snapshot = Self::parse(&path, table)?;
        debug!(table, path = %path.display(), "loaded schema snapshot");
        let table_name = snapshot.table_name.unwrap_or_else(|| table.to_string());
        if snapshot.primary_keys.is_empty() {
            Ok(TableSchema {
                table_name,
                comment: snapshot.comment,
                columns: snapshot.columns,
            })
        } else {
            Ok(TableSchema::with_primary_keys(
                table_name,
                snapshot.comment,
                snapshot.columns,
                &snapshot.primary_keys,
            ))
        }
    }

    fn list_tables(&self) -> Result<Vec<TableInfo>, IntrospectError> {
        let entries = fs::read_dir(&self.dir).map_err(|e| IntrospectError::Connection {
            target: self.dir.display().to_string(),
            cause: e.to_string(),
        })?;
        let mut tables = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            let known = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|ext| EXTENSIONS.contains(&ext));
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if !known || !path.is_file() {
                continue;
            }
            let snapshot = Self::parse(&path, stem)?;
            tables.push(TableInfo {
                name: snapshot.table_name.unwrap_or_else(|| stem.to_string()),
                comment: snapshot.comment,
            });
        }
        tables.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tables)
    }
}
