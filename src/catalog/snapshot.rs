//! In-memory catalog built from a JSON snapshot of table metadata

use super::{CatalogReader, RawMatch};
use crate::candidate::KeyColumn;
use crate::category::{is_excluded, Category};
use crate::convention::columns_align;
use crate::error::{JoinError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotColumn {
    pub name: String,
    #[serde(default = "default_data_type")]
    pub data_type: String,
}

fn default_data_type() -> String {
    "unknown".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotTable {
    #[serde(default = "default_schema")]
    pub schema: String,
    pub name: String,
    /// Columns in ordinal order
    pub columns: Vec<SnapshotColumn>,
    #[serde(default)]
    pub primary_key: Vec<String>,
}

fn default_schema() -> String {
    "dbo".to_string()
}

impl SnapshotTable {
    pub fn new(schema: &str, name: &str, columns: &[(&str, &str)], primary_key: &[&str]) -> Self {
        Self {
            schema: schema.to_string(),
            name: name.to_string(),
            columns: columns
                .iter()
                .map(|(name, data_type)| SnapshotColumn {
                    name: name.to_string(),
                    data_type: data_type.to_string(),
                })
                .collect(),
            primary_key: primary_key.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// Catalog snapshot keyed by lower-cased `schema.table`
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    tables: Vec<SnapshotTable>,
    tables_by_name: HashMap<String, usize>,
}

impl CatalogSnapshot {
    pub fn new(tables: Vec<SnapshotTable>) -> Self {
        let tables_by_name = tables
            .iter()
            .enumerate()
            .map(|(idx, t)| (Self::lookup_key(&t.schema, &t.name), idx))
            .collect();

        Self { tables, tables_by_name }
    }

    /// Load a snapshot file holding either `{"tables": [...]}` or a bare array
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| JoinError::Catalog(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::from_json(&content)
            .map_err(|e| JoinError::Catalog(format!("Failed to parse {}: {}", path.display(), e)))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(content)?;
        let tables: Vec<SnapshotTable> = if value.get("tables").is_some() {
            serde_json::from_value(value["tables"].clone())?
        } else {
            serde_json::from_value(value)?
        };
        Ok(Self::new(tables))
    }

    pub fn tables(&self) -> &[SnapshotTable] {
        &self.tables
    }

    pub fn table(&self, schema: &str, name: &str) -> Option<&SnapshotTable> {
        self.tables_by_name
            .get(&Self::lookup_key(schema, name))
            .map(|idx| &self.tables[*idx])
    }

    fn lookup_key(schema: &str, name: &str) -> String {
        format!("{}.{}", schema, name).to_ascii_lowercase()
    }
}

#[async_trait]
impl CatalogReader for CatalogSnapshot {
    fn name(&self) -> &'static str {
        "snapshot"
    }

    async fn get_primary_keys(&self, table: &str, schema: &str) -> Result<Option<Vec<String>>> {
        Ok(self.table(schema, table).map(|t| t.primary_key.clone()))
    }

    async fn find_columns_at_positions(
        &self,
        schema: &str,
        key: &[KeyColumn],
        exclude_table: &str,
    ) -> Result<Vec<RawMatch>> {
        let mut rows = Vec::new();

        for table in &self.tables {
            if !table.schema.eq_ignore_ascii_case(schema)
                || table.name.eq_ignore_ascii_case(exclude_table)
                || is_excluded(&table.name)
            {
                continue;
            }

            let aligned: Vec<(&KeyColumn, &SnapshotColumn)> = key
                .iter()
                .filter_map(|k| {
                    let column = table.columns.get(k.position.checked_sub(1)?)?;
                    columns_align(&k.name, &column.name, k.position).then_some((k, column))
                })
                .collect();

            if aligned.is_empty() {
                continue;
            }

            let match_count = aligned.len();
            let hint = Category::classify(&table.name).as_str().to_string();
            rows.extend(aligned.into_iter().map(|(k, column)| RawMatch {
                schema: table.schema.clone(),
                table_name: table.name.clone(),
                column_name: column.name.clone(),
                data_type: column.data_type.clone(),
                ordinal_position: k.position,
                key_column: k.name.clone(),
                match_count,
                category_hint: Some(hint.clone()),
            }));
        }

        Ok(rows)
    }
}
