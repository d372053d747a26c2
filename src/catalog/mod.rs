//! Catalog Reader - the narrow interface onto relational metadata
//!
//! The discovery engine only ever asks two questions of a catalog: what is the
//! primary key of a table, and which other tables carry aligned columns at the
//! key positions. Readers answer the second with one batched round trip.

pub mod postgres;
pub mod snapshot;

use crate::candidate::KeyColumn;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use postgres::PgCatalogReader;
pub use snapshot::{CatalogSnapshot, SnapshotColumn, SnapshotTable};

/// One aligned column of a candidate table, as returned by a catalog reader
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMatch {
    pub schema: String,
    pub table_name: String,
    pub column_name: String,
    pub data_type: String,
    pub ordinal_position: usize,
    /// Target key column the candidate column aligned with
    pub key_column: String,
    /// Aligned positions of the whole candidate table
    pub match_count: usize,
    /// Category tag computed by the reader, if any
    #[serde(default)]
    pub category_hint: Option<String>,
}

/// Read-only access to table and key metadata
#[async_trait]
pub trait CatalogReader: Send + Sync {
    /// Reader name for logs (e.g. "snapshot", "postgres")
    fn name(&self) -> &'static str;

    /// Ordered primary key columns of `schema.table`.
    ///
    /// `Ok(None)` when the table does not exist, `Ok(Some(vec![]))` when it
    /// exists without a declared primary key.
    async fn get_primary_keys(&self, table: &str, schema: &str) -> Result<Option<Vec<String>>>;

    /// Columns of other tables in `schema` that align with `key` at the same
    /// ordinal position. `exclude_table` and denylisted tables are skipped.
    async fn find_columns_at_positions(
        &self,
        schema: &str,
        key: &[KeyColumn],
        exclude_table: &str,
    ) -> Result<Vec<RawMatch>>;
}

#[async_trait]
impl<T: CatalogReader + ?Sized> CatalogReader for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    async fn get_primary_keys(&self, table: &str, schema: &str) -> Result<Option<Vec<String>>> {
        (**self).get_primary_keys(table, schema).await
    }

    async fn find_columns_at_positions(
        &self,
        schema: &str,
        key: &[KeyColumn],
        exclude_table: &str,
    ) -> Result<Vec<RawMatch>> {
        (**self).find_columns_at_positions(schema, key, exclude_table).await
    }
}
