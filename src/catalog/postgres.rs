//! information_schema reader over a PostgreSQL pool
//!
//! Discovery is a single aggregate query: the target key is shipped as three
//! parallel arrays (name, position, convention segment), joined against
//! `information_schema.columns` at the same ordinal position, and counted per
//! table with a window function.

use super::{CatalogReader, RawMatch};
use crate::candidate::{KeyColumn, MIN_MATCH_COUNT};
use crate::category::{Category, EXCLUDED_TABLES};
use crate::convention::column_segment;
use crate::error::{JoinError, Result};
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use std::time::Duration;
use tracing::debug;

const TABLE_EXISTS_SQL: &str = r#"
    SELECT COUNT(*)::bigint AS table_count
    FROM information_schema.tables
    WHERE lower(table_schema) = lower($1)
      AND lower(table_name) = lower($2)
"#;

const PRIMARY_KEY_SQL: &str = r#"
    SELECT kcu.column_name::text AS column_name
    FROM information_schema.table_constraints tc
    JOIN information_schema.key_column_usage kcu
      ON tc.constraint_name = kcu.constraint_name
     AND tc.table_schema = kcu.table_schema
     AND tc.table_name = kcu.table_name
    WHERE tc.constraint_type = 'PRIMARY KEY'
      AND lower(tc.table_schema) = lower($1)
      AND lower(tc.table_name) = lower($2)
    ORDER BY kcu.ordinal_position
"#;

pub struct PgCatalogReader {
    pool: PgPool,
}

impl PgCatalogReader {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a small pool against `database_url`
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .acquire_timeout(Duration::from_secs(30))
            .connect(database_url)
            .await
            .map_err(|e| JoinError::Database(format!("Failed to connect to catalog: {}", e)))?;

        Ok(Self::new(pool))
    }

    /// Text of the aggregate discovery query
    pub fn discovery_sql() -> String {
        let exclusions = EXCLUDED_TABLES
            .iter()
            .map(|p| format!("      AND lower(c.table_name) NOT LIKE '{}'", p.like_pattern()))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            r#"
    WITH key_columns AS (
        SELECT k.name, k.position, k.segment
        FROM unnest($2::text[], $3::int[], $4::text[]) AS k(name, position, segment)
    ),
    aligned AS (
        SELECT c.table_schema::text AS table_schema,
               c.table_name::text AS table_name,
               c.column_name::text AS column_name,
               c.data_type::text AS data_type,
               c.ordinal_position::int AS ordinal_position,
               k.name AS key_column
        FROM information_schema.columns c
        JOIN key_columns k
          ON k.position = c.ordinal_position
         AND (lower(c.column_name) = lower(k.name)
              OR (k.segment <> ''
                  AND length(c.column_name) > 2
                  AND lower(substr(c.column_name, 3)) = k.segment))
        WHERE lower(c.table_schema) = lower($1)
          AND lower(c.table_name) <> lower($5)
{exclusions}
    ),
    counted AS (
        SELECT a.*,
               COUNT(*) OVER (PARTITION BY a.table_schema, a.table_name)::int AS match_count
        FROM aligned a
    )
    SELECT *
    FROM counted
    WHERE match_count >= {min_matches}
    ORDER BY match_count DESC, table_name, ordinal_position
"#,
            exclusions = exclusions,
            min_matches = MIN_MATCH_COUNT,
        )
    }
}

#[async_trait]
impl CatalogReader for PgCatalogReader {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn get_primary_keys(&self, table: &str, schema: &str) -> Result<Option<Vec<String>>> {
        let exists: i64 = sqlx::query(TABLE_EXISTS_SQL)
            .bind(schema)
            .bind(table)
            .fetch_one(&self.pool)
            .await?
            .try_get("table_count")?;

        if exists == 0 {
            return Ok(None);
        }

        let rows = sqlx::query(PRIMARY_KEY_SQL)
            .bind(schema)
            .bind(table)
            .fetch_all(&self.pool)
            .await?;

        let columns = rows
            .iter()
            .map(|row| row.try_get::<String, _>("column_name"))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Some(columns))
    }

    async fn find_columns_at_positions(
        &self,
        schema: &str,
        key: &[KeyColumn],
        exclude_table: &str,
    ) -> Result<Vec<RawMatch>> {
        let names: Vec<String> = key.iter().map(|k| k.name.clone()).collect();
        let positions: Vec<i32> = key.iter().map(|k| k.position as i32).collect();
        let segments: Vec<String> = key
            .iter()
            .map(|k| column_segment(&k.name, k.position).unwrap_or("").to_string())
            .collect();

        debug!("Running discovery query for {}.{} ({} key columns)", schema, exclude_table, key.len());

        let rows = sqlx::query(&Self::discovery_sql())
            .bind(schema)
            .bind(names)
            .bind(positions)
            .bind(segments)
            .bind(exclude_table)
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| -> Result<RawMatch> {
                let table_name: String = row.try_get("table_name")?;
                let category_hint = Some(Category::classify(&table_name).as_str().to_string());
                Ok(RawMatch {
                    schema: row.try_get("table_schema")?,
                    column_name: row.try_get("column_name")?,
                    data_type: row.try_get("data_type")?,
                    ordinal_position: row.try_get::<i32, _>("ordinal_position")? as usize,
                    key_column: row.try_get("key_column")?,
                    match_count: row.try_get::<i32, _>("match_count")? as usize,
                    category_hint,
                    table_name,
                })
            })
            .collect()
    }
}
