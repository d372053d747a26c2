//! Relationship Discovery Engine
//!
//! Resolves the primary key of a target table, asks the catalog for tables
//! whose leading columns line up with it position by position, and turns the
//! raw rows into scored, categorized candidates.
//!
//! Every public operation here swallows catalog failures: a missing table or a
//! failed query is logged and reported as "no related tables", so a batch over
//! many tables never stops on one of them.

use crate::candidate::{rank_candidates, CandidateMatch, MatchedColumn, TableKey, MIN_MATCH_COUNT};
use crate::catalog::{CatalogReader, RawMatch};
use crate::category::{is_excluded, Category};
use crate::config::ExplorerConfig;
use crate::planner::{JoinPlan, JoinPlanner};
use serde::Serialize;
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};
use tracing::{debug, info, warn};

/// Cache key: target table plus a hash of its searched key columns
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub schema: String,
    pub table: String,
    pub key_signature: u64,
}

impl CacheKey {
    pub fn for_key(key: &TableKey) -> Self {
        let mut hasher = DefaultHasher::new();
        for column in key.search_window() {
            column.name.to_ascii_lowercase().hash(&mut hasher);
            column.position.hash(&mut hasher);
        }

        Self {
            schema: key.schema.to_ascii_lowercase(),
            table: key.table.to_ascii_lowercase(),
            key_signature: hasher.finish(),
        }
    }
}

/// Result of running the whole pipeline for one table
#[derive(Debug, Clone, Serialize)]
pub struct Exploration {
    pub schema: String,
    pub table: String,
    /// `None` when the table is missing or has no primary key
    pub key: Option<TableKey>,
    /// Ranked best first
    pub candidates: Vec<CandidateMatch>,
    pub plans: Vec<JoinPlan>,
}

impl Exploration {
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.table)
    }

    pub fn has_relationships(&self) -> bool {
        !self.candidates.is_empty()
    }
}

/// Discovery front-end owning the catalog reader and its result cache.
///
/// The cache lives as long as the explorer and is never evicted; call
/// [`RelationshipExplorer::clear_cache`] to force fresh catalog reads. It is
/// not synchronized: one explorer serves one caller at a time.
pub struct RelationshipExplorer<C: CatalogReader> {
    catalog: C,
    default_schema: String,
    cache: HashMap<CacheKey, Vec<CandidateMatch>>,
}

impl<C: CatalogReader> RelationshipExplorer<C> {
    pub fn new(catalog: C) -> Self {
        Self::with_config(catalog, &ExplorerConfig::default())
    }

    pub fn with_config(catalog: C, config: &ExplorerConfig) -> Self {
        Self {
            catalog,
            default_schema: config.default_schema.clone(),
            cache: HashMap::new(),
        }
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Split `"schema.table"`; an explicit qualifier wins over `schema`
    pub fn split_table_name(&self, table: &str, schema: Option<&str>) -> (String, String) {
        match table.split_once('.') {
            Some((qualifier, name)) if !qualifier.is_empty() && !name.is_empty() => {
                (qualifier.to_string(), name.to_string())
            }
            _ => (
                schema.unwrap_or(&self.default_schema).to_string(),
                table.to_string(),
            ),
        }
    }

    /// Primary-Key Resolver.
    ///
    /// Returns `None` when the table does not exist, has no declared primary
    /// key, or the catalog cannot be read.
    pub async fn resolve_key(&self, table: &str, schema: Option<&str>) -> Option<TableKey> {
        let (schema, table) = self.split_table_name(table, schema);

        match self.catalog.get_primary_keys(&table, &schema).await {
            Ok(Some(columns)) if !columns.is_empty() => {
                debug!("🔑 Primary key of {}.{}: {}", schema, table, columns.join(", "));
                Some(TableKey::new(schema, table, columns))
            }
            Ok(Some(_)) => {
                warn!("⚠️  {}.{} has no primary key", schema, table);
                None
            }
            Ok(None) => {
                warn!("⚠️  {}.{} not found in {} catalog", schema, table, self.catalog.name());
                None
            }
            Err(e) => {
                warn!("⚠️  Could not read primary key of {}.{}: {}", schema, table, e);
                None
            }
        }
    }

    /// Candidate Discovery for a table name: resolves the key first
    pub async fn discover(&mut self, table: &str, schema: Option<&str>) -> Vec<CandidateMatch> {
        match self.resolve_key(table, schema).await {
            Some(key) => self.discover_for_key(&key).await,
            None => Vec::new(),
        }
    }

    /// Candidate Discovery for an already resolved key.
    ///
    /// Results are cached per (table, key signature); repeated calls return
    /// the cached candidates without touching the catalog. Query failures
    /// yield an empty list and are not cached.
    pub async fn discover_for_key(&mut self, key: &TableKey) -> Vec<CandidateMatch> {
        if key.is_empty() {
            return Vec::new();
        }

        let cache_key = CacheKey::for_key(key);
        if let Some(cached) = self.cache.get(&cache_key) {
            debug!("Discovery cache hit for {}", key.qualified_name());
            return cached.clone();
        }

        let window = key.search_window();
        let rows = match self
            .catalog
            .find_columns_at_positions(&key.schema, window, &key.table)
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                warn!("⚠️  Discovery query failed for {}: {}", key.qualified_name(), e);
                return Vec::new();
            }
        };

        let candidates = group_candidates(&key.table, rows);
        info!(
            "🔗 {} related tables found for {}",
            candidates.len(),
            key.qualified_name()
        );

        self.cache.insert(cache_key, candidates.clone());
        candidates
    }

    /// Resolve, discover and plan for one table
    pub async fn explore(
        &mut self,
        table: &str,
        schema: Option<&str>,
        planner: &JoinPlanner,
    ) -> Exploration {
        let (schema, table) = self.split_table_name(table, schema);
        info!("🔍 Analyzing {}.{}", schema, table);

        let key = self.resolve_key(&table, Some(&schema)).await;
        let candidates = match &key {
            Some(key) => self.discover_for_key(key).await,
            None => Vec::new(),
        };

        let plans = match &key {
            Some(key) => planner.plan(key, &candidates),
            None => Vec::new(),
        };

        if candidates.is_empty() {
            info!("No related tables found for {}.{}", schema, table);
        }

        Exploration {
            schema,
            table,
            key,
            candidates,
            plans,
        }
    }

    /// Explore a list of tables in order
    pub async fn explore_many(&mut self, tables: &[String], planner: &JoinPlanner) -> Vec<Exploration> {
        let mut explorations = Vec::with_capacity(tables.len());
        for table in tables {
            explorations.push(self.explore(table, None, planner).await);
        }
        explorations
    }
}

/// Group raw rows by table into candidates, dropping the target, denylisted
/// tables and anything below the minimum match count. Ranked best first.
pub fn group_candidates(target_table: &str, rows: Vec<RawMatch>) -> Vec<CandidateMatch> {
    let mut grouped: BTreeMap<String, (String, String, Option<String>, Vec<MatchedColumn>)> = BTreeMap::new();

    for row in rows {
        if row.table_name.eq_ignore_ascii_case(target_table) || is_excluded(&row.table_name) {
            continue;
        }

        let entry = grouped
            .entry(row.table_name.to_ascii_lowercase())
            .or_insert_with(|| (row.schema.clone(), row.table_name.clone(), row.category_hint.clone(), Vec::new()));

        entry.3.push(MatchedColumn {
            column_name: row.column_name,
            data_type: row.data_type,
            ordinal_position: row.ordinal_position,
            key_column: row.key_column,
        });
    }

    let mut candidates: Vec<CandidateMatch> = grouped
        .into_values()
        .map(|(schema, table_name, hint, columns)| {
            let candidate = CandidateMatch::new(schema, table_name, columns);
            if let Some(hint) = hint.as_deref().and_then(Category::from_tag) {
                if hint != candidate.category {
                    debug!(
                        "Catalog hinted {} for {}, classified as {}",
                        hint, candidate.table_name, candidate.category
                    );
                }
            }
            candidate
        })
        .filter(|c| c.match_count >= MIN_MATCH_COUNT)
        .collect();

    rank_candidates(&mut candidates);
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(table: &str, column: &str, key: &str, position: usize) -> RawMatch {
        RawMatch {
            schema: "dbo".to_string(),
            table_name: table.to_string(),
            column_name: column.to_string(),
            data_type: "int".to_string(),
            ordinal_position: position,
            key_column: key.to_string(),
            match_count: 0,
            category_hint: None,
        }
    }

    #[test]
    fn test_group_drops_single_column_matches() {
        let rows = vec![
            row("Fst001", "Pgcod", "Pgcod", 1),
            row("Fsd010", "Pgcod", "Pgcod", 1),
            row("Fsd010", "Aomod", "Ppmod", 2),
        ];

        let candidates = group_candidates("Fsd601", rows);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].table_name, "Fsd010");
        assert_eq!(candidates[0].match_count, 2);
    }

    #[test]
    fn test_group_excludes_target_and_denylist() {
        let rows = vec![
            row("FSD601", "Pgcod", "Pgcod", 1),
            row("FSD601", "Ppmod", "Ppmod", 2),
            row("Fsd010_bkp", "Pgcod", "Pgcod", 1),
            row("Fsd010_bkp", "Aomod", "Ppmod", 2),
        ];

        assert!(group_candidates("Fsd601", rows).is_empty());
    }

    #[test]
    fn test_group_deduplicates_repeated_positions() {
        let rows = vec![
            row("Fsd010", "Pgcod", "Pgcod", 1),
            row("Fsd010", "Aomod", "Ppmod", 2),
            row("Fsd010", "Aomod", "Ppmod", 2),
        ];

        let candidates = group_candidates("Fsd601", rows);
        assert_eq!(candidates[0].match_count, 2);
        assert_eq!(candidates[0].matched_columns.len(), 2);
    }

    #[test]
    fn test_cache_key_ignores_case_and_tail_beyond_window() {
        let mut long: Vec<String> = (1..=9).map(|i| format!("K{}", i)).collect();
        let short = long.clone();
        long.push("K10".to_string());

        let a = CacheKey::for_key(&TableKey::new("dbo", "Fsd601", short));
        let b = CacheKey::for_key(&TableKey::new("DBO", "FSD601", long));
        assert_eq!(a, b);
    }
}
