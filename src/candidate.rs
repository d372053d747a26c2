//! Relationship candidates and their confidence
//!
//! Confidence measures how much of the *reference* key window matched:
//! `match_count / 9`, whatever the length of the target or candidate key.
//! A three-column key matching on all three positions therefore scores 0.33.

use crate::category::Category;
use serde::{Deserialize, Serialize};

/// Number of leading key positions compared between tables
pub const KEY_POSITIONS: usize = 9;

/// Fewest aligned positions that count as a relationship. A single shared
/// column is usually just the leading company code.
pub const MIN_MATCH_COUNT: usize = 2;

/// One column of a primary key with its 1-based position
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyColumn {
    pub name: String,
    pub position: usize,
}

/// Ordered primary key of a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableKey {
    pub schema: String,
    pub table: String,
    pub columns: Vec<KeyColumn>,
}

impl TableKey {
    pub fn new(schema: impl Into<String>, table: impl Into<String>, columns: Vec<String>) -> Self {
        let columns = columns
            .into_iter()
            .enumerate()
            .map(|(idx, name)| KeyColumn { name, position: idx + 1 })
            .collect();

        Self {
            schema: schema.into(),
            table: table.into(),
            columns,
        }
    }

    /// Key columns taking part in relationship search
    pub fn search_window(&self) -> &[KeyColumn] {
        let end = self.columns.len().min(KEY_POSITIONS);
        &self.columns[..end]
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.table)
    }
}

/// A candidate column aligned with a target key column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedColumn {
    /// Column of the candidate table
    pub column_name: String,
    pub data_type: String,
    pub ordinal_position: usize,
    /// Target key column at the same position
    pub key_column: String,
}

/// Another table whose leading columns line up with the target key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateMatch {
    pub schema: String,
    pub table_name: String,
    /// Ordered by ordinal position
    pub matched_columns: Vec<MatchedColumn>,
    pub match_count: usize,
    pub confidence: f64,
    pub category: Category,
}

impl CandidateMatch {
    /// Build a scored and categorized candidate. Columns beyond the key
    /// window are dropped so that `match_count` never exceeds it.
    pub fn new(
        schema: impl Into<String>,
        table_name: impl Into<String>,
        mut matched_columns: Vec<MatchedColumn>,
    ) -> Self {
        let table_name = table_name.into();
        matched_columns.sort_by_key(|c| c.ordinal_position);
        matched_columns.dedup_by_key(|c| c.ordinal_position);
        matched_columns.retain(|c| c.ordinal_position >= 1 && c.ordinal_position <= KEY_POSITIONS);

        let match_count = matched_columns.len();
        let category = Category::classify(&table_name);

        Self {
            schema: schema.into(),
            confidence: confidence_for(match_count),
            category,
            table_name,
            matched_columns,
            match_count,
        }
    }

    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.table_name)
    }

    /// Confidence as a whole percentage, for display
    pub fn confidence_pct(&self) -> u32 {
        (self.confidence * 100.0).round() as u32
    }
}

/// `match_count / 9`, clamped to [0, 1]
pub fn confidence_for(match_count: usize) -> f64 {
    (match_count as f64 / KEY_POSITIONS as f64).clamp(0.0, 1.0)
}

/// Sort best first: confidence desc, match count desc, then name
pub fn rank_candidates(candidates: &mut [CandidateMatch]) {
    candidates.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then_with(|| b.match_count.cmp(&a.match_count))
            .then_with(|| a.table_name.cmp(&b.table_name))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(name: &str, key: &str, position: usize) -> MatchedColumn {
        MatchedColumn {
            column_name: name.to_string(),
            data_type: "int".to_string(),
            ordinal_position: position,
            key_column: key.to_string(),
        }
    }

    #[test]
    fn test_confidence_is_fraction_of_nine() {
        assert_eq!(confidence_for(9), 1.0);
        assert_eq!(confidence_for(3), 3.0 / 9.0);
        assert_eq!(confidence_for(0), 0.0);
        assert_eq!(confidence_for(12), 1.0);
    }

    #[test]
    fn test_candidate_counts_and_categorizes() {
        let candidate = CandidateMatch::new(
            "dbo",
            "Fst002",
            vec![
                column("Clsuc", "Ppsuc", 3),
                column("Pgcod", "Pgcod", 1),
                column("Clmod", "Ppmod", 2),
            ],
        );

        assert_eq!(candidate.match_count, 3);
        assert_eq!(candidate.match_count, candidate.matched_columns.len());
        assert!((candidate.confidence - 0.333).abs() < 0.001);
        assert_eq!(candidate.category, Category::BantotalStandard);
        assert_eq!(candidate.matched_columns[0].column_name, "Pgcod");
        assert_eq!(candidate.confidence_pct(), 33);
    }

    #[test]
    fn test_candidate_ignores_positions_outside_window() {
        let candidate = CandidateMatch::new(
            "dbo",
            "Cliente_Productos",
            vec![column("Pgcod", "Pgcod", 1), column("Extra", "Extra", 10)],
        );
        assert_eq!(candidate.match_count, 1);
        assert_eq!(candidate.category, Category::BancariaPersonalizada);
    }

    #[test]
    fn test_search_window_caps_at_nine() {
        let names = (1..=11).map(|i| format!("K{}", i)).collect();
        let key = TableKey::new("dbo", "Fsd601", names);
        assert_eq!(key.columns.len(), 11);
        assert_eq!(key.search_window().len(), KEY_POSITIONS);
        assert_eq!(key.search_window()[8].position, 9);
    }

    #[test]
    fn test_ranking_breaks_ties_by_name() {
        let mut candidates = vec![
            CandidateMatch::new("dbo", "Fsr001", vec![column("Pgcod", "Pgcod", 1), column("Remod", "Ppmod", 2)]),
            CandidateMatch::new("dbo", "Fsd010", vec![column("Pgcod", "Pgcod", 1), column("Aomod", "Ppmod", 2)]),
            CandidateMatch::new(
                "dbo",
                "Fst001",
                vec![column("Pgcod", "Pgcod", 1), column("Scmod", "Ppmod", 2), column("Scsuc", "Ppsuc", 3)],
            ),
        ];

        rank_candidates(&mut candidates);
        let names: Vec<_> = candidates.iter().map(|c| c.table_name.as_str()).collect();
        assert_eq!(names, vec!["Fst001", "Fsd010", "Fsr001"]);
    }
}
