//! JOIN Plan Synthesis
//!
//! Turns ranked candidates into up to three presentable statements:
//! 1. the single best INNER JOIN,
//! 2. a LEFT JOIN across the strongest few candidates,
//! 3. a UNION ALL row-count comparison across the related tables.
//!
//! Each template is emitted only when at least one candidate clears its
//! threshold. Synthesis is pure: no catalog access, no retries.

use crate::candidate::{rank_candidates, CandidateMatch, TableKey, KEY_POSITIONS};
use crate::category::Category;
use crate::config::PlanConfig;
use crate::convention::position_label;
use crate::sql::{ColumnRef, Equality, JoinClause, JoinKind, Select, SelectItem, TableRef, UnionAll};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

const MAIN_ALIAS: &str = "m";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlanKind {
    SingleJoin,
    MultiJoin,
    RowCountAnalysis,
}

/// A synthesized SQL statement relating the target to its candidates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinPlan {
    pub kind: PlanKind,
    pub description: String,
    pub sql: String,
    /// Target first, then contributing tables
    pub tables: Vec<String>,
    /// Aligned key positions across contributing tables
    pub common_fields: usize,
    /// Mean confidence of contributing candidates
    pub confidence: f64,
    /// Distinct categories of contributing candidates, in rank order
    pub categories: Vec<Category>,
}

impl JoinPlan {
    pub fn confidence_pct(&self) -> u32 {
        (self.confidence * 100.0).round() as u32
    }
}

pub struct JoinPlanner {
    config: PlanConfig,
}

impl Default for JoinPlanner {
    fn default() -> Self {
        Self::new(PlanConfig::default())
    }
}

impl JoinPlanner {
    pub fn new(config: PlanConfig) -> Self {
        Self { config }
    }

    /// Build every plan the candidates support, in template order
    pub fn plan(&self, key: &TableKey, candidates: &[CandidateMatch]) -> Vec<JoinPlan> {
        let mut ranked = candidates.to_vec();
        rank_candidates(&mut ranked);

        [
            self.single_join(key, &ranked),
            self.multi_join(key, &ranked),
            self.row_count_analysis(key, &ranked),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// INNER JOIN with the highest ranked candidate
    pub fn single_join(&self, key: &TableKey, ranked: &[CandidateMatch]) -> Option<JoinPlan> {
        let best = ranked.first()?;
        let alias = "t1";

        let mut select = Select::new(main_table(key))
            .comment(format!(
                "JOIN with the most related table: {} ({}/{} key positions)",
                best.qualified_name(),
                best.match_count,
                KEY_POSITIONS
            ))
            .top(self.config.single_join_row_cap)
            .item(SelectItem::AllFrom(MAIN_ALIAS.to_string()))
            .item(SelectItem::AllFrom(alias.to_string()))
            .join(join_clause(JoinKind::Inner, best, alias, None));

        for column in key.columns.iter().take(2) {
            select = select.order_by(ColumnRef::new(MAIN_ALIAS, column.name.clone()));
        }

        Some(JoinPlan {
            kind: PlanKind::SingleJoin,
            description: format!(
                "JOIN with {} (confidence {}%) [{}]",
                best.table_name,
                best.confidence_pct(),
                best.category
            ),
            sql: select.render(),
            tables: vec![key.table.clone(), best.table_name.clone()],
            common_fields: best.match_count,
            confidence: best.confidence,
            categories: vec![best.category],
        })
    }

    /// LEFT JOIN with up to `max_joins` candidates above the multi-join threshold
    pub fn multi_join(&self, key: &TableKey, ranked: &[CandidateMatch]) -> Option<JoinPlan> {
        let selected: Vec<&CandidateMatch> = ranked
            .iter()
            .filter(|c| c.confidence >= self.config.multi_join_min_confidence)
            .take(self.config.max_joins)
            .collect();

        if selected.is_empty() {
            return None;
        }

        let mut select = Select::new(main_table(key))
            .comment(format!(
                "Multi-table JOIN: {} related table{} with confidence >= {}%",
                selected.len(),
                plural(selected.len()),
                pct(self.config.multi_join_min_confidence)
            ))
            .top(self.config.multi_join_row_cap)
            .item(SelectItem::AllFrom(MAIN_ALIAS.to_string()));

        for (idx, candidate) in selected.iter().enumerate() {
            let alias = format!("t{}", idx + 1);
            let comment = format!(
                "{}: {} - confidence {}% ({}/{} key positions) [{}]",
                alias,
                candidate.qualified_name(),
                candidate.confidence_pct(),
                candidate.match_count,
                KEY_POSITIONS,
                candidate.category
            );
            select = select
                .item(SelectItem::AllFrom(alias.clone()))
                .join(join_clause(JoinKind::Left, candidate, &alias, Some(comment)));
        }

        let confidence = mean_confidence(&selected);
        let categories = distinct_categories(&selected);

        Some(JoinPlan {
            kind: PlanKind::MultiJoin,
            description: format!(
                "Multi-table JOIN with {} related table{} (average confidence: {}%) [Categories: {}]",
                selected.len(),
                plural(selected.len()),
                pct(confidence),
                categories.iter().map(|c| c.as_str()).join(", ")
            ),
            sql: select.render(),
            tables: std::iter::once(key.table.clone())
                .chain(selected.iter().map(|c| c.table_name.clone()))
                .collect(),
            common_fields: selected.iter().map(|c| c.match_count).sum(),
            confidence,
            categories,
        })
    }

    /// Row counts of the target and up to `analysis_max_tables` related tables
    pub fn row_count_analysis(&self, key: &TableKey, ranked: &[CandidateMatch]) -> Option<JoinPlan> {
        let selected: Vec<&CandidateMatch> = ranked
            .iter()
            .filter(|c| c.confidence >= self.config.analysis_min_confidence)
            .take(self.config.analysis_max_tables)
            .collect();

        if selected.is_empty() {
            return None;
        }

        let count_row = |table: TableRef, name: &str, confidence: f64| {
            Select::new(table)
                .item(SelectItem::Literal {
                    value: name.to_string(),
                    alias: "table_name".to_string(),
                })
                .item(SelectItem::CountAll {
                    alias: "total_rows".to_string(),
                })
                .item(SelectItem::Number {
                    value: confidence * 100.0,
                    alias: "confidence_pct".to_string(),
                })
        };

        let mut selects = vec![count_row(main_table_unaliased(key), &key.table, 1.0)];
        selects.extend(selected.iter().map(|c| {
            count_row(TableRef::new(c.schema.clone(), c.table_name.clone()), &c.table_name, c.confidence)
        }));

        let union = UnionAll {
            comments: vec![format!(
                "Row counts for {} and {} related table{}",
                key.qualified_name(),
                selected.len(),
                plural(selected.len())
            )],
            selects,
            order_by_desc: Some("confidence_pct".to_string()),
        };

        let confidence = mean_confidence(&selected);
        let categories = distinct_categories(&selected);

        Some(JoinPlan {
            kind: PlanKind::RowCountAnalysis,
            description: format!(
                "Row counts per table (top {} with confidence >= {}%) [Categories: {}]",
                selected.len(),
                pct(self.config.analysis_min_confidence),
                categories.iter().map(|c| c.as_str()).join(", ")
            ),
            sql: union.render(),
            tables: std::iter::once(key.table.clone())
                .chain(selected.iter().map(|c| c.table_name.clone()))
                .collect(),
            common_fields: 0,
            confidence,
            categories,
        })
    }
}

fn main_table(key: &TableKey) -> TableRef {
    main_table_unaliased(key).aliased(MAIN_ALIAS)
}

fn main_table_unaliased(key: &TableKey) -> TableRef {
    TableRef::new(key.schema.clone(), key.table.clone())
}

/// Join on every aligned position, target key column to candidate column
fn join_clause(kind: JoinKind, candidate: &CandidateMatch, alias: &str, comment: Option<String>) -> JoinClause {
    let conditions = candidate
        .matched_columns
        .iter()
        .take(KEY_POSITIONS)
        .map(|column| Equality {
            left: ColumnRef::new(MAIN_ALIAS, column.key_column.clone()),
            right: ColumnRef::new(alias, column.column_name.clone()),
        })
        .collect();

    let comment = comment.or_else(|| {
        let positions = candidate
            .matched_columns
            .iter()
            .map(|c| position_label(c.ordinal_position))
            .join(", ");
        Some(format!("Aligned on: {}", positions))
    });

    JoinClause {
        kind,
        table: TableRef::new(candidate.schema.clone(), candidate.table_name.clone()).aliased(alias),
        conditions,
        comment,
    }
}

fn mean_confidence(candidates: &[&CandidateMatch]) -> f64 {
    if candidates.is_empty() {
        return 0.0;
    }
    candidates.iter().map(|c| c.confidence).sum::<f64>() / candidates.len() as f64
}

fn distinct_categories(candidates: &[&CandidateMatch]) -> Vec<Category> {
    candidates.iter().map(|c| c.category).unique().collect()
}

fn pct(value: f64) -> u32 {
    (value * 100.0).round() as u32
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::MatchedColumn;

    const FSD601_KEY: [&str; 9] = [
        "Pgcod", "Ppmod", "Ppsuc", "Ppmda", "Pppap", "Ppcta", "Ppoper", "Ppsbop", "Pptope",
    ];

    fn key() -> TableKey {
        TableKey::new("dbo", "Fsd601", FSD601_KEY.iter().map(|s| s.to_string()).collect())
    }

    fn candidate(table: &str, prefix: &str, count: usize) -> CandidateMatch {
        let columns = FSD601_KEY
            .iter()
            .take(count)
            .enumerate()
            .map(|(idx, key_column)| MatchedColumn {
                column_name: if idx == 0 {
                    key_column.to_string()
                } else {
                    format!("{}{}", prefix, &key_column[2..])
                },
                data_type: "int".to_string(),
                ordinal_position: idx + 1,
                key_column: key_column.to_string(),
            })
            .collect();
        CandidateMatch::new("dbo", table, columns)
    }

    #[test]
    fn test_no_candidates_no_plans() {
        assert!(JoinPlanner::default().plan(&key(), &[]).is_empty());
    }

    #[test]
    fn test_single_join_uses_best_candidate() {
        let candidates = vec![candidate("Fst002", "Cl", 3), candidate("Fsd010", "Ao", 9)];
        let plan = JoinPlanner::default().single_join(&key(), &{
            let mut ranked = candidates.clone();
            rank_candidates(&mut ranked);
            ranked
        });
        let plan = plan.unwrap();

        assert_eq!(plan.kind, PlanKind::SingleJoin);
        assert_eq!(plan.tables, vec!["Fsd601", "Fsd010"]);
        assert_eq!(plan.common_fields, 9);
        assert_eq!(plan.confidence, 1.0);
        assert!(plan.sql.contains("SELECT TOP 1000"));
        assert!(plan.sql.contains("INNER JOIN dbo.Fsd010 t1"));
        assert!(plan.sql.contains("ON m.Pgcod = t1.Pgcod"));
        assert!(plan.sql.contains("AND m.Pptope = t1.Aotope"));
        assert!(plan.sql.ends_with("ORDER BY m.Pgcod, m.Ppmod"));
        assert_eq!(plan.description, "JOIN with Fsd010 (confidence 100%) [Bantotal_Standard]");
    }

    #[test]
    fn test_multi_join_threshold_and_limit() {
        let candidates = vec![
            candidate("Fsd010", "Ao", 9),
            candidate("Cliente_Productos", "Cp", 6),
            candidate("Fst001", "Sc", 5),
            candidate("Fsd011", "Ao", 4),
            candidate("Fsr001", "Re", 2),
        ];

        let plan = JoinPlanner::default()
            .plan(&key(), &candidates)
            .into_iter()
            .find(|p| p.kind == PlanKind::MultiJoin)
            .unwrap();

        assert_eq!(plan.tables, vec!["Fsd601", "Fsd010", "Cliente_Productos", "Fst001"]);
        assert!(plan.sql.contains("SELECT TOP 500"));
        assert!(plan.sql.contains("LEFT JOIN dbo.Fsd010 t1"));
        assert!(plan.sql.contains("LEFT JOIN dbo.Cliente_Productos t2"));
        assert!(plan.sql.contains("LEFT JOIN dbo.Fst001 t3"));
        assert!(!plan.sql.contains("Fsr001"));
        assert_eq!(plan.common_fields, 20);
        assert_eq!(
            plan.categories,
            vec![Category::BantotalStandard, Category::BancariaPersonalizada]
        );
    }

    #[test]
    fn test_analysis_includes_target_first() {
        let candidates = vec![candidate("Fst002", "Cl", 3), candidate("Fsr001", "Re", 2)];
        let plans = JoinPlanner::default().plan(&key(), &candidates);

        let multi = plans.iter().find(|p| p.kind == PlanKind::MultiJoin).unwrap();
        assert_eq!(multi.tables, vec!["Fsd601", "Fst002"]);

        let analysis = plans.iter().find(|p| p.kind == PlanKind::RowCountAnalysis).unwrap();
        assert_eq!(analysis.tables, vec!["Fsd601", "Fst002", "Fsr001"]);
        assert_eq!(analysis.common_fields, 0);
        assert!((analysis.confidence - (3.0 / 9.0 + 2.0 / 9.0) / 2.0).abs() < 1e-9);
        assert!(analysis.sql.contains("'Fsd601' AS table_name"));
        assert!(analysis.sql.contains("100.0 AS confidence_pct"));
        assert!(analysis.sql.ends_with("ORDER BY confidence_pct DESC"));
        let first_union = analysis.sql.find("UNION ALL").unwrap();
        assert!(analysis.sql.find("FROM dbo.Fsd601").unwrap() < first_union);
    }

    #[test]
    fn test_plans_drop_independently() {
        // 2/9 clears the analysis bar only
        let plans = JoinPlanner::default().plan(&key(), &[candidate("Fsr001", "Re", 2)]);
        let kinds: Vec<_> = plans.iter().map(|p| p.kind).collect();
        assert_eq!(kinds, vec![PlanKind::SingleJoin, PlanKind::RowCountAnalysis]);
    }

    #[test]
    fn test_generated_sql_parses_as_tsql() {
        use sqlparser::dialect::MsSqlDialect;
        use sqlparser::parser::Parser;

        let candidates = vec![
            candidate("Fsd010", "Ao", 9),
            candidate("Cliente_Productos", "Cp", 6),
            candidate("Fsr001", "Re", 2),
        ];
        let plans = JoinPlanner::default().plan(&key(), &candidates);
        assert_eq!(plans.len(), 3);

        for plan in plans {
            let parsed = Parser::parse_sql(&MsSqlDialect {}, &plan.sql);
            assert!(parsed.is_ok(), "{:?} failed to parse: {:?}\n{}", plan.kind, parsed.err(), plan.sql);
        }
    }

    #[test]
    fn test_short_key_orders_by_single_column() {
        let key = TableKey::new("dbo", "Fst010", vec!["Pgcod".to_string()]);
        let plan = JoinPlanner::default()
            .single_join(&key, &[candidate("Fsd010", "Ao", 2)])
            .unwrap();
        assert!(plan.sql.ends_with("ORDER BY m.Pgcod"));
    }
}
