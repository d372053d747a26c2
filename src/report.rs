//! Human-facing output: SQL files, console summaries, category statistics

use crate::candidate::{CandidateMatch, KEY_POSITIONS};
use crate::category::Category;
use crate::discovery::Exploration;
use crate::error::Result;
use crate::sql::comment_text;
use chrono::Local;
use itertools::Itertools;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;
use tracing::info;

/// Per-category aggregate over a candidate list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySummary {
    pub category: Category,
    pub tables: Vec<String>,
    pub average_confidence: f64,
}

impl CategorySummary {
    pub fn count(&self) -> usize {
        self.tables.len()
    }
}

/// Group candidates by category, highest average confidence first
pub fn category_summary(candidates: &[CandidateMatch]) -> Vec<CategorySummary> {
    let mut grouped: BTreeMap<Category, Vec<&CandidateMatch>> = BTreeMap::new();
    for candidate in candidates {
        grouped.entry(candidate.category).or_default().push(candidate);
    }

    let mut summaries: Vec<CategorySummary> = grouped
        .into_iter()
        .map(|(category, members)| CategorySummary {
            category,
            average_confidence: members.iter().map(|c| c.confidence).sum::<f64>() / members.len() as f64,
            tables: members.iter().map(|c| c.table_name.clone()).collect(),
        })
        .collect();

    summaries.sort_by(|a, b| {
        b.average_confidence
            .total_cmp(&a.average_confidence)
            .then_with(|| a.category.cmp(&b.category))
    });
    summaries
}

/// Render the plans of one exploration as a `.sql` script
pub fn render_sql_script(exploration: &Exploration) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "-- JOIN plans for {}", comment_text(&exploration.qualified_name()));
    let _ = writeln!(out, "-- Generated: {}", Local::now().format("%Y-%m-%d %H:%M:%S"));

    for (idx, plan) in exploration.plans.iter().enumerate() {
        let _ = writeln!(out);
        let _ = writeln!(out, "-- {}. {}", idx + 1, comment_text(&plan.description));
        let _ = writeln!(out, "-- Tables: {}", comment_text(&plan.tables.join(", ")));
        let _ = writeln!(out, "-- Confidence: {}%", plan.confidence_pct());
        let _ = writeln!(out, "{};", plan.sql);
    }

    out
}

/// Write the plans of one exploration to `path`
pub fn write_sql_file(path: impl AsRef<Path>, exploration: &Exploration) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    std::fs::write(path, render_sql_script(exploration))?;
    info!("💾 {} plans written to {}", exploration.plans.len(), path.display());
    Ok(())
}

/// Console summary of an exploration
pub fn render_exploration(exploration: &Exploration) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== {} ===", exploration.qualified_name());

    let key = match &exploration.key {
        Some(key) => key,
        None => {
            let _ = writeln!(out, "No primary key found");
            return out;
        }
    };

    let _ = writeln!(out, "Primary key: {}", key.column_names().join(", "));

    if exploration.candidates.is_empty() {
        let _ = writeln!(out, "No related tables found");
        return out;
    }

    let _ = writeln!(out, "\nRelated tables ({}):", exploration.candidates.len());
    for (idx, candidate) in exploration.candidates.iter().enumerate() {
        let _ = writeln!(
            out,
            "  {}. {} - {}/{} key positions, confidence {}% [{}]",
            idx + 1,
            candidate.table_name,
            candidate.match_count,
            KEY_POSITIONS,
            candidate.confidence_pct(),
            candidate.category
        );
        let columns = candidate
            .matched_columns
            .iter()
            .map(|c| format!("{}={}", c.key_column, c.column_name))
            .join(", ");
        let _ = writeln!(out, "     {}", columns);
    }

    let _ = writeln!(out, "\nBy category:");
    for summary in category_summary(&exploration.candidates) {
        let _ = writeln!(
            out,
            "  {}: {} table{}, average confidence {:.0}%",
            summary.category,
            summary.count(),
            if summary.count() == 1 { "" } else { "s" },
            summary.average_confidence * 100.0
        );
    }

    if !exploration.plans.is_empty() {
        let _ = writeln!(out, "\nJOIN plans:");
        for (idx, plan) in exploration.plans.iter().enumerate() {
            let _ = writeln!(out, "  {}. {}", idx + 1, plan.description);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::{MatchedColumn, TableKey};
    use crate::planner::JoinPlanner;
    use sqlparser::ast::Statement;
    use sqlparser::dialect::MsSqlDialect;
    use sqlparser::parser::Parser;

    fn candidate(table: &str, count: usize) -> CandidateMatch {
        let columns = (1..=count)
            .map(|position| MatchedColumn {
                column_name: format!("C{}", position),
                data_type: "int".to_string(),
                ordinal_position: position,
                key_column: format!("K{}", position),
            })
            .collect();
        CandidateMatch::new("dbo", table, columns)
    }

    fn exploration(candidates: Vec<CandidateMatch>) -> Exploration {
        let key = TableKey::new("dbo", "Fsd601", (1..=9).map(|i| format!("K{}", i)).collect());
        let plans = JoinPlanner::default().plan(&key, &candidates);
        Exploration {
            schema: "dbo".to_string(),
            table: "Fsd601".to_string(),
            key: Some(key),
            candidates,
            plans,
        }
    }

    #[test]
    fn test_category_summary_orders_by_average() {
        let summary = category_summary(&[
            candidate("Fsd010", 9),
            candidate("Fst002", 3),
            candidate("Cliente_Productos", 7),
        ]);

        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].category, Category::BancariaPersonalizada);
        assert_eq!(summary[1].category, Category::BantotalStandard);
        assert_eq!(summary[1].tables, vec!["Fsd010", "Fst002"]);
        assert!((summary[1].average_confidence - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_sql_script_layout() {
        let script = render_sql_script(&exploration(vec![candidate("Fsd010", 9)]));

        assert!(script.starts_with("-- JOIN plans for dbo.Fsd601\n-- Generated: "));
        assert!(script.contains("\n\n-- 1. JOIN with Fsd010 (confidence 100%) [Bantotal_Standard]\n"));
        assert!(script.contains("-- Tables: Fsd601, Fsd010\n-- Confidence: 100%\n"));
        assert!(script.contains("ORDER BY m.K1, m.K2;\n"));
        assert!(script.contains("-- 3. Row counts"));
    }

    #[test]
    fn test_sql_script_keeps_table_names_inside_comments() {
        let script = render_sql_script(&exploration(vec![candidate("Fsx\nDELETE FROM dbo.Fsd601 --", 2)]));

        assert!(script.contains("-- 1. JOIN with Fsx DELETE FROM dbo.Fsd601 --"));
        assert!(script.contains("-- Tables: Fsd601, Fsx DELETE FROM dbo.Fsd601 --\n"));

        // The name stays intact in identifiers and literals, so only whole statements are checked
        let statements = Parser::parse_sql(&MsSqlDialect {}, &script).unwrap();
        assert_eq!(statements.len(), 2);
        assert!(statements.iter().all(|s| matches!(s, Statement::Query(_))));
    }

    #[test]
    fn test_write_sql_file() {
        let path = std::env::temp_dir().join("bantotal_joins_report_test").join("fsd601.sql");
        write_sql_file(&path, &exploration(vec![candidate("Fsd010", 9)])).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("INNER JOIN dbo.Fsd010 t1"));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_render_without_key() {
        let exploration = Exploration {
            schema: "dbo".to_string(),
            table: "Parametros".to_string(),
            key: None,
            candidates: vec![],
            plans: vec![],
        };
        let text = render_exploration(&exploration);
        assert!(text.contains("=== dbo.Parametros ==="));
        assert!(text.contains("No primary key found"));
    }

    #[test]
    fn test_render_lists_candidates_and_plans() {
        let text = render_exploration(&exploration(vec![candidate("Fsd010", 9), candidate("Fsr001", 2)]));
        assert!(text.contains("1. Fsd010 - 9/9 key positions, confidence 100% [Bantotal_Standard]"));
        assert!(text.contains("K2=C2"));
        assert!(text.contains("Bantotal_Standard: 2 tables"));
        assert!(text.contains("JOIN plans:"));
    }
}
