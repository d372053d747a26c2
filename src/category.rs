//! Table categorization by naming convention
//!
//! Categories come from an ordered rule table evaluated top to bottom; the
//! first rule whose pattern matches the table name wins and anything left
//! over is a custom business table. The same pattern vocabulary describes the
//! denylist that keeps scratch and system tables out of discovery.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Naming-convention class of a related table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Bantotal_Standard")]
    BantotalStandard,
    #[serde(rename = "Vista")]
    Vista,
    #[serde(rename = "Log")]
    Log,
    #[serde(rename = "Temporal")]
    Temporal,
    #[serde(rename = "Backup")]
    Backup,
    #[serde(rename = "Sistema")]
    Sistema,
    #[serde(rename = "Bancaria_Personalizada")]
    BancariaPersonalizada,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::BantotalStandard,
        Category::Vista,
        Category::Log,
        Category::Temporal,
        Category::Backup,
        Category::Sistema,
        Category::BancariaPersonalizada,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::BantotalStandard => "Bantotal_Standard",
            Category::Vista => "Vista",
            Category::Log => "Log",
            Category::Temporal => "Temporal",
            Category::Backup => "Backup",
            Category::Sistema => "Sistema",
            Category::BancariaPersonalizada => "Bancaria_Personalizada",
        }
    }

    /// Parse a category tag as produced by [`Category::as_str`]
    pub fn from_tag(tag: &str) -> Option<Category> {
        Category::ALL.iter().copied().find(|c| c.as_str() == tag)
    }

    /// Classify a table by name
    pub fn classify(table_name: &str) -> Category {
        CATEGORY_RULES
            .iter()
            .find(|(pattern, _)| pattern.matches(table_name))
            .map(|(_, category)| *category)
            .unwrap_or(Category::BancariaPersonalizada)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-insensitive table name pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamePattern {
    Prefix(&'static str),
    Suffix(&'static str),
    Contains(&'static str),
}

impl NamePattern {
    pub fn matches(&self, table_name: &str) -> bool {
        let name = table_name.to_ascii_lowercase();
        match self {
            NamePattern::Prefix(p) => name.starts_with(p),
            NamePattern::Suffix(s) => name.ends_with(s),
            NamePattern::Contains(c) => name.contains(c),
        }
    }

    /// Equivalent SQL `LIKE` pattern over a lower-cased name, `_` escaped
    pub fn like_pattern(&self) -> String {
        let escape = |s: &str| s.replace('_', "\\_");
        match self {
            NamePattern::Prefix(p) => format!("{}%", escape(p)),
            NamePattern::Suffix(s) => format!("%{}", escape(s)),
            NamePattern::Contains(c) => format!("%{}%", escape(c)),
        }
    }
}

/// Category rules in priority order; patterns are lower-case
pub const CATEGORY_RULES: [(NamePattern, Category); 12] = [
    (NamePattern::Prefix("fs"), Category::BantotalStandard),
    (NamePattern::Prefix("v_"), Category::Vista),
    (NamePattern::Suffix("_view"), Category::Vista),
    (NamePattern::Prefix("log_"), Category::Log),
    (NamePattern::Suffix("_log"), Category::Log),
    (NamePattern::Contains("_temp"), Category::Temporal),
    (NamePattern::Prefix("temp_"), Category::Temporal),
    (NamePattern::Contains("_bkp"), Category::Backup),
    (NamePattern::Contains("bkp_"), Category::Backup),
    (NamePattern::Contains("backup"), Category::Backup),
    (NamePattern::Prefix("sys"), Category::Sistema),
    (NamePattern::Prefix("information_schema"), Category::Sistema),
];

/// Tables never considered as relationship candidates
pub const EXCLUDED_TABLES: [NamePattern; 7] = [
    NamePattern::Suffix("_temp"),
    NamePattern::Prefix("temp_"),
    NamePattern::Suffix("_bkp"),
    NamePattern::Prefix("bkp_"),
    NamePattern::Contains("backup"),
    NamePattern::Prefix("sys"),
    NamePattern::Prefix("information_schema"),
];

/// Whether a table name hits the discovery denylist
pub fn is_excluded(table_name: &str) -> bool {
    EXCLUDED_TABLES.iter().any(|p| p.matches(table_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bantotal_prefix_is_case_insensitive() {
        assert_eq!(Category::classify("Fsd601"), Category::BantotalStandard);
        assert_eq!(Category::classify("FST002"), Category::BantotalStandard);
        assert_eq!(Category::classify("fsr001"), Category::BantotalStandard);
    }

    #[test]
    fn test_rule_order_first_match_wins() {
        // Bantotal prefix outranks the log suffix
        assert_eq!(Category::classify("Fsd010_log"), Category::BantotalStandard);
        // View prefix outranks the temp marker
        assert_eq!(Category::classify("v_saldos_temp"), Category::Vista);
    }

    #[test]
    fn test_each_category_reachable() {
        assert_eq!(Category::classify("v_Resumen_Clientes"), Category::Vista);
        assert_eq!(Category::classify("saldos_view"), Category::Vista);
        assert_eq!(Category::classify("log_Transacciones"), Category::Log);
        assert_eq!(Category::classify("auditoria_log"), Category::Log);
        assert_eq!(Category::classify("carga_temp_2024"), Category::Temporal);
        assert_eq!(Category::classify("temp_carga"), Category::Temporal);
        assert_eq!(Category::classify("cuentas_bkp_2023"), Category::Backup);
        assert_eq!(Category::classify("old_backup_cuentas"), Category::Backup);
        assert_eq!(Category::classify("sysobjects"), Category::Sistema);
        assert_eq!(Category::classify("Cliente_Productos"), Category::BancariaPersonalizada);
    }

    #[test]
    fn test_every_name_gets_exactly_one_category() {
        for name in ["", "x", "Prestamos_Detalle", "VIEW", "_log_"] {
            let category = Category::classify(name);
            assert!(Category::ALL.contains(&category));
        }
    }

    #[test]
    fn test_tag_round_trip() {
        for category in Category::ALL {
            assert_eq!(Category::from_tag(category.as_str()), Some(category));
        }
        assert_eq!(Category::from_tag("Unknown"), None);
    }

    #[test]
    fn test_denylist() {
        assert!(is_excluded("saldos_temp"));
        assert!(is_excluded("TEMP_saldos"));
        assert!(is_excluded("saldos_bkp"));
        assert!(is_excluded("bkp_saldos"));
        assert!(is_excluded("saldos_backup_2020"));
        assert!(is_excluded("sysindexes"));
        assert!(is_excluded("information_schema_columns"));
        assert!(!is_excluded("Fsd010"));
        assert!(!is_excluded("carga_temp_2024"));
    }

    #[test]
    fn test_like_patterns_escape_underscore() {
        assert_eq!(NamePattern::Suffix("_temp").like_pattern(), "%\\_temp");
        assert_eq!(NamePattern::Prefix("sys").like_pattern(), "sys%");
        assert_eq!(NamePattern::Contains("backup").like_pattern(), "%backup%");
    }
}
