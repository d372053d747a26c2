//! Explorer configuration
//!
//! Row caps and plan thresholds are tunable; the 9-position key window and
//! the minimum match count live in [`crate::candidate`] as domain constants.

use crate::error::{JoinError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration for a relationship exploration session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorerConfig {
    /// Schema used when the caller does not qualify the table name
    pub default_schema: String,

    /// JOIN plan synthesis settings
    pub plans: PlanConfig,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            default_schema: "dbo".to_string(),
            plans: PlanConfig::default(),
        }
    }
}

/// Settings for the three plan templates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanConfig {
    /// `TOP n` for the single best JOIN
    pub single_join_row_cap: u32,

    /// `TOP n` for the multi-table JOIN
    pub multi_join_row_cap: u32,

    /// Candidates below this confidence are left out of the multi-table JOIN
    pub multi_join_min_confidence: f64,

    /// Maximum number of joined tables in the multi-table JOIN
    pub max_joins: usize,

    /// Candidates below this confidence are left out of the row-count analysis
    pub analysis_min_confidence: f64,

    /// Maximum number of related tables in the row-count analysis
    pub analysis_max_tables: usize,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            single_join_row_cap: 1000,
            multi_join_row_cap: 500,
            multi_join_min_confidence: 0.3,
            max_joins: 3,
            analysis_min_confidence: 0.2,
            analysis_max_tables: 5,
        }
    }
}

impl ExplorerConfig {
    /// Load configuration from a JSON file. Fields missing from the file keep
    /// their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| JoinError::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        let config: ExplorerConfig = serde_json::from_str(&content)
            .map_err(|e| JoinError::Config(format!("Failed to parse {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject thresholds outside [0, 1] and zero row caps or table limits
    pub fn validate(&self) -> Result<()> {
        if self.default_schema.trim().is_empty() {
            return Err(JoinError::Config("default_schema must not be empty".to_string()));
        }

        let plans = &self.plans;
        for (name, value) in [
            ("multi_join_min_confidence", plans.multi_join_min_confidence),
            ("analysis_min_confidence", plans.analysis_min_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(JoinError::Config(format!(
                    "{} must be between 0 and 1, got {}",
                    name, value
                )));
            }
        }

        if plans.single_join_row_cap == 0 || plans.multi_join_row_cap == 0 {
            return Err(JoinError::Config("row caps must be greater than zero".to_string()));
        }

        for (name, value) in [
            ("max_joins", plans.max_joins),
            ("analysis_max_tables", plans.analysis_max_tables),
        ] {
            if value == 0 {
                return Err(JoinError::Config(format!("{} must be greater than zero", name)));
            }
        }

        Ok(())
    }
}
