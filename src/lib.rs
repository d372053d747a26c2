pub mod candidate;
pub mod catalog;
pub mod category;
pub mod config;
pub mod convention;
pub mod discovery;
pub mod error;
pub mod planner;
pub mod report;
pub mod sql;

pub use candidate::{CandidateMatch, KeyColumn, MatchedColumn, TableKey};
pub use catalog::{CatalogReader, CatalogSnapshot, PgCatalogReader};
pub use category::Category;
pub use config::{ExplorerConfig, PlanConfig};
pub use discovery::{Exploration, RelationshipExplorer};
pub use error::{JoinError, Result};
pub use planner::{JoinPlan, JoinPlanner, PlanKind};
