//! Core module - structure inference, pivot synthesis and the view cache

pub mod cache;
pub mod config;
pub mod database;
pub mod pivot;
pub mod structure;
pub mod table;

pub use cache::{CacheDecision, CacheLocation, Refresh, ViewCache};
pub use config::{Config, ConfigError};
pub use database::{ConnectionTarget, DbError, SurveyDatabase};
pub use pivot::{ColumnExpr, PivotPlan, SelectBlock};
pub use structure::{infer_structure, StructureRecord, StructureSnapshot};
pub use table::PivotTable;
