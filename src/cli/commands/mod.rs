//! CLI command implementations

pub mod utils;

pub mod completions;
pub mod export;
pub mod run;
pub mod sql;
pub mod status;
pub mod structure;
