//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::{
    completions::CompletionsArgs, export::ExportArgs, run::RunArgs, sql::SqlArgs,
    structure::StructureArgs,
};

#[derive(Parser)]
#[command(name = "survey-pivot")]
#[command(author, version, about = "Survey pivot view builder")]
#[command(long_about = "Infers which questions each survey asked, builds a one-row-per-user pivot view \
of the answers and caches it until the survey structure changes.\n\n\
Without a subcommand the full pipeline runs (same as `survey-pivot run`).")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug, Default)]
pub struct GlobalOpts {
    /// Configuration file (default: ./survey-pivot.yaml, then the user config dir)
    #[arg(long, short = 'c', global = true, env = "SURVEY_PIVOT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Enable verbose output (debug logging)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Refresh the cached pivot view and preview it (default)
    Run(RunArgs),

    /// Print the synthesized pivot query without executing it
    Sql(SqlArgs),

    /// Print the inferred survey structure
    Structure(StructureArgs),

    /// Show the state of the cache files
    Status,

    /// Export every answer with user, question and survey details
    Export(ExportArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Aligned table
    #[default]
    Table,
    /// Semicolon-separated values, like the cache files
    Csv,
    /// JSON array of objects
    Json,
}
