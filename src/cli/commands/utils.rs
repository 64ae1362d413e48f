//! Shared utilities for CLI commands

use console::style;
use miette::Result;

use crate::cli::GlobalOpts;
use crate::core::config::Config;
use crate::core::database::SurveyDatabase;

/// Load the configuration named by the global options.
///
/// A missing file is fatal and reported before any connection attempt.
pub fn load_config(global: &GlobalOpts) -> Result<Config> {
    let config = Config::load(global.config.as_deref())?;
    tracing::debug!(server = %config.server, database = %config.database, "configuration loaded");
    Ok(config)
}

/// Connect to the configured database and report it
pub fn connect(config: &Config, global: &GlobalOpts) -> Result<SurveyDatabase> {
    let target = config.target();
    let db = match SurveyDatabase::connect(&target) {
        Ok(db) => db,
        Err(e) => {
            eprintln!("{} Connection failed", style("/!\\").red().bold());
            return Err(e.into());
        }
    };
    if !global.quiet {
        println!("{} connected to {}", style("✓").green(), style(&target).cyan());
    }
    Ok(db)
}

/// Print a status line unless output is quiet
pub fn status(global: &GlobalOpts, message: impl std::fmt::Display) {
    if !global.quiet {
        println!("{} {}", style("→").blue(), message);
    }
}
