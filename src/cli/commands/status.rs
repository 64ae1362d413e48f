//! `survey-pivot status` - show the state of the cache files
//!
//! Reads only the cache files; the database is never contacted.

use std::path::Path;

use chrono::{DateTime, Local};
use console::style;
use miette::Result;

use crate::cli::commands::utils::load_config;
use crate::cli::GlobalOpts;
use crate::core::cache::{read_structure, read_view, ViewCache};

pub fn run(global: &GlobalOpts) -> Result<()> {
    let config = load_config(global)?;
    let cache = ViewCache::new(config.cache_location());
    let location = cache.location();

    println!("{}", style("Cache Status").bold());
    println!("{}", style("─".repeat(40)).dim());
    println!("  Database:        {}", config.target().path().display());

    println!();
    println!("  {}", style("Structure").bold());
    print_file(location.structure_path());
    if location.structure_path().is_file() {
        match read_structure(location.structure_path()) {
            Ok(snapshot) => {
                println!("    Records:       {}", style(snapshot.len()).cyan());
                println!("    Surveys:       {}", style(snapshot.survey_ids().len()).cyan());
                println!("    Questions:     {}", style(snapshot.question_ids().len()).cyan());
                println!("    Fingerprint:   {}", style(snapshot.fingerprint()).dim());
            }
            Err(e) => println!("    {} {}", style("unreadable:").red(), e),
        }
    }

    println!();
    println!("  {}", style("View").bold());
    print_file(location.view_path());
    if cache.has_view() {
        match read_view(location.view_path()) {
            Ok(view) => {
                println!("    Rows:          {}", style(view.len()).cyan());
                println!("    Columns:       {}", style(view.columns().len()).cyan());
            }
            Err(e) => println!("    {} {}", style("unreadable:").red(), e),
        }
    }

    Ok(())
}

fn print_file(path: &Path) {
    println!("    Location:      {}", path.display());
    match std::fs::metadata(path) {
        Ok(meta) => {
            let modified = meta
                .modified()
                .map(|t| DateTime::<Local>::from(t).format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|_| "-".to_string());
            println!("    Modified:      {}", modified);
            println!("    Size:          {} bytes", meta.len());
        }
        Err(_) => println!("    {}", style("not saved").yellow()),
    }
}
