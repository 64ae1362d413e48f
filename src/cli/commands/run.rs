//! `survey-pivot run` - refresh the cached pivot view and preview it

use console::style;
use miette::Result;

use crate::cli::commands::utils::{connect, load_config, status};
use crate::cli::table::render;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::cache::{CacheDecision, ViewCache};

#[derive(clap::Args, Debug, Default)]
pub struct RunArgs {
    /// Preview format
    #[arg(long, short = 'f', default_value = "table")]
    pub format: OutputFormat,

    /// Number of rows to preview (default: `preview_rows` from the config)
    #[arg(long, short = 'n')]
    pub rows: Option<usize>,
}

pub fn run(args: RunArgs, global: &GlobalOpts) -> Result<()> {
    let config = load_config(global)?;
    let db = connect(&config, global)?;
    let cache = ViewCache::new(config.cache_location());

    let had_structure = cache.location().structure_path().exists();
    if had_structure {
        status(global, "View of survey structure already saved");
    }

    let refresh = cache.refresh(&db)?;

    match refresh.decision {
        CacheDecision::Reuse => {
            status(global, "View of survey structure hasn't been updated");
            status(global, "Loading previous view of all data");
        }
        CacheDecision::Update => {
            status(global, "View of survey structure has been updated");
            status(global, "Saving the new structure and view of all data");
        }
        CacheDecision::Create if had_structure => {
            status(
                global,
                "View of survey structure hasn't been updated, but no view of all data is saved",
            );
            status(global, "Saving the current view of all data");
        }
        CacheDecision::Create => {
            status(global, "No view of survey structure is saved");
            status(global, "Saving the current structure and view of all data");
        }
    }

    if !global.quiet {
        println!(
            "{} {} row(s), {} question column(s)",
            style("✓").green(),
            refresh.view.len(),
            refresh.structure.question_ids().len()
        );
        println!();
    }

    let rows = args.rows.unwrap_or(config.preview_rows);
    println!("{}", render(&refresh.view.head(rows), args.format)?);

    Ok(())
}
