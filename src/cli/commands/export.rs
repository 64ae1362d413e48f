//! `survey-pivot export` - write every answer with its user, question and
//! survey attributes to `<cache_dir>/<name>_view.csv`

use console::style;
use miette::Result;

use crate::cli::commands::utils::{connect, load_config};
use crate::cli::GlobalOpts;
use crate::core::cache::write_view;

#[derive(clap::Args, Debug)]
pub struct ExportArgs {
    /// File name stem; the file is `<name>_view.csv`
    #[arg(long, default_value = "all")]
    pub name: String,
}

pub fn run(args: ExportArgs, global: &GlobalOpts) -> Result<()> {
    let config = load_config(global)?;
    let db = connect(&config, global)?;

    let answers = db.all_answers()?;
    let file_name = format!("{}_view.csv", args.name);
    let path = config.cache_dir().join(&file_name);
    write_view(&path, &answers)?;

    if !global.quiet {
        println!(
            "{} [{}] saved ({} answer(s))",
            style("✓").green(),
            file_name,
            answers.len()
        );
    }
    Ok(())
}
