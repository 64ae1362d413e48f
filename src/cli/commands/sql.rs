//! `survey-pivot sql` - print the synthesized pivot query

use console::style;
use miette::Result;

use crate::cli::commands::utils::{connect, load_config};
use crate::cli::GlobalOpts;
use crate::core::pivot::PivotPlan;
use crate::core::structure::infer_structure;

#[derive(clap::Args, Debug)]
pub struct SqlArgs {
    /// Only print the SELECT block of this survey
    #[arg(long, short = 's')]
    pub survey: Option<i64>,
}

pub fn run(args: SqlArgs, global: &GlobalOpts) -> Result<()> {
    let config = load_config(global)?;
    let db = connect(&config, global)?;
    let plan = PivotPlan::from_snapshot(&infer_structure(&db)?);

    let sql = match args.survey {
        Some(survey_id) => plan
            .block(survey_id)
            .map(|block| block.to_sql())
            .ok_or_else(|| miette::miette!("Survey {} has no structure rows", survey_id))?,
        None => plan.render(),
    };

    if sql.is_empty() {
        eprintln!("{} No survey structure found", style("!").yellow());
    } else {
        println!("{}", sql);
    }
    Ok(())
}
