//! `survey-pivot structure` - print the inferred survey structure

use miette::{IntoDiagnostic, Result};

use crate::cli::commands::utils::{connect, load_config};
use crate::cli::table::render;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::structure::{infer_structure, StructureSnapshot, STRUCTURE_HEADER};
use crate::core::table::PivotTable;

#[derive(clap::Args, Debug)]
pub struct StructureArgs {
    /// Output format
    #[arg(long, short = 'f', default_value = "table")]
    pub format: OutputFormat,
}

pub fn run(args: StructureArgs, global: &GlobalOpts) -> Result<()> {
    let config = load_config(global)?;
    let db = connect(&config, global)?;
    let snapshot = infer_structure(&db)?;

    let output = match args.format {
        OutputFormat::Json => serde_json::to_string_pretty(&snapshot).into_diagnostic()?,
        format => render(&structure_table(&snapshot), format)?,
    };
    println!("{}", output);
    Ok(())
}

fn structure_table(snapshot: &StructureSnapshot) -> PivotTable {
    PivotTable::with_rows(
        STRUCTURE_HEADER.iter().map(|h| h.to_string()).collect(),
        snapshot
            .records()
            .iter()
            .map(|r| {
                vec![
                    Some(r.survey_id.to_string()),
                    Some(r.question_id.to_string()),
                    Some(r.asked_flag().to_string()),
                ]
            })
            .collect(),
    )
}
