//! Table output for result previews and structure listings

use miette::{IntoDiagnostic, Result};
use tabled::{builder::Builder, settings::Style};

use crate::cli::OutputFormat;
use crate::core::table::PivotTable;

/// Placeholder shown for null cells in aligned tables
const NULL_CELL: &str = "NaN";

/// Render a table as aligned text
pub fn render_table(table: &PivotTable) -> String {
    let mut builder = Builder::default();
    let mut header = vec![String::new()];
    header.extend(table.columns().iter().cloned());
    builder.push_record(header);

    for (index, row) in table.rows().iter().enumerate() {
        let mut record = vec![index.to_string()];
        record.extend(
            row.iter()
                .map(|cell| cell.clone().unwrap_or_else(|| NULL_CELL.to_string())),
        );
        builder.push_record(record);
    }

    builder.build().with(Style::psql()).to_string()
}

/// Render a table as semicolon-separated text
pub fn render_csv(table: &PivotTable) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .from_writer(Vec::new());
    writer.write_record(table.columns()).into_diagnostic()?;
    for row in table.rows() {
        writer
            .write_record(row.iter().map(|cell| cell.as_deref().unwrap_or("")))
            .into_diagnostic()?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| miette::miette!("{}", e))?;
    String::from_utf8(bytes).into_diagnostic()
}

/// Render a table in the requested format
pub fn render(table: &PivotTable, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Table => Ok(render_table(table)),
        OutputFormat::Csv => render_csv(table),
        OutputFormat::Json => serde_json::to_string_pretty(&table.to_json_rows()).into_diagnostic(),
    }
}
