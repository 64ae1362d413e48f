//! Semicolon-delimited cache files
//!
//! Structure file: `SurveyId;QuestionId;IsAsked` with a header row.
//! View file: a leading row-index column, then the pivot columns. Null cells
//! are written empty and read back as null.

use std::fs;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, WriterBuilder};

use super::CacheError;
use crate::core::structure::{StructureRecord, StructureSnapshot, STRUCTURE_HEADER};
use crate::core::table::PivotTable;

const DELIMITER: u8 = b';';

fn ensure_parent(path: &Path) -> Result<(), CacheError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| CacheError::io(path, e))?;
        }
    }
    Ok(())
}

pub fn write_structure(path: &Path, snapshot: &StructureSnapshot) -> Result<(), CacheError> {
    ensure_parent(path)?;
    let mut writer = WriterBuilder::new()
        .delimiter(DELIMITER)
        .from_path(path)
        .map_err(|e| CacheError::csv(path, e))?;

    writer
        .write_record(STRUCTURE_HEADER)
        .map_err(|e| CacheError::csv(path, e))?;
    for record in snapshot.records() {
        writer
            .write_record([
                record.survey_id.to_string(),
                record.question_id.to_string(),
                record.asked_flag().to_string(),
            ])
            .map_err(|e| CacheError::csv(path, e))?;
    }
    writer.flush().map_err(|e| CacheError::io(path, e))?;
    Ok(())
}

/// Read a structure file. A leading index column is skipped when the header
/// carries four fields.
pub fn read_structure(path: &Path) -> Result<StructureSnapshot, CacheError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(DELIMITER)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| CacheError::csv(path, e))?;

    let headers = reader.headers().map_err(|e| CacheError::csv(path, e))?;
    let offset = match headers.len() {
        3 => 0,
        4 => 1,
        n => {
            return Err(CacheError::Malformed {
                path: path.to_path_buf(),
                line: 1,
                message: format!("expected 3 structure columns, found {}", n),
            })
        }
    };

    let mut records = Vec::new();
    for (i, row) in reader.records().enumerate() {
        let row = row.map_err(|e| CacheError::csv(path, e))?;
        // header is line 1
        let line = i + 2;
        let field = |idx: usize| row.get(offset + idx).unwrap_or("");
        let record = StructureRecord::from_text_fields(field(0), field(1), field(2)).map_err(
            |e| CacheError::Malformed {
                path: path.to_path_buf(),
                line,
                message: e.to_string(),
            },
        )?;
        records.push(record);
    }
    Ok(StructureSnapshot::new(records))
}

pub fn write_view(path: &Path, table: &PivotTable) -> Result<(), CacheError> {
    ensure_parent(path)?;
    let mut writer = WriterBuilder::new()
        .delimiter(DELIMITER)
        .from_path(path)
        .map_err(|e| CacheError::csv(path, e))?;

    let mut header = StringRecord::new();
    header.push_field("");
    for column in table.columns() {
        header.push_field(column);
    }
    writer
        .write_record(&header)
        .map_err(|e| CacheError::csv(path, e))?;

    for (index, row) in table.rows().iter().enumerate() {
        let mut record = StringRecord::new();
        record.push_field(&index.to_string());
        for cell in row {
            record.push_field(cell.as_deref().unwrap_or(""));
        }
        writer
            .write_record(&record)
            .map_err(|e| CacheError::csv(path, e))?;
    }
    writer.flush().map_err(|e| CacheError::io(path, e))?;
    Ok(())
}

/// Read a view file, dropping the row-index column.
///
/// Empty cells always read back as null, including answers that were empty
/// strings; the file format cannot tell the two apart.
pub fn read_view(path: &Path) -> Result<PivotTable, CacheError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(DELIMITER)
        .flexible(true)
        .from_path(path)
        .map_err(|e| CacheError::csv(path, e))?;

    let columns: Vec<String> = reader
        .headers()
        .map_err(|e| CacheError::csv(path, e))?
        .iter()
        .skip(1)
        .map(String::from)
        .collect();

    let mut table = PivotTable::new(columns);
    for row in reader.records() {
        let row = row.map_err(|e| CacheError::csv(path, e))?;
        table.push_row(
            row.iter()
                .skip(1)
                .map(|cell| (!cell.is_empty()).then(|| cell.to_string()))
                .collect(),
        );
    }
    Ok(table)
}
