//! In-memory result tables
//!
//! A `PivotTable` is the flattened view the pivot query returns: named
//! columns and rows of nullable text cells.

use serde_json::{Map, Value};

/// Rows shown by default when previewing a table
pub const DEFAULT_PREVIEW_ROWS: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PivotTable {
    columns: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl PivotTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn with_rows(columns: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        Self { columns, rows }
    }

    /// Append a row; short rows are padded with nulls, long rows truncated
    pub fn push_row(&mut self, mut row: Vec<Option<String>>) {
        row.resize(self.columns.len(), None);
        self.rows.push(row);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Option<String>>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The first `n` rows
    pub fn head(&self, n: usize) -> PivotTable {
        PivotTable {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }

    /// Rows as JSON objects keyed by column name, nulls kept as `null`
    pub fn to_json_rows(&self) -> Vec<Value> {
        self.rows
            .iter()
            .map(|row| {
                let mut obj = Map::new();
                for (col, cell) in self.columns.iter().zip(row) {
                    let value = match cell {
                        Some(text) => Value::String(text.clone()),
                        None => Value::Null,
                    };
                    obj.insert(col.clone(), value);
                }
                Value::Object(obj)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PivotTable {
        let mut table = PivotTable::new(vec!["UserId".into(), "Answer_1".into()]);
        for i in 0..8 {
            table.push_row(vec![Some(i.to_string()), None]);
        }
        table
    }

    #[test]
    fn test_head_limits_rows() {
        let head = sample().head(DEFAULT_PREVIEW_ROWS);
        assert_eq!(head.len(), 5);
        assert_eq!(head.columns(), sample().columns());
        assert_eq!(sample().head(100).len(), 8);
    }

    #[test]
    fn test_push_row_pads_to_width() {
        let mut table = PivotTable::new(vec!["a".into(), "b".into(), "c".into()]);
        table.push_row(vec![Some("1".into())]);
        assert_eq!(table.rows()[0], vec![Some("1".to_string()), None, None]);
    }

    #[test]
    fn test_json_rows_keep_nulls() {
        let rows = sample().head(1).to_json_rows();
        assert_eq!(rows[0]["UserId"], Value::String("0".into()));
        assert_eq!(rows[0]["Answer_1"], Value::Null);
    }
}
