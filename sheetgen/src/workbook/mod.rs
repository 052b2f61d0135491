//! Workbook input: ordered, named sheets of rows keyed by column name.
//!
//! A workbook is read either from the JSON/YAML document the download step
//! saves (`{ "<sheet>": [ { "<column>": value, ... }, ... ] }`) or directly
//! from a spreadsheet file (`.xlsx`, `.xlsm`, `.xls`, `.ods`).

use crate::error::{Result, SheetGenError};
use calamine::{open_workbook_auto, Data, Range, Reader};
use indexmap::IndexMap;
use serde_json::Value;
use std::path::Path;

/// One sheet row: column name -> cell value, in column order.
pub type Row = IndexMap<String, Value>;

/// Column name that marks a sheet as a model sheet.
pub const MODEL_COLUMN: &str = "Model";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Row>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, rows: Vec<Row>) -> Self {
        Sheet {
            name: name.into(),
            rows,
        }
    }

    /// A model sheet's first data row starts with the `Model` column.
    pub fn is_model_sheet(&self) -> bool {
        self.rows
            .first()
            .and_then(|row| row.keys().next())
            .map(|column| column == MODEL_COLUMN)
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    /// Open a workbook, choosing the reader from the file extension.
    pub fn open(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "json" => Self::from_json_str(&std::fs::read_to_string(path)?),
            "yaml" | "yml" => Self::from_yaml_str(&std::fs::read_to_string(path)?),
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Self::from_spreadsheet(path),
            other => Err(SheetGenError::Workbook(format!(
                "Unsupported workbook format '{other}' for {}",
                path.display()
            ))),
        }
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let sheets: IndexMap<String, Vec<Row>> = serde_json::from_str(content)?;
        Ok(Self::from_sheet_map(sheets))
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let sheets: IndexMap<String, Vec<Row>> = serde_yaml::from_str(content)?;
        Ok(Self::from_sheet_map(sheets))
    }

    fn from_sheet_map(sheets: IndexMap<String, Vec<Row>>) -> Self {
        Workbook {
            sheets: sheets
                .into_iter()
                .map(|(name, rows)| Sheet::new(name, rows))
                .collect(),
        }
    }

    /// Read every sheet of a spreadsheet file. The first row of each sheet is
    /// the header; empty cells are left out of the row.
    pub fn from_spreadsheet(path: &Path) -> Result<Self> {
        let mut workbook = open_workbook_auto(path).map_err(|e| {
            SheetGenError::Workbook(format!("Failed to open {}: {e}", path.display()))
        })?;

        let mut sheets = Vec::new();
        for name in workbook.sheet_names() {
            let range = workbook.worksheet_range(&name).map_err(|e| {
                SheetGenError::Workbook(format!("Failed to read sheet '{name}': {e}"))
            })?;
            let rows = rows_from_range(&name, &range);
            log::debug!("Read sheet '{}' with {} data rows", name, rows.len());
            sheets.push(Sheet::new(name, rows));
        }

        Ok(Workbook { sheets })
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|sheet| sheet.name == name)
    }
}

fn rows_from_range(sheet_name: &str, range: &Range<Data>) -> Vec<Row> {
    let mut rows = range.rows();
    let headers: Vec<Option<String>> = match rows.next() {
        Some(header_row) => header_row.iter().map(header_text).collect(),
        None => return Vec::new(),
    };

    rows.map(|cells| {
        let mut row = Row::new();
        for (header, cell) in headers.iter().zip(cells) {
            let Some(column) = header else { continue };
            if let Some(value) = cell_value(sheet_name, column, cell) {
                row.insert(column.clone(), value);
            }
        }
        row
    })
    .filter(|row| !row.is_empty())
    .collect()
}

fn header_text(cell: &Data) -> Option<String> {
    let text = cell.to_string();
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn cell_value(sheet_name: &str, column: &str, cell: &Data) -> Option<Value> {
    match cell {
        Data::Empty => None,
        Data::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| Value::String(trimmed.to_string()))
        }
        Data::Int(i) => Some(Value::from(*i)),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                Some(Value::from(*f as i64))
            } else {
                serde_json::Number::from_f64(*f).map(Value::Number)
            }
        }
        Data::Bool(b) => Some(Value::Bool(*b)),
        Data::DateTime(dt) => serde_json::Number::from_f64(dt.as_f64()).map(Value::Number),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Some(Value::String(s.clone())),
        Data::Error(e) => {
            log::warn!("Sheet '{sheet_name}' column '{column}' holds a cell error ({e:?}); ignoring it");
            None
        }
    }
}
