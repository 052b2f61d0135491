use crate::error::{Result, SheetGenError};
use crate::schema::value::{cell_text, is_blank, is_identifier};
use crate::schema::{Extraction, PartialBundle, Properties, RawModels, RawSchema};
use crate::workbook::{Row, Sheet, Workbook, MODEL_COLUMN};

/// Column holding the field name on every data row.
pub const FIELD_COLUMN: &str = "Field";

/// The sheet whose models are reusable partials rather than a package.
pub const PARTIALS_SHEET: &str = "partials";

/// Turn a workbook into the raw schema and the partial bundle.
///
/// Every model sheet becomes one package. Non-model sheets are skipped. The
/// `partials` sheet feeds the bundle and is not emitted as a package.
pub fn extract(workbook: &Workbook) -> Result<Extraction> {
    let mut extraction = Extraction::default();

    for sheet in &workbook.sheets {
        if !sheet.is_model_sheet() {
            log::debug!("Skipping sheet '{}': not a model sheet", sheet.name);
            continue;
        }

        let models = extract_sheet(sheet)?;
        if sheet.name == PARTIALS_SHEET {
            log::debug!("Extracted {} partials", models.len());
            extraction.partials = PartialBundle { partials: models };
        } else {
            log::debug!("Extracted {} models from '{}'", models.len(), sheet.name);
            if extraction
                .schema
                .packages
                .insert(sheet.name.clone(), models)
                .is_some()
            {
                log::debug!("Sheet '{}' appears twice; keeping the last one", sheet.name);
            }
        }
    }

    Ok(extraction)
}

/// Extract one model sheet into model -> field -> properties.
pub fn extract_sheet(sheet: &Sheet) -> Result<RawModels> {
    let mut models = RawModels::new();
    let mut current: Option<String> = None;

    for (index, row) in sheet.rows.iter().enumerate() {
        // Spreadsheet row number, counting the header row.
        let row_number = index + 2;

        if row.values().all(is_blank) {
            continue;
        }

        let opened = row.get(MODEL_COLUMN).and_then(cell_text);
        if let Some(model) = &opened {
            if !is_identifier(model) {
                return Err(SheetGenError::Schema(format!(
                    "Sheet '{}' row {row_number}: model name '{model}' is not a valid identifier",
                    sheet.name
                )));
            }
            if models.insert(model.clone(), Default::default()).is_some() {
                log::debug!(
                    "Sheet '{}' row {row_number}: model '{model}' redefined; last definition wins",
                    sheet.name
                );
            }
            current = Some(model.clone());
        }

        let Some(model) = current.as_ref() else {
            return Err(SheetGenError::Schema(format!(
                "Sheet '{}' row {row_number}: data appears before any Model cell",
                sheet.name
            )));
        };

        let Some(field) = row.get(FIELD_COLUMN).and_then(cell_text) else {
            if opened.is_some() {
                continue;
            }
            return Err(SheetGenError::Schema(format!(
                "Sheet '{}' row {row_number}: row has no Field value",
                sheet.name
            )));
        };

        if !is_identifier(&field) && !field.contains('.') {
            log::warn!(
                "Sheet '{}' row {row_number}: field name '{field}' is not a valid identifier",
                sheet.name
            );
        }

        let fields = models.entry(model.clone()).or_default();
        if fields.insert(field.clone(), row_properties(row)).is_some() {
            log::debug!(
                "Sheet '{}' row {row_number}: field '{model}.{field}' repeated; last row wins",
                sheet.name
            );
        }
    }

    Ok(models)
}

/// A row's cells minus the `Model` and `Field` columns.
fn row_properties(row: &Row) -> Properties {
    row.iter()
        .filter(|(column, _)| column.as_str() != MODEL_COLUMN && column.as_str() != FIELD_COLUMN)
        .map(|(column, value)| (column.clone(), value.clone()))
        .collect()
}

/// Convenience: extract and hand back only the raw schema.
pub fn extract_schema(workbook: &Workbook) -> Result<RawSchema> {
    extract(workbook).map(|extraction| extraction.schema)
}
