//! Spreadsheet input and output for batch runs.
//!
//! Each input sheet is a group of identifiers read from the column whose
//! header matches the configured identifier column. The report mirrors the
//! input: one sheet per group, identifier column first, then one column per
//! site.

use calamine::{Data, Range, Reader, open_workbook_auto};
use indexmap::IndexMap;
use rust_xlsxwriter::Workbook;
use std::path::Path;
use tracing::{debug, warn};

use crate::aggregator::ResultAggregator;
use crate::models::ResultTable;
use crate::utils::error::{AppError, Result};

/// Sheet name to identifiers, in workbook order.
pub type QueryGroups = IndexMap<String, Vec<String>>;

/// Reads every sheet that has the identifier column.
///
/// Sheets that cannot be read or lack the column are skipped with a warning;
/// only failing to open the workbook itself is an error.
pub fn read_groups(path: &Path, identifier_column: &str) -> Result<QueryGroups> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| AppError::Workbook(format!("Failed to open {}: {}", path.display(), e)))?;

    let mut groups = QueryGroups::new();
    for name in workbook.sheet_names() {
        let range = match workbook.worksheet_range(&name) {
            Ok(range) => range,
            Err(e) => {
                warn!("Skipping sheet '{}': {}", name, e);
                continue;
            }
        };

        match sheet_queries(&range, identifier_column) {
            Ok(queries) => {
                debug!("Sheet '{}' has {} identifiers", name, queries.len());
                groups.insert(name, queries);
            }
            Err(e) => warn!("Skipping sheet '{}': {}", name, e),
        }
    }

    Ok(groups)
}

fn sheet_queries(range: &Range<Data>, identifier_column: &str) -> Result<Vec<String>> {
    let mut rows = range.rows();
    let header = rows
        .next()
        .ok_or_else(|| AppError::InputFormat("sheet is empty".to_string()))?;

    let column = header
        .iter()
        .position(|cell| cell_text(cell).as_deref() == Some(identifier_column))
        .ok_or_else(|| {
            AppError::InputFormat(format!("missing identifier column '{}'", identifier_column))
        })?;

    Ok(rows
        .filter_map(|row| row.get(column).and_then(cell_text))
        .collect())
}

/// Cell content as an identifier, `None` for blanks and error cells.
///
/// Whole numbers lose the `.0` spreadsheets attach to numeric codes.
pub fn cell_text(cell: &Data) -> Option<String> {
    let text = match cell {
        Data::Empty | Data::Error(_) => return None,
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        other => other.to_string().trim().to_string(),
    };
    (!text.is_empty()).then_some(text)
}

/// Writes the report workbook.
pub fn write_table(table: &ResultTable, aggregator: &ResultAggregator, path: &Path) -> Result<()> {
    let mut workbook = Workbook::new();
    let header = table.header();

    for group in &table.groups {
        let sheet = workbook.add_worksheet();
        sheet.set_name(&group.name)?;

        for (col, title) in header.iter().enumerate() {
            sheet.write_string(0, col as u16, title)?;
        }

        for (index, row) in group.rows.iter().enumerate() {
            for (col, cell) in aggregator.render_row(row).iter().enumerate() {
                sheet.write_string(index as u32 + 1, col as u16, cell)?;
            }
        }
    }

    if table.groups.is_empty() {
        let sheet = workbook.add_worksheet();
        for (col, title) in header.iter().enumerate() {
            sheet.write_string(0, col as u16, title)?;
        }
    }

    workbook.save(path)?;
    Ok(())
}
