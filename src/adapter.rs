//! Table store adapter: header-driven reads and positional writes over a
//! [`Sheet`].
//!
//! Header names are the formatted text of row 1, so a header cell holding a
//! date is addressed as `"17/5/2024"`. Every write validates the handle
//! against the sheet's current last row. Handles are positional, so a
//! caller holding handles across a delete may address the wrong row.

use crate::config::TableCatalog;
use crate::error::{StoreError, StoreResult};
use crate::messages::{
    BatchEntry, BatchReport, CellWritten, FailedUpdate, RowDeleted, RowWritten, TableSnapshot,
};
use crate::row::{Row, RowHandle, ROW_KEY};
use crate::sheet::{Sheet, Workbook};
use crate::value::{format_header, normalize_column_name, CellValue};
use serde_json::Value as JsonValue;

fn table_not_found(catalog: &TableCatalog, name: &str) -> StoreError {
    StoreError::TableNotFound {
        name: name.to_string(),
        available: catalog.tables().to_vec(),
    }
}

/// Look up a catalogued table. Names are exact and case-sensitive.
pub fn resolve_table<'w, W: Workbook>(
    workbook: &'w W,
    catalog: &TableCatalog,
    name: &str,
) -> StoreResult<&'w W::Sheet> {
    if !catalog.contains(name) {
        return Err(table_not_found(catalog, name));
    }
    workbook.sheet(name).ok_or_else(|| table_not_found(catalog, name))
}

pub fn resolve_table_mut<'w, W: Workbook>(
    workbook: &'w mut W,
    catalog: &TableCatalog,
    name: &str,
) -> StoreResult<&'w mut W::Sheet> {
    if !catalog.contains(name) {
        return Err(table_not_found(catalog, name));
    }
    workbook
        .sheet_mut(name)
        .ok_or_else(|| table_not_found(catalog, name))
}

/// Formatted header names, one per column including blank headers
pub fn headers_of<S: Sheet>(sheet: &S) -> Vec<String> {
    sheet.header().iter().map(format_header).collect()
}

/// 0-based position of the first non-blank header equal to `column` (trimmed)
pub fn column_index(headers: &[String], column: &str) -> StoreResult<usize> {
    let wanted = normalize_column_name(column);
    headers
        .iter()
        .position(|h| !h.is_empty() && h == wanted)
        .ok_or_else(|| StoreError::ColumnNotFound(wanted.to_string()))
}

/// Read every data row keyed by header name.
///
/// A sheet with no rows or no columns reads as an empty table. Columns with
/// a blank header are left out of row objects.
pub fn read_table<S: Sheet>(sheet: &S) -> TableSnapshot {
    if sheet.last_row() == 0 || sheet.last_column() == 0 {
        return TableSnapshot::empty(sheet.name());
    }

    let headers = headers_of(sheet);
    let rows: Vec<Row> = sheet
        .records()
        .into_iter()
        .map(|(handle, cells)| {
            let mut row = Row::new(handle);
            for (header, cell) in headers.iter().zip(cells.iter()) {
                if header.is_empty() || header == ROW_KEY {
                    continue;
                }
                row.insert(header.clone(), cell.coerce());
            }
            row
        })
        .collect();

    TableSnapshot {
        count: rows.len(),
        headers,
        rows,
        sheet: sheet.name().to_string(),
    }
}

fn to_cells(values: &[JsonValue]) -> StoreResult<Vec<CellValue>> {
    if values.is_empty() {
        return Err(StoreError::InvalidInput(
            "values must contain at least one cell".to_string(),
        ));
    }
    Ok(values.iter().map(CellValue::from_json).collect())
}

/// Append a row. On an empty sheet the appended row becomes the header.
pub fn create_row<S: Sheet>(sheet: &mut S, values: &[JsonValue]) -> StoreResult<RowWritten> {
    let cells = to_cells(values)?;
    let row = sheet.append(cells)?;
    log::debug!("{}: appended row {}", sheet.name(), row);
    Ok(RowWritten {
        row,
        values: values.to_vec(),
    })
}

/// Overwrite a whole row positionally; cells past `values.len()` are cleared
pub fn update_row<S: Sheet>(sheet: &mut S, row: i64, values: &[JsonValue]) -> StoreResult<RowWritten> {
    let handle = RowHandle::checked(row, sheet.last_row())?;
    let cells = to_cells(values)?;
    sheet.overwrite(handle, cells)?;
    log::debug!("{}: overwrote row {}", sheet.name(), handle);
    Ok(RowWritten {
        row: handle,
        values: values.to_vec(),
    })
}

pub fn delete_row<S: Sheet>(sheet: &mut S, row: i64) -> StoreResult<RowDeleted> {
    let handle = RowHandle::checked(row, sheet.last_row())?;
    sheet.remove(handle)?;
    log::debug!("{}: removed row {}", sheet.name(), handle);
    Ok(RowDeleted { row: handle })
}

pub fn update_cell<S: Sheet>(
    sheet: &mut S,
    row: i64,
    column: &str,
    value: &JsonValue,
) -> StoreResult<CellWritten> {
    let handle = RowHandle::checked(row, sheet.last_row())?;
    let headers = headers_of(sheet);
    let index = column_index(&headers, column)?;
    sheet.write_cell(handle, index, CellValue::from_json(value))?;
    Ok(CellWritten {
        row: handle,
        column: column.to_string(),
        value: value.clone(),
    })
}

fn apply_entry<S: Sheet>(
    sheet: &mut S,
    headers: &[String],
    last_row: u32,
    entry: &BatchEntry,
) -> StoreResult<()> {
    let row = entry
        .row
        .ok_or_else(|| StoreError::InvalidInput("update is missing \"row\"".to_string()))?;
    let column = entry
        .column
        .as_deref()
        .ok_or_else(|| StoreError::InvalidInput("update is missing \"column\"".to_string()))?;

    let handle = RowHandle::checked(row, last_row)?;
    let index = column_index(headers, column)?;
    sheet.write_cell(handle, index, CellValue::from_json(&entry.value))
}

/// Apply independent single-cell writes, in order.
///
/// The header and last row are read once up front. A failing entry is
/// recorded with its index and does not stop the rest.
pub fn update_batch<S: Sheet>(sheet: &mut S, updates: &[BatchEntry]) -> BatchReport {
    let headers = headers_of(sheet);
    let last_row = sheet.last_row();

    let mut report = BatchReport {
        success_count: 0,
        total_count: updates.len(),
        failed_updates: Vec::new(),
    };

    for (index, entry) in updates.iter().enumerate() {
        match apply_entry(sheet, &headers, last_row, entry) {
            Ok(()) => report.success_count += 1,
            Err(e) => {
                log::warn!("{}: batch update {} failed: {}", sheet.name(), index, e);
                report.failed_updates.push(FailedUpdate {
                    index,
                    update: entry.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    log::debug!(
        "{}: batch applied {}/{}",
        sheet.name(),
        report.success_count,
        report.total_count
    );
    report
}
