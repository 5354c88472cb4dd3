//! JSON-file persistence for [`MemoryWorkbook`].
//!
//! The file holds every sheet's raw physical rows in the tagged storage form
//! of [`CellValue`], so dates and booleans survive a restart unchanged.

use crate::config::Config;
use crate::error::{StoreError, StoreResult};
use crate::sheet::{MemorySheet, MemoryWorkbook, Sheet};
use crate::value::CellValue;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

#[derive(Debug, Serialize, Deserialize)]
struct WorkbookFile {
    sheets: Vec<SheetFile>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SheetFile {
    name: String,
    #[serde(default)]
    rows: Vec<Vec<CellValue>>,
}

fn storage_error(path: &Path, e: impl std::fmt::Display) -> StoreError {
    StoreError::Storage(format!("{}: {}", path.display(), e))
}

/// Write the workbook to `path` through a temporary file and rename
pub fn save_workbook(workbook: &MemoryWorkbook, path: &Path) -> StoreResult<()> {
    let contents = WorkbookFile {
        sheets: workbook
            .sheets()
            .iter()
            .map(|sheet| SheetFile {
                name: sheet.name().to_string(),
                rows: sheet.rows().to_vec(),
            })
            .collect(),
    };

    let tmp = path.with_extension("json.tmp");
    let file = File::create(&tmp).map_err(|e| storage_error(&tmp, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &contents).map_err(|e| storage_error(&tmp, e))?;
    writer.flush().map_err(|e| storage_error(&tmp, e))?;
    drop(writer);

    fs::rename(&tmp, path).map_err(|e| storage_error(path, e))?;
    log::info!("saved workbook to {}", path.display());
    Ok(())
}

/// Read a workbook previously written by [`save_workbook`]
pub fn load_workbook(path: &Path) -> StoreResult<MemoryWorkbook> {
    let file = File::open(path).map_err(|e| storage_error(path, e))?;
    let contents: WorkbookFile =
        serde_json::from_reader(BufReader::new(file)).map_err(|e| storage_error(path, e))?;

    let sheets = contents
        .sheets
        .into_iter()
        .map(|sheet| MemorySheet::with_rows(sheet.name, sheet.rows))
        .collect();
    Ok(MemoryWorkbook::from_sheets(sheets))
}

/// Build the workbook a server starts with.
///
/// Loads `server.data_file` when it exists, then creates every configured
/// table that is still missing, seeding configured header rows. When a data
/// file is configured the workbook persists to it on commit.
pub fn open_workbook(config: &Config) -> StoreResult<MemoryWorkbook> {
    let mut workbook = match &config.server.data_file {
        Some(path) if path.exists() => {
            let workbook = load_workbook(path)?;
            log::info!(
                "loaded {} sheet(s) from {}",
                workbook.sheets().len(),
                path.display()
            );
            workbook
        }
        _ => MemoryWorkbook::new(),
    };

    let mut created = false;
    for table in &config.tables {
        let header = config.headers.get(table).map(Vec::as_slice);
        if workbook.ensure_sheet(table, header) {
            log::info!("created sheet \"{}\"", table);
            created = true;
        }
    }

    if let Some(path) = &config.server.data_file {
        workbook.persist_to(path);
        if created {
            save_workbook(&workbook, path)?;
        }
    }
    Ok(workbook)
}
