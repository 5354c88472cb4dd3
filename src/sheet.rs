//! Backing-store abstraction for header-driven tables.
//!
//! A [`Sheet`] behaves like a spreadsheet tab: rows are addressed by physical
//! position, row 1 is the header, and writes are positional. The adapter only
//! talks to these traits, so a store with surrogate keys can stand in for the
//! in-memory grid as long as it honours [`RowHandle`] addressing.
//!
//! # Examples
//!
//! ```
//! use sheetbridge::{CellValue, MemorySheet, Sheet};
//!
//! let mut sheet = MemorySheet::with_header("UANG KAS", &["Tanggal", "Keterangan", "Jumlah"]);
//! let handle = sheet
//!     .append(vec![CellValue::text("1/3/2024"), CellValue::text("Iuran"), CellValue::Number(50000.0)])
//!     .unwrap();
//!
//! assert_eq!(handle.get(), 2);
//! assert_eq!(sheet.last_row(), 2);
//! assert_eq!(sheet.last_column(), 3);
//! ```

use crate::error::{StoreError, StoreResult};
use crate::row::RowHandle;
use crate::value::CellValue;
use std::fmt;
use std::path::{Path, PathBuf};

/// One named table of the backing store.
///
/// Sheets are `Clone` so a request can restore the previous contents when its
/// commit fails.
pub trait Sheet: Clone {
    fn name(&self) -> &str;

    /// Position of the last physical row (0 when the sheet is empty)
    fn last_row(&self) -> u32;

    /// Width of the widest physical row
    fn last_column(&self) -> usize;

    /// Raw header cells padded to `last_column`; empty for an empty sheet
    fn header(&self) -> Vec<CellValue>;

    /// Raw data rows (handles `2..=last_row`) padded to `last_column`
    fn records(&self) -> Vec<(RowHandle, Vec<CellValue>)>;

    /// Append a physical row after the last one and return its handle
    fn append(&mut self, values: Vec<CellValue>) -> StoreResult<RowHandle>;

    /// Replace the whole physical row at `handle`; `values[i]` lands in column `i`
    fn overwrite(&mut self, handle: RowHandle, values: Vec<CellValue>) -> StoreResult<()>;

    /// Write a single cell (`column` is 0-based)
    fn write_cell(&mut self, handle: RowHandle, column: usize, value: CellValue) -> StoreResult<()>;

    /// Remove the physical row; rows beneath move up by one
    fn remove(&mut self, handle: RowHandle) -> StoreResult<()>;
}

/// A collection of named sheets
pub trait Workbook {
    type Sheet: Sheet;

    fn sheet(&self, name: &str) -> Option<&Self::Sheet>;

    fn sheet_mut(&mut self, name: &str) -> Option<&mut Self::Sheet>;

    /// Make completed writes durable. Called once per successful request.
    fn commit(&mut self) -> StoreResult<()> {
        Ok(())
    }
}

/// In-memory sheet holding ragged rows of raw cells
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemorySheet {
    name: String,
    rows: Vec<Vec<CellValue>>,
}

impl MemorySheet {
    pub fn new(name: impl Into<String>) -> Self {
        MemorySheet {
            name: name.into(),
            rows: Vec::new(),
        }
    }

    /// Create a sheet whose first row holds the given header texts
    pub fn with_header(name: impl Into<String>, headers: &[&str]) -> Self {
        let header = headers.iter().map(|h| CellValue::text(*h)).collect();
        MemorySheet {
            name: name.into(),
            rows: vec![header],
        }
    }

    /// Create a sheet from raw physical rows (row 1 first)
    pub fn with_rows(name: impl Into<String>, rows: Vec<Vec<CellValue>>) -> Self {
        MemorySheet {
            name: name.into(),
            rows,
        }
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn padded(&self, row: &[CellValue]) -> Vec<CellValue> {
        let mut cells = row.to_vec();
        cells.resize(self.last_column(), CellValue::Empty);
        cells
    }

    fn index_of(&self, handle: RowHandle) -> StoreResult<usize> {
        let index = handle.index();
        if handle.get() == 0 || index >= self.rows.len() {
            return Err(StoreError::InvalidRow {
                row: handle.into(),
                last_row: self.last_row(),
            });
        }
        Ok(index)
    }
}

impl Sheet for MemorySheet {
    fn name(&self) -> &str {
        &self.name
    }

    fn last_row(&self) -> u32 {
        self.rows.len() as u32
    }

    fn last_column(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    fn header(&self) -> Vec<CellValue> {
        match self.rows.first() {
            Some(row) => self.padded(row),
            None => Vec::new(),
        }
    }

    fn records(&self) -> Vec<(RowHandle, Vec<CellValue>)> {
        self.rows
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, row)| (RowHandle::new(i as u32 + 1), self.padded(row)))
            .collect()
    }

    fn append(&mut self, values: Vec<CellValue>) -> StoreResult<RowHandle> {
        self.rows.push(values);
        Ok(RowHandle::new(self.last_row()))
    }

    fn overwrite(&mut self, handle: RowHandle, values: Vec<CellValue>) -> StoreResult<()> {
        let index = self.index_of(handle)?;
        self.rows[index] = values;
        Ok(())
    }

    fn write_cell(&mut self, handle: RowHandle, column: usize, value: CellValue) -> StoreResult<()> {
        let index = self.index_of(handle)?;
        let row = &mut self.rows[index];
        if row.len() <= column {
            row.resize(column + 1, CellValue::Empty);
        }
        row[column] = value;
        Ok(())
    }

    fn remove(&mut self, handle: RowHandle) -> StoreResult<()> {
        let index = self.index_of(handle)?;
        self.rows.remove(index);
        Ok(())
    }
}

impl fmt::Display for MemorySheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Sheet {{ name: '{}', columns: {}, rows: {} }}",
            self.name,
            self.last_column(),
            self.last_row()
        )
    }
}

/// In-memory workbook, optionally persisted to a JSON file on commit
#[derive(Debug, Clone, Default)]
pub struct MemoryWorkbook {
    sheets: Vec<MemorySheet>,
    path: Option<PathBuf>,
}

impl MemoryWorkbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_sheets(sheets: Vec<MemorySheet>) -> Self {
        MemoryWorkbook { sheets, path: None }
    }

    /// Persist to `path` on every commit
    pub fn persist_to(&mut self, path: impl Into<PathBuf>) {
        self.path = Some(path.into());
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Create `name` if missing, seeding its header row when given.
    /// Returns true if the sheet was created.
    pub fn ensure_sheet(&mut self, name: &str, header: Option<&[String]>) -> bool {
        if self.sheet(name).is_some() {
            return false;
        }
        let mut sheet = MemorySheet::new(name);
        if let Some(header) = header {
            sheet.rows.push(header.iter().map(|h| CellValue::text(h.as_str())).collect());
        }
        self.sheets.push(sheet);
        true
    }

    pub fn sheets(&self) -> &[MemorySheet] {
        &self.sheets
    }
}

impl Workbook for MemoryWorkbook {
    type Sheet = MemorySheet;

    fn sheet(&self, name: &str) -> Option<&MemorySheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    fn sheet_mut(&mut self, name: &str) -> Option<&mut MemorySheet> {
        self.sheets.iter_mut().find(|s| s.name == name)
    }

    fn commit(&mut self) -> StoreResult<()> {
        match &self.path {
            Some(path) => crate::storage::save_workbook(self, path),
            None => Ok(()),
        }
    }
}
