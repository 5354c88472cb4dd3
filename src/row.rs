//! Row identity and row objects.
//!
//! A row is addressed by its 1-based physical position in the backing sheet.
//! Position 1 holds the header, so the first data row has handle 2. Handles are
//! stable until a row above them is deleted or inserted; after a delete every
//! handle below the removed row refers to the next row up. Callers reload
//! before issuing further handle-based operations.

use crate::error::StoreError;
use crate::value::CellValue;
use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

/// Key under which a row object carries its handle on the wire
pub const ROW_KEY: &str = "_row";

/// Physical position of a row in its sheet (1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowHandle(u32);

impl RowHandle {
    /// The header row. Never addressable by data operations.
    pub const HEADER: RowHandle = RowHandle(1);
    /// Handle of the first data row
    pub const FIRST_DATA: RowHandle = RowHandle(2);

    pub fn new(position: u32) -> Self {
        RowHandle(position)
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// Zero-based index into a sheet's physical rows
    pub fn index(self) -> usize {
        (self.0 as usize).saturating_sub(1)
    }

    /// Validate a handle received from a caller against the current last row.
    ///
    /// Fails with `InvalidRow` for the header row, anything below it, and
    /// anything past `last_row`.
    pub fn checked(raw: i64, last_row: u32) -> Result<RowHandle, StoreError> {
        if raw < RowHandle::FIRST_DATA.0 as i64 || raw > last_row as i64 {
            return Err(StoreError::InvalidRow { row: raw, last_row });
        }
        Ok(RowHandle(raw as u32))
    }
}

impl fmt::Display for RowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<RowHandle> for i64 {
    fn from(handle: RowHandle) -> Self {
        handle.0 as i64
    }
}

/// A data row keyed by formatted header names, in header order.
///
/// Serialized as a flat object: `{"_row": 2, "Nama": "Budi", "Status": true}`.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    handle: RowHandle,
    cells: Vec<(String, CellValue)>,
}

impl Row {
    pub fn new(handle: RowHandle) -> Self {
        Row {
            handle,
            cells: Vec::new(),
        }
    }

    pub fn handle(&self) -> RowHandle {
        self.handle
    }

    /// Set a column's value. A repeated column name keeps its first position
    /// and takes the later value.
    pub fn insert(&mut self, column: impl Into<String>, value: CellValue) {
        let column = column.into();
        match self.cells.iter_mut().find(|(name, _)| *name == column) {
            Some((_, existing)) => *existing = value,
            None => self.cells.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Value for `column`, treating a missing column as `Empty`
    pub fn value_or_empty(&self, column: &str) -> CellValue {
        self.get(column).cloned().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CellValue)> {
        self.cells.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len() + 1))?;
        map.serialize_entry(ROW_KEY, &self.handle)?;
        for (name, value) in &self.cells {
            map.serialize_entry(name, &value.to_json())?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Row {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let object = serde_json::Map::<String, JsonValue>::deserialize(deserializer)?;
        let handle = object
            .get(ROW_KEY)
            .and_then(JsonValue::as_u64)
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| de::Error::missing_field(ROW_KEY))?;

        let mut row = Row::new(RowHandle(handle));
        for (name, value) in object {
            if name != ROW_KEY {
                row.insert(name, CellValue::from_json(&value));
            }
        }
        Ok(row)
    }
}
