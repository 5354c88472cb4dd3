//! Request handling shared by the HTTP server and the in-process transport.
//!
//! A [`Service`] owns the workbook behind a mutex, so requests against it are
//! applied one at a time and each mutation is committed before the lock is
//! released.

use crate::adapter;
use crate::config::TableCatalog;
use crate::error::{StoreError, StoreResult};
use crate::messages::{error_body, success_body, MutationRequest, TableSnapshot};
use crate::sheet::Workbook;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::sync::{Mutex, MutexGuard};

/// A response: HTTP status plus JSON envelope
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: u16,
    pub body: JsonValue,
}

impl Reply {
    fn ok<T: Serialize>(payload: &T) -> Reply {
        match success_body(payload) {
            Ok(body) => Reply { status: 200, body },
            Err(e) => Reply::error(&StoreError::Storage(format!("cannot encode response: {}", e))),
        }
    }

    fn error(err: &StoreError) -> Reply {
        Reply {
            status: err.kind().http_status(),
            body: error_body(err),
        }
    }

    pub fn is_success(&self) -> bool {
        self.body
            .get("success")
            .and_then(JsonValue::as_bool)
            .unwrap_or(false)
    }
}

pub struct Service<W: Workbook> {
    workbook: Mutex<W>,
    catalog: TableCatalog,
}

impl<W: Workbook> Service<W> {
    pub fn new(workbook: W, catalog: TableCatalog) -> Self {
        Service {
            workbook: Mutex::new(workbook),
            catalog,
        }
    }

    pub fn catalog(&self) -> &TableCatalog {
        &self.catalog
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, W>> {
        self.workbook
            .lock()
            .map_err(|_| StoreError::Storage("workbook lock poisoned".to_string()))
    }

    /// Run `f` against the workbook while holding the lock
    pub fn with_workbook<R>(&self, f: impl FnOnce(&W) -> R) -> StoreResult<R> {
        let workbook = self.lock()?;
        Ok(f(&workbook))
    }

    /// Handle a read. With no sheet name the first catalogued table is read.
    pub fn read(&self, sheet: Option<&str>) -> Reply {
        let name = match sheet.or_else(|| self.catalog.first()) {
            Some(name) => name,
            None => {
                return Reply::error(&StoreError::TableNotFound {
                    name: String::new(),
                    available: Vec::new(),
                })
            }
        };

        match self.try_read(name) {
            Ok(snapshot) => {
                log::debug!("read {}: {} row(s)", name, snapshot.count);
                Reply::ok(&snapshot)
            }
            Err(e) => {
                log::warn!("read {} failed: {}", name, e);
                Reply::error(&e)
            }
        }
    }

    fn try_read(&self, name: &str) -> StoreResult<TableSnapshot> {
        let workbook = self.lock()?;
        let sheet = adapter::resolve_table(&*workbook, &self.catalog, name)?;
        Ok(adapter::read_table(sheet))
    }

    /// Handle a raw mutation body. Unparseable bodies are `InvalidInput`.
    pub fn mutate_json(&self, body: &[u8]) -> Reply {
        match serde_json::from_slice::<MutationRequest>(body) {
            Ok(request) => self.mutate(&request),
            Err(e) => {
                let err = StoreError::InvalidInput(format!("malformed request: {}", e));
                log::warn!("{}", err);
                Reply::error(&err)
            }
        }
    }

    pub fn mutate(&self, request: &MutationRequest) -> Reply {
        let reply = self.try_mutate(request).unwrap_or_else(|e| Reply::error(&e));
        if reply.is_success() {
            log::debug!("{} {} ok", request.action(), request.sheet());
        } else {
            log::warn!(
                "{} {} failed: {}",
                request.action(),
                request.sheet(),
                reply.body.get("error").unwrap_or(&JsonValue::Null)
            );
        }
        reply
    }

    fn try_mutate(&self, request: &MutationRequest) -> StoreResult<Reply> {
        let mut workbook = self.lock()?;
        let sheet = adapter::resolve_table_mut(&mut *workbook, &self.catalog, request.sheet())?;
        let before = sheet.clone();

        let (reply, changed) = match request {
            MutationRequest::Create { values, .. } => {
                (Reply::ok(&adapter::create_row(sheet, values)?), true)
            }
            MutationRequest::Update { row, values, .. } => {
                (Reply::ok(&adapter::update_row(sheet, *row, values)?), true)
            }
            MutationRequest::Delete { row, .. } => (Reply::ok(&adapter::delete_row(sheet, *row)?), true),
            MutationRequest::UpdateCell {
                row, column, value, ..
            } => (Reply::ok(&adapter::update_cell(sheet, *row, column, value)?), true),
            MutationRequest::UpdateBatch { updates, .. } => {
                let report = adapter::update_batch(sheet, updates);
                (Reply::ok(&report), report.success_count > 0)
            }
        };

        if changed {
            if let Err(e) = workbook.commit() {
                log::error!("commit after {} {} failed: {}", request.action(), request.sheet(), e);
                // a failed commit leaves the sheet as it was before the request
                if let Some(sheet) = workbook.sheet_mut(request.sheet()) {
                    *sheet = before;
                }
                return Err(e);
            }
        }
        Ok(reply)
    }
}
