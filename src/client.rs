//! Sync client: keeps a local view of one table and mirrors every mutation
//! back to the service.
//!
//! The client never patches its view after a write. Every successful or
//! failed save is followed by a full reload, so row handles held by the view
//! always come from the latest read.
//!
//! Interaction follows a small state machine, derived from the [`Session`]:
//!
//! ```text
//! Idle --open form--> Editing --submit--> Submitting --reload--> Idle
//! Idle --open delete--> Confirming --confirm--> Submitting --reload--> Idle
//! Idle --toggle--> Accumulating(n) --save--> Submitting --reload--> Idle
//! ```
//!
//! At most one request is outstanding per [`SyncClient`]; a second attempt
//! while one is in flight fails with [`ClientError::Busy`].

use crate::config::TableCatalog;
use crate::error::{ClientError, ClientResult};
use crate::messages::{decode, BatchReport, MutationRequest, RowDeleted, RowWritten, TableSnapshot};
use crate::pending::PendingEdits;
use crate::row::{Row, RowHandle};
use crate::transport::Transport;
use crate::value::{CellValue, Widget};
use serde_json::Value as JsonValue;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Warning,
    Danger,
}

/// A dismissible user-facing message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub id: u64,
    pub level: NoticeLevel,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Update(RowHandle),
}

#[derive(Debug, Clone, PartialEq)]
enum Modal {
    Closed,
    Form { mode: FormMode, error: Option<String> },
    ConfirmDelete(RowHandle),
}

/// What the user is currently doing
#[derive(Debug, Clone, PartialEq)]
pub enum Interaction {
    Idle,
    Editing {
        mode: FormMode,
        error: Option<String>,
    },
    Confirming(RowHandle),
    /// Toggles recorded but not yet saved
    Accumulating(usize),
    Submitting,
}

/// One input of a create or update form, in header order
#[derive(Debug, Clone, PartialEq)]
pub struct FormField {
    pub name: String,
    pub widget: Widget,
}

impl FormField {
    pub fn value(&self) -> JsonValue {
        self.widget.to_json()
    }
}

/// Collect positional values from form fields
pub fn form_values(fields: &[FormField]) -> Vec<JsonValue> {
    fields.iter().map(FormField::value).collect()
}

#[derive(Debug, Clone, PartialEq)]
pub enum FlushOutcome {
    NothingToSave,
    Saved(BatchReport),
}

/// Read-only handle on a client's in-flight flag
#[derive(Debug, Clone, Default)]
pub struct BusyIndicator(Arc<AtomicBool>);

impl BusyIndicator {
    pub fn is_busy(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn acquire(&self) -> ClientResult<BusyGuard> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ClientError::Busy)?;
        Ok(BusyGuard(Arc::clone(&self.0)))
    }
}

/// Clears the in-flight flag on drop, including when a request is cancelled
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Local view of one table plus its unsaved edits
#[derive(Debug)]
pub struct Session {
    table: Option<String>,
    boolean_table: bool,
    headers: Vec<String>,
    rows: Vec<Row>,
    pending: PendingEdits,
    modal: Modal,
    notices: Vec<Notice>,
    next_notice: u64,
    busy: BusyIndicator,
}

impl Session {
    fn new(busy: BusyIndicator) -> Self {
        Session {
            table: None,
            boolean_table: false,
            headers: Vec::new(),
            rows: Vec::new(),
            pending: PendingEdits::new(),
            modal: Modal::Closed,
            notices: Vec::new(),
            next_notice: 1,
            busy,
        }
    }

    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    pub fn is_boolean_table(&self) -> bool {
        self.boolean_table
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row(&self, handle: RowHandle) -> Option<&Row> {
        self.rows.iter().find(|r| r.handle() == handle)
    }

    pub fn pending(&self) -> &PendingEdits {
        &self.pending
    }

    pub fn is_busy(&self) -> bool {
        self.busy.is_busy()
    }

    pub fn interaction(&self) -> Interaction {
        if self.is_busy() {
            return Interaction::Submitting;
        }
        match &self.modal {
            Modal::Form { mode, error } => Interaction::Editing {
                mode: *mode,
                error: error.clone(),
            },
            Modal::ConfirmDelete(handle) => Interaction::Confirming(*handle),
            Modal::Closed if !self.pending.is_empty() => Interaction::Accumulating(self.pending.len()),
            Modal::Closed => Interaction::Idle,
        }
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    /// Remove a notice; returns false if it was already gone
    pub fn dismiss(&mut self, id: u64) -> bool {
        let before = self.notices.len();
        self.notices.retain(|n| n.id != id);
        self.notices.len() != before
    }

    fn notify(&mut self, level: NoticeLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            NoticeLevel::Success => log::info!("{}", message),
            NoticeLevel::Warning | NoticeLevel::Danger => log::warn!("{}", message),
        }
        self.notices.push(Notice {
            id: self.next_notice,
            level,
            message,
        });
        self.next_notice += 1;
    }

    /// Widget for a loaded cell, showing any pending toggle
    pub fn widget(&self, handle: RowHandle, column: &str) -> Option<Widget> {
        let cell = self.row(handle)?.get(column)?;
        let widget = match (Widget::for_cell(self.boolean_table, cell), self.pending.get(handle, column)) {
            (Widget::Checkbox(_), Some(pending)) => Widget::Checkbox(pending),
            (widget, _) => widget,
        };
        Some(widget)
    }

    /// True if the cell has a pending toggle that differs from the loaded value
    pub fn is_changed(&self, handle: RowHandle, column: &str) -> bool {
        let loaded = self.row(handle).and_then(|r| r.get(column)).and_then(CellValue::as_bool);
        match self.pending.get(handle, column) {
            Some(pending) => loaded != Some(pending),
            None => false,
        }
    }

    fn current_table(&self) -> ClientResult<String> {
        self.table.clone().ok_or(ClientError::NothingLoaded)
    }

    fn ensure_idle(&self) -> ClientResult<()> {
        if self.is_busy() {
            return Err(ClientError::Busy);
        }
        if self.table.is_none() {
            return Err(ClientError::NothingLoaded);
        }
        Ok(())
    }

    /// Record a checkbox toggle; returns the number of pending cells
    pub fn record_toggle(&mut self, handle: RowHandle, column: &str, value: bool) -> ClientResult<usize> {
        self.ensure_idle()?;
        if self.modal != Modal::Closed {
            return Err(ClientError::Invalid("Close the open dialog first".to_string()));
        }
        if !self.boolean_table {
            return Err(ClientError::Invalid(
                "Checkboxes are only editable in boolean tables".to_string(),
            ));
        }
        let row = self
            .row(handle)
            .ok_or_else(|| ClientError::Invalid(format!("Row {} is not loaded", handle)))?;
        match row.get(column) {
            Some(CellValue::Boolean(_)) => {}
            Some(_) => {
                return Err(ClientError::Invalid(format!(
                    "Column \"{}\" of row {} is not a checkbox",
                    column, handle
                )))
            }
            None => return Err(ClientError::Invalid(format!("Unknown column \"{}\"", column))),
        }
        Ok(self.pending.record(handle, column, value))
    }

    /// Open an empty form; every field is a text input
    pub fn open_create_form(&mut self) -> ClientResult<Vec<FormField>> {
        self.ensure_idle()?;
        let fields = self
            .headers
            .iter()
            .map(|name| FormField {
                name: name.clone(),
                widget: Widget::for_cell(self.boolean_table, &CellValue::Empty),
            })
            .collect();
        self.modal = Modal::Form {
            mode: FormMode::Create,
            error: None,
        };
        Ok(fields)
    }

    /// Open a form prefilled from a loaded row
    pub fn open_update_form(&mut self, handle: RowHandle) -> ClientResult<Vec<FormField>> {
        self.ensure_idle()?;
        let row = self
            .row(handle)
            .ok_or_else(|| ClientError::Invalid(format!("Row {} is not loaded", handle)))?;
        let fields = self
            .headers
            .iter()
            .map(|name| FormField {
                name: name.clone(),
                widget: Widget::for_cell(self.boolean_table, &row.value_or_empty(name)),
            })
            .collect();
        self.modal = Modal::Form {
            mode: FormMode::Update(handle),
            error: None,
        };
        Ok(fields)
    }

    pub fn open_delete(&mut self, handle: RowHandle) -> ClientResult<()> {
        self.ensure_idle()?;
        if self.row(handle).is_none() {
            return Err(ClientError::Invalid(format!("Row {} is not loaded", handle)));
        }
        self.modal = Modal::ConfirmDelete(handle);
        Ok(())
    }

    /// Dismiss an open form or delete confirmation
    pub fn close_modal(&mut self) {
        if !self.is_busy() {
            self.modal = Modal::Closed;
        }
    }

    fn fail_form(&mut self, mode: FormMode, err: &ClientError) {
        self.modal = Modal::Form {
            mode,
            error: Some(err.to_string()),
        };
        self.notify(NoticeLevel::Danger, format!("An error occurred: {}", err));
    }

    fn clear_view(&mut self) {
        self.headers.clear();
        self.rows.clear();
    }
}

/// Drives sessions against a [`Transport`]
pub struct SyncClient<T: Transport> {
    transport: T,
    catalog: TableCatalog,
    busy: BusyIndicator,
}

impl<T: Transport> SyncClient<T> {
    pub fn new(transport: T, catalog: TableCatalog) -> Self {
        SyncClient {
            transport,
            catalog,
            busy: BusyIndicator::default(),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn catalog(&self) -> &TableCatalog {
        &self.catalog
    }

    pub fn busy_indicator(&self) -> BusyIndicator {
        self.busy.clone()
    }

    /// A fresh session sharing this client's in-flight flag
    pub fn session(&self) -> Session {
        Session::new(self.busy.clone())
    }

    /// Load the first catalogued table
    pub async fn load_first_table(&self, session: &mut Session) -> ClientResult<usize> {
        let name = self
            .catalog
            .first()
            .ok_or_else(|| ClientError::Invalid("No tables are configured".to_string()))?
            .to_string();
        self.load_table(session, &name).await
    }

    /// Replace the session's view with a fresh read of `name`.
    ///
    /// Pending toggles and any open dialog are discarded. Returns the number
    /// of rows loaded.
    pub async fn load_table(&self, session: &mut Session, name: &str) -> ClientResult<usize> {
        let _guard = self.busy.acquire()?;
        self.reload(session, name).await
    }

    async fn reload(&self, session: &mut Session, name: &str) -> ClientResult<usize> {
        session.table = Some(name.to_string());
        session.boolean_table = self.catalog.is_boolean(name);
        session.pending.clear();
        session.modal = Modal::Closed;

        let result = self.transport.read(name).await.and_then(decode::<TableSnapshot>);
        match result {
            Ok(snapshot) => {
                log::debug!("loaded {}: {} row(s)", name, snapshot.rows.len());
                session.headers = snapshot.headers;
                session.rows = snapshot.rows;
                Ok(session.rows.len())
            }
            Err(e) => {
                session.clear_view();
                session.notify(NoticeLevel::Danger, format!("Failed to load data: {}", e));
                Err(e)
            }
        }
    }

    async fn reload_after_save(&self, session: &mut Session, name: &str) {
        if let Err(e) = self.reload(session, name).await {
            log::warn!("reload of {} after save failed: {}", name, e);
        }
    }

    async fn request<R: serde::de::DeserializeOwned>(&self, request: &MutationRequest) -> ClientResult<R> {
        let body = self.transport.send(request).await?;
        decode(body)
    }

    /// Send every pending toggle as one batch, then reload.
    ///
    /// Pending toggles are dropped whatever the outcome.
    pub async fn flush_toggles(&self, session: &mut Session) -> ClientResult<FlushOutcome> {
        let table = session.current_table()?;
        let _guard = self.busy.acquire()?;

        if session.pending.is_empty() {
            session.notify(NoticeLevel::Warning, "No changes to save");
            return Ok(FlushOutcome::NothingToSave);
        }

        let request = MutationRequest::UpdateBatch {
            sheet: table.clone(),
            updates: session.pending.to_updates(),
        };
        let result = self.request::<BatchReport>(&request).await;

        match &result {
            Ok(report) if report.all_applied() => session.notify(
                NoticeLevel::Success,
                format!("Saved {} change(s)", report.success_count),
            ),
            Ok(report) if report.success_count == 0 => session.notify(
                NoticeLevel::Danger,
                format!("None of the {} change(s) could be saved", report.total_count),
            ),
            Ok(report) => session.notify(
                NoticeLevel::Warning,
                format!(
                    "Saved {} of {} changes; {} failed",
                    report.success_count,
                    report.total_count,
                    report.failed_updates.len()
                ),
            ),
            Err(e) => session.notify(NoticeLevel::Danger, format!("Failed to save changes: {}", e)),
        }

        self.reload_after_save(session, &table).await;
        result.map(FlushOutcome::Saved)
    }

    /// Submit the open form with positional values in header order.
    ///
    /// On success the form closes and the table reloads. On failure the form
    /// stays open carrying the error.
    pub async fn submit_form(&self, session: &mut Session, values: Vec<JsonValue>) -> ClientResult<RowWritten> {
        let table = session.current_table()?;
        let mode = match &session.modal {
            Modal::Form { mode, .. } => *mode,
            _ => return Err(ClientError::Invalid("No form is open".to_string())),
        };
        let _guard = self.busy.acquire()?;

        if session.headers.is_empty() || values.len() != session.headers.len() {
            let err = ClientError::Invalid(format!(
                "Expected {} value(s) in header order, got {}",
                session.headers.len(),
                values.len()
            ));
            session.fail_form(mode, &err);
            return Err(err);
        }

        let request = match mode {
            FormMode::Create => MutationRequest::Create { sheet: table.clone(), values },
            FormMode::Update(handle) => MutationRequest::Update {
                sheet: table.clone(),
                row: handle.into(),
                values,
            },
        };

        match self.request::<RowWritten>(&request).await {
            Ok(written) => {
                session.modal = Modal::Closed;
                let message = match mode {
                    FormMode::Create => "Data added successfully",
                    FormMode::Update(_) => "Data updated successfully",
                };
                session.notify(NoticeLevel::Success, message);
                self.reload_after_save(session, &table).await;
                Ok(written)
            }
            Err(e) => {
                session.fail_form(mode, &e);
                Err(e)
            }
        }
    }

    /// Delete the row awaiting confirmation
    pub async fn confirm_delete(&self, session: &mut Session) -> ClientResult<RowDeleted> {
        let handle = match session.modal {
            Modal::ConfirmDelete(handle) => handle,
            _ => return Err(ClientError::Invalid("No delete is awaiting confirmation".to_string())),
        };
        self.submit_delete(session, handle).await
    }

    /// Delete `handle`, then reload. Any confirmation is up to the caller.
    pub async fn submit_delete(&self, session: &mut Session, handle: RowHandle) -> ClientResult<RowDeleted> {
        let table = session.current_table()?;
        let _guard = self.busy.acquire()?;

        let request = MutationRequest::Delete {
            sheet: table.clone(),
            row: handle.into(),
        };
        match self.request::<RowDeleted>(&request).await {
            Ok(deleted) => {
                session.modal = Modal::Closed;
                session.notify(NoticeLevel::Success, "Data deleted successfully");
                self.reload_after_save(session, &table).await;
                Ok(deleted)
            }
            Err(e) => {
                session.notify(NoticeLevel::Danger, format!("An error occurred: {}", e));
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::service::Service;
    use crate::sheet::{MemorySheet, MemoryWorkbook, Sheet, Workbook};
    use crate::transport::LocalTransport;
    use serde_json::json;

    fn service() -> Arc<Service<MemoryWorkbook>> {
        let mut ronda = MemorySheet::with_header("JADWAL RONDA", &["Nama", "Hari", "Status"]);
        for (name, day) in [("Budi", "Senin"), ("Andi", "Selasa"), ("Citra", "Rabu"), ("Dewi", "Kamis")] {
            ronda
                .append(vec![CellValue::text(name), CellValue::text(day), CellValue::Boolean(false)])
                .unwrap();
        }
        let mut kas = MemorySheet::with_header("UANG KAS", &["Keterangan", "Jumlah"]);
        kas.append(vec![CellValue::text("Iuran"), CellValue::Number(50000.0)])
            .unwrap();

        let workbook = MemoryWorkbook::from_sheets(vec![kas, ronda]);
        let catalog = TableCatalog::new(["UANG KAS", "JADWAL RONDA"]).with_boolean_tables(["JADWAL RONDA"]);
        Arc::new(Service::new(workbook, catalog))
    }

    fn client() -> SyncClient<LocalTransport<MemoryWorkbook>> {
        let service = service();
        let catalog = service.catalog().clone();
        SyncClient::new(LocalTransport::new(service), catalog)
    }

    /// Yields once before each request so that requests overlap
    struct Yielding<T>(T);

    impl<T: Transport> Transport for Yielding<T> {
        async fn read(&self, sheet: &str) -> ClientResult<JsonValue> {
            tokio::task::yield_now().await;
            self.0.read(sheet).await
        }

        async fn send(&self, request: &MutationRequest) -> ClientResult<JsonValue> {
            tokio::task::yield_now().await;
            self.0.send(request).await
        }
    }

    #[tokio::test]
    async fn test_load_table() {
        let client = client();
        let mut session = client.session();
        assert_eq!(session.interaction(), Interaction::Idle);

        assert_eq!(client.load_first_table(&mut session).await, Ok(1));
        assert_eq!(session.table(), Some("UANG KAS"));
        assert!(!session.is_boolean_table());

        assert_eq!(client.load_table(&mut session, "JADWAL RONDA").await, Ok(4));
        assert!(session.is_boolean_table());
        assert_eq!(session.headers(), &["Nama", "Hari", "Status"]);
        assert_eq!(session.rows()[0].handle(), RowHandle::new(2));
    }

    #[tokio::test]
    async fn test_load_failure_clears_view() {
        let client = client();
        let mut session = client.session();
        client.load_table(&mut session, "JADWAL RONDA").await.unwrap();

        let err = client.load_table(&mut session, "PENGUMUMAN").await.unwrap_err();
        assert_eq!(err.server_kind(), Some(ErrorKind::NotFound));
        assert!(session.headers().is_empty());
        assert!(session.rows().is_empty());

        let notice = session.notices().last().unwrap().clone();
        assert_eq!(notice.level, NoticeLevel::Danger);
        assert!(notice.message.starts_with("Failed to load data"));
        assert!(session.dismiss(notice.id));
        assert!(session.notices().is_empty());
    }

    #[tokio::test]
    async fn test_toggles_accumulate() {
        let client = client();
        let mut session = client.session();
        assert_eq!(
            session.record_toggle(RowHandle::new(2), "Status", true),
            Err(ClientError::NothingLoaded)
        );

        client.load_table(&mut session, "JADWAL RONDA").await.unwrap();
        assert_eq!(session.record_toggle(RowHandle::new(3), "Status", true), Ok(1));
        assert_eq!(session.record_toggle(RowHandle::new(3), "Status", true), Ok(1));
        assert_eq!(session.record_toggle(RowHandle::new(2), "Status", true), Ok(2));
        assert_eq!(session.interaction(), Interaction::Accumulating(2));

        assert!(session.is_changed(RowHandle::new(3), "Status"));
        assert!(!session.is_changed(RowHandle::new(4), "Status"));
        assert_eq!(
            session.widget(RowHandle::new(3), "Status"),
            Some(Widget::Checkbox(true))
        );

        assert!(session.record_toggle(RowHandle::new(3), "Nama", true).is_err());
        assert!(session.record_toggle(RowHandle::new(3), "Missing", true).is_err());
        assert!(session.record_toggle(RowHandle::new(40), "Status", true).is_err());

        // a reload discards unsaved toggles
        client.load_table(&mut session, "JADWAL RONDA").await.unwrap();
        assert!(session.pending().is_empty());
        assert!(!session.is_changed(RowHandle::new(3), "Status"));
    }

    #[tokio::test]
    async fn test_toggles_rejected_outside_boolean_tables() {
        let client = client();
        let mut session = client.session();
        client.load_table(&mut session, "UANG KAS").await.unwrap();
        assert!(matches!(
            session.record_toggle(RowHandle::new(2), "Jumlah", true),
            Err(ClientError::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn test_flush_with_nothing_pending() {
        let client = client();
        let mut session = client.session();
        client.load_table(&mut session, "JADWAL RONDA").await.unwrap();

        assert_eq!(client.flush_toggles(&mut session).await, Ok(FlushOutcome::NothingToSave));
        assert_eq!(session.notices().last().unwrap().level, NoticeLevel::Warning);
        assert!(!client.busy_indicator().is_busy());
    }

    #[tokio::test]
    async fn test_flush_saves_and_reloads() {
        let client = client();
        let mut session = client.session();
        client.load_table(&mut session, "JADWAL RONDA").await.unwrap();
        session.record_toggle(RowHandle::new(4), "Status", true).unwrap();
        session.record_toggle(RowHandle::new(2), "Status", true).unwrap();

        let outcome = client.flush_toggles(&mut session).await.unwrap();
        match outcome {
            FlushOutcome::Saved(report) => assert_eq!((report.success_count, report.total_count), (2, 2)),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(session.pending().is_empty());
        assert_eq!(session.interaction(), Interaction::Idle);
        assert_eq!(
            session.row(RowHandle::new(4)).unwrap().get("Status"),
            Some(&CellValue::Boolean(true))
        );
        assert_eq!(session.notices().last().unwrap().level, NoticeLevel::Success);
    }

    #[tokio::test]
    async fn test_flush_partial_failure_still_clears() {
        let client = client();
        let mut session = client.session();
        client.load_table(&mut session, "JADWAL RONDA").await.unwrap();
        session.record_toggle(RowHandle::new(2), "Status", true).unwrap();
        session.record_toggle(RowHandle::new(5), "Status", true).unwrap();

        // another writer removes a row, so handle 5 is now past the end
        let reply = client.transport().service().mutate(&MutationRequest::Delete {
            sheet: "JADWAL RONDA".to_string(),
            row: 3,
        });
        assert!(reply.is_success());

        let outcome = client.flush_toggles(&mut session).await.unwrap();
        let FlushOutcome::Saved(report) = outcome else {
            panic!("expected a batch report");
        };
        assert_eq!(report.success_count, 1);
        assert_eq!(report.failed_updates[0].index, 1);
        assert!(report.is_partial());

        assert!(session.pending().is_empty());
        assert_eq!(session.rows().len(), 3);
        assert_eq!(session.notices().last().unwrap().level, NoticeLevel::Warning);
    }

    #[tokio::test]
    async fn test_create_form() {
        let client = client();
        let mut session = client.session();
        client.load_table(&mut session, "JADWAL RONDA").await.unwrap();

        let fields = session.open_create_form().unwrap();
        assert_eq!(fields.len(), 3);
        assert!(fields.iter().all(|f| f.widget == Widget::Text(String::new())));
        assert!(matches!(
            session.interaction(),
            Interaction::Editing { mode: FormMode::Create, error: None }
        ));

        let err = client
            .submit_form(&mut session, vec![json!("Eka")])
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Invalid(_)));
        assert!(matches!(
            session.interaction(),
            Interaction::Editing { error: Some(_), .. }
        ));

        let written = client
            .submit_form(&mut session, vec![json!("Eka"), json!("Jumat"), json!(false)])
            .await
            .unwrap();
        assert_eq!(written.row, RowHandle::new(6));
        assert_eq!(session.interaction(), Interaction::Idle);
        assert_eq!(session.rows().len(), 5);
    }

    #[tokio::test]
    async fn test_update_form_prefills_and_reports_errors() {
        let client = client();
        let mut session = client.session();
        client.load_table(&mut session, "JADWAL RONDA").await.unwrap();

        let mut fields = session.open_update_form(RowHandle::new(5)).unwrap();
        assert_eq!(fields[0].widget, Widget::Text("Dewi".to_string()));
        assert_eq!(fields[2].widget, Widget::Checkbox(false));
        fields[2].widget = Widget::Checkbox(true);

        // the row disappears underneath the open form
        client.transport().service().mutate(&MutationRequest::Delete {
            sheet: "JADWAL RONDA".to_string(),
            row: 5,
        });

        let err = client
            .submit_form(&mut session, form_values(&fields))
            .await
            .unwrap_err();
        assert_eq!(err.server_kind(), Some(ErrorKind::InvalidRow));
        match session.interaction() {
            Interaction::Editing { mode, error } => {
                assert_eq!(mode, FormMode::Update(RowHandle::new(5)));
                assert!(error.unwrap().contains("Invalid row number 5"));
            }
            other => panic!("form should stay open, got {:?}", other),
        }

        session.close_modal();
        client.load_table(&mut session, "JADWAL RONDA").await.unwrap();
        let mut fields = session.open_update_form(RowHandle::new(2)).unwrap();
        fields[1].widget = Widget::Text("Minggu".to_string());
        client.submit_form(&mut session, form_values(&fields)).await.unwrap();
        assert_eq!(
            session.row(RowHandle::new(2)).unwrap().get("Hari"),
            Some(&CellValue::text("Minggu"))
        );
    }

    #[tokio::test]
    async fn test_unchanged_update_keeps_number_cells() {
        let client = client();
        let mut session = client.session();
        client.load_table(&mut session, "UANG KAS").await.unwrap();
        let handle = RowHandle::FIRST_DATA;
        assert_eq!(session.row(handle).unwrap().get("Jumlah"), Some(&CellValue::Number(50000.0)));

        let fields = session.open_update_form(handle).unwrap();
        assert_eq!(fields[1].widget, Widget::Number("50000".to_string()));
        client.submit_form(&mut session, form_values(&fields)).await.unwrap();

        assert_eq!(session.row(handle).unwrap().get("Jumlah"), Some(&CellValue::Number(50000.0)));
        assert_eq!(session.row(handle).unwrap().get("Keterangan"), Some(&CellValue::text("Iuran")));

        let mut fields = session.open_update_form(handle).unwrap();
        fields[1].widget = Widget::Number("75000".to_string());
        client.submit_form(&mut session, form_values(&fields)).await.unwrap();
        assert_eq!(session.row(handle).unwrap().get("Jumlah"), Some(&CellValue::Number(75000.0)));
    }

    #[tokio::test]
    async fn test_delete_requires_confirmation() {
        let client = client();
        let mut session = client.session();
        client.load_table(&mut session, "JADWAL RONDA").await.unwrap();

        assert!(matches!(
            client.confirm_delete(&mut session).await,
            Err(ClientError::Invalid(_))
        ));

        session.open_delete(RowHandle::new(2)).unwrap();
        assert_eq!(session.interaction(), Interaction::Confirming(RowHandle::new(2)));

        let deleted = client.confirm_delete(&mut session).await.unwrap();
        assert_eq!(deleted.row, RowHandle::new(2));
        assert_eq!(session.rows().len(), 3);
        assert_eq!(session.rows()[0].get("Nama"), Some(&CellValue::text("Andi")));
        assert_eq!(session.interaction(), Interaction::Idle);

        let last_row = client
            .transport()
            .service()
            .with_workbook(|wb| wb.sheet("JADWAL RONDA").unwrap().last_row())
            .unwrap();
        assert_eq!(last_row, 4);
    }

    #[tokio::test]
    async fn test_stale_delete_is_reported() {
        let client = client();
        let mut session = client.session();
        client.load_table(&mut session, "JADWAL RONDA").await.unwrap();

        let err = client.submit_delete(&mut session, RowHandle::new(9)).await.unwrap_err();
        assert_eq!(err.server_kind(), Some(ErrorKind::InvalidRow));
        assert_eq!(session.rows().len(), 4);
        assert_eq!(session.notices().last().unwrap().level, NoticeLevel::Danger);
        assert!(!session.is_busy());
    }

    #[tokio::test]
    async fn test_one_request_in_flight() {
        let service = service();
        let catalog = service.catalog().clone();
        let client = SyncClient::new(Yielding(LocalTransport::new(service)), catalog);
        let mut first = client.session();
        let mut second = client.session();

        let (a, b) = tokio::join!(
            client.load_table(&mut first, "JADWAL RONDA"),
            client.load_table(&mut second, "UANG KAS"),
        );
        assert_eq!(a, Ok(4));
        assert_eq!(b, Err(ClientError::Busy));
        assert!(!client.busy_indicator().is_busy());
    }

    #[tokio::test]
    async fn test_cancelled_request_releases_busy() {
        let service = service();
        let catalog = service.catalog().clone();
        let client = SyncClient::new(Yielding(LocalTransport::new(service)), catalog);
        let indicator = client.busy_indicator();
        let mut session = client.session();
        let observer = client.session();

        tokio::select! {
            biased;
            _ = client.load_table(&mut session, "JADWAL RONDA") => panic!("load should still be pending"),
            _ = async {
                assert!(indicator.is_busy());
                assert_eq!(observer.interaction(), Interaction::Submitting);
            } => {}
        }

        assert!(!indicator.is_busy());
        assert_eq!(client.load_table(&mut session, "JADWAL RONDA").await, Ok(4));
    }
}
