//! SheetBridge - Spreadsheet Tables as a JSON CRUD API
//!
//! Named tables whose first row is the header are exposed through a small
//! read/mutate protocol. Rows are addressed by physical position, reads are
//! keyed by formatted header names, and the sync client reloads after every
//! mutation instead of patching its local view.

pub mod value;
pub mod row;
pub mod error;
pub mod sheet;
pub mod storage;
pub mod config;
pub mod adapter;
pub mod messages;
pub mod service;
pub mod pending;
pub mod transport;
pub mod client;

pub use value::{CellValue, Widget};
pub use row::{Row, RowHandle, ROW_KEY};
pub use error::{ClientError, ClientResult, ErrorKind, StoreError, StoreResult};
pub use sheet::{MemorySheet, MemoryWorkbook, Sheet, Workbook};
pub use config::{ClientConfig, Config, ConfigError, ServerConfig, TableCatalog};
pub use messages::{BatchEntry, BatchReport, MutationRequest, TableSnapshot};
pub use service::{Reply, Service};
pub use pending::PendingEdits;
pub use transport::{LocalTransport, Transport};
pub use client::{FlushOutcome, FormField, FormMode, Interaction, Notice, NoticeLevel, Session, SyncClient};

#[cfg(feature = "client")]
pub use transport::HttpTransport;

// HTTP server - only when server feature is enabled
#[cfg(feature = "server")]
pub mod server;
