//! Error types for the table store and the sync client

use thiserror::Error;

/// Coarse error classes carried on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidInput,
    InvalidRow,
    Internal,
}

impl ErrorKind {
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::InvalidInput => "INVALID_INPUT",
            ErrorKind::InvalidRow => "INVALID_ROW",
            ErrorKind::Internal => "INTERNAL",
        }
    }

    pub fn from_code(code: &str) -> Option<ErrorKind> {
        match code {
            "NOT_FOUND" => Some(ErrorKind::NotFound),
            "INVALID_INPUT" => Some(ErrorKind::InvalidInput),
            "INVALID_ROW" => Some(ErrorKind::InvalidRow),
            "INTERNAL" => Some(ErrorKind::Internal),
            _ => None,
        }
    }

    /// HTTP status used by the server front
    pub fn http_status(self) -> u16 {
        match self {
            ErrorKind::NotFound => 404,
            ErrorKind::InvalidInput | ErrorKind::InvalidRow => 400,
            ErrorKind::Internal => 500,
        }
    }
}

/// Errors raised by the table store adapter and its backing workbook
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("Sheet \"{name}\" not found. Available sheets: {}", available.join(", "))]
    TableNotFound { name: String, available: Vec<String> },

    #[error("Column \"{0}\" not found")]
    ColumnNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid row number {row}: data rows are 2..={last_row}")]
    InvalidRow { row: i64, last_row: u32 },

    #[error("Storage error: {0}")]
    Storage(String),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::TableNotFound { .. } | StoreError::ColumnNotFound(_) => ErrorKind::NotFound,
            StoreError::InvalidInput(_) => ErrorKind::InvalidInput,
            StoreError::InvalidRow { .. } => ErrorKind::InvalidRow,
            StoreError::Storage(_) => ErrorKind::Internal,
        }
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors surfaced by the sync client
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClientError {
    #[error("Another request is still in progress")]
    Busy,

    #[error("No table has been loaded")]
    NothingLoaded,

    #[error("{0}")]
    Invalid(String),

    #[error("{message}")]
    Server {
        kind: Option<ErrorKind>,
        message: String,
    },

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Malformed response: {0}")]
    Decode(String),
}

impl ClientError {
    pub fn server_kind(&self) -> Option<ErrorKind> {
        match self {
            ClientError::Server { kind, .. } => *kind,
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        ClientError::Decode(e.to_string())
    }
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;
