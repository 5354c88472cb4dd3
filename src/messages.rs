//! Request and response types shared by the server and the sync client.
//!
//! Reads are `GET ?sheet=<name>`. Mutations are `POST` bodies tagged by
//! `action`. Every response is a JSON object with `success` and `timestamp`;
//! errors add `error` (and a machine-readable `code`) and carry no data fields.

use crate::error::{ClientError, ClientResult, ErrorKind, StoreError};
use crate::row::{Row, RowHandle};
use chrono::{SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};

/// Query string of a read request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReadQuery {
    pub sheet: Option<String>,
}

/// Mutations a client may request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum MutationRequest {
    /// Append a row; values are positional, in header order
    Create { sheet: String, values: Vec<JsonValue> },

    /// Overwrite a whole row positionally
    Update {
        sheet: String,
        row: i64,
        values: Vec<JsonValue>,
    },

    Delete { sheet: String, row: i64 },

    /// Write one cell addressed by formatted header name
    UpdateCell {
        sheet: String,
        row: i64,
        column: String,
        #[serde(default)]
        value: JsonValue,
    },

    /// Independent single-cell writes with partial success
    UpdateBatch {
        sheet: String,
        updates: Vec<BatchEntry>,
    },
}

impl MutationRequest {
    pub fn sheet(&self) -> &str {
        match self {
            MutationRequest::Create { sheet, .. }
            | MutationRequest::Update { sheet, .. }
            | MutationRequest::Delete { sheet, .. }
            | MutationRequest::UpdateCell { sheet, .. }
            | MutationRequest::UpdateBatch { sheet, .. } => sheet,
        }
    }

    pub fn action(&self) -> &'static str {
        match self {
            MutationRequest::Create { .. } => "create",
            MutationRequest::Update { .. } => "update",
            MutationRequest::Delete { .. } => "delete",
            MutationRequest::UpdateCell { .. } => "updateCell",
            MutationRequest::UpdateBatch { .. } => "updateBatch",
        }
    }
}

/// One entry of a batch update.
///
/// `row` and `column` are optional on the wire so that a malformed entry
/// fails on its own instead of rejecting the whole batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    #[serde(default)]
    pub value: JsonValue,
}

impl BatchEntry {
    pub fn new(row: RowHandle, column: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        BatchEntry {
            row: Some(row.into()),
            column: Some(column.into()),
            value: value.into(),
        }
    }
}

/// Response payload of a read
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSnapshot {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
    pub count: usize,
    pub sheet: String,
}

impl TableSnapshot {
    pub fn empty(sheet: impl Into<String>) -> Self {
        TableSnapshot {
            headers: Vec::new(),
            rows: Vec::new(),
            count: 0,
            sheet: sheet.into(),
        }
    }
}

/// Response payload of `create` and `update`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowWritten {
    pub row: RowHandle,
    pub values: Vec<JsonValue>,
}

/// Response payload of `delete`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowDeleted {
    pub row: RowHandle,
}

/// Response payload of `updateCell`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellWritten {
    pub row: RowHandle,
    pub column: String,
    pub value: JsonValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedUpdate {
    pub index: usize,
    pub update: BatchEntry,
    pub error: String,
}

/// Response payload of `updateBatch`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub success_count: usize,
    pub total_count: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_updates: Vec<FailedUpdate>,
}

impl BatchReport {
    /// Some entries were applied and some were not
    pub fn is_partial(&self) -> bool {
        !self.failed_updates.is_empty() && self.success_count > 0
    }

    pub fn all_applied(&self) -> bool {
        self.success_count == self.total_count
    }
}

#[derive(Serialize)]
struct SuccessEnvelope<'a, T: Serialize> {
    success: bool,
    #[serde(flatten)]
    payload: &'a T,
    timestamp: String,
}

pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// `{success: true, ...payload, timestamp}`
pub fn success_body<T: Serialize>(payload: &T) -> Result<JsonValue, serde_json::Error> {
    serde_json::to_value(SuccessEnvelope {
        success: true,
        payload,
        timestamp: timestamp(),
    })
}

/// `{success: false, error, code, timestamp}`
pub fn error_body(err: &StoreError) -> JsonValue {
    json!({
        "success": false,
        "error": err.to_string(),
        "code": err.kind().code(),
        "timestamp": timestamp(),
    })
}

/// Decode a response body, turning an error envelope into `ClientError::Server`
pub fn decode<T: DeserializeOwned>(body: JsonValue) -> ClientResult<T> {
    let success = body
        .get("success")
        .and_then(JsonValue::as_bool)
        .unwrap_or(false);

    if !success {
        let message = body
            .get("error")
            .and_then(JsonValue::as_str)
            .unwrap_or("Unknown error")
            .to_string();
        let kind = body
            .get("code")
            .and_then(JsonValue::as_str)
            .and_then(ErrorKind::from_code);
        return Err(ClientError::Server { kind, message });
    }

    Ok(serde_json::from_value(body)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requests_are_tagged_by_action() {
        let request: MutationRequest = serde_json::from_value(json!({
            "sheet": "UANG KAS",
            "action": "update",
            "row": 4,
            "values": ["1/3/2024", "Iuran", 50000]
        }))
        .unwrap();
        assert_eq!(request.action(), "update");
        assert_eq!(request.sheet(), "UANG KAS");

        let batch = MutationRequest::UpdateBatch {
            sheet: "JADWAL RONDA".to_string(),
            updates: vec![BatchEntry::new(RowHandle::new(2), "Status", true)],
        };
        assert_eq!(
            serde_json::to_value(&batch).unwrap(),
            json!({
                "action": "updateBatch",
                "sheet": "JADWAL RONDA",
                "updates": [{"row": 2, "column": "Status", "value": true}]
            })
        );
    }

    #[test]
    fn test_malformed_requests_fail_to_parse() {
        let not_a_sequence = serde_json::from_value::<MutationRequest>(json!({
            "sheet": "UANG KAS", "action": "create", "values": "oops"
        }));
        assert!(not_a_sequence.is_err());

        let missing_row = serde_json::from_value::<MutationRequest>(json!({
            "sheet": "UANG KAS", "action": "delete"
        }));
        assert!(missing_row.is_err());

        let unknown_action = serde_json::from_value::<MutationRequest>(json!({
            "sheet": "UANG KAS", "action": "truncate"
        }));
        assert!(unknown_action.is_err());
    }

    #[test]
    fn test_batch_entry_fields_are_optional() {
        let entry: BatchEntry = serde_json::from_value(json!({"column": "Status"})).unwrap();
        assert_eq!(entry.row, None);
        assert_eq!(entry.value, JsonValue::Null);
    }

    #[test]
    fn test_success_envelope_shape() {
        let body = success_body(&RowDeleted { row: RowHandle::new(3) }).unwrap();
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["row"], json!(3));
        assert!(body["timestamp"].is_string());

        let report = BatchReport {
            success_count: 2,
            total_count: 2,
            failed_updates: Vec::new(),
        };
        let body = success_body(&report).unwrap();
        assert_eq!(body["successCount"], json!(2));
        assert!(body.get("failedUpdates").is_none());
    }

    #[test]
    fn test_decode() {
        let body = success_body(&RowDeleted { row: RowHandle::new(5) }).unwrap();
        let deleted: RowDeleted = decode(body).unwrap();
        assert_eq!(deleted.row, RowHandle::new(5));

        let err = error_body(&StoreError::InvalidRow { row: 1, last_row: 3 });
        assert!(err.get("row").is_none());
        match decode::<RowDeleted>(err) {
            Err(ClientError::Server { kind, message }) => {
                assert_eq!(kind, Some(ErrorKind::InvalidRow));
                assert!(message.contains("Invalid row number 1"));
            }
            other => panic!("expected server error, got {:?}", other),
        }
    }
}
