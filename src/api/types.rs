//! API request and response types

use crate::records::Record;
use serde::{Deserialize, Serialize};

/// Query string for `GET /api/records`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRecordsQuery {
    #[serde(rename = "type")]
    pub record_type: Option<String>,
    pub category: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub sort_by: Option<String>,
    pub sort_descending: Option<bool>,
}

/// Query string for `GET /api/ussd/balance`
#[derive(Debug, Default, Deserialize)]
pub struct BalanceQuery {
    #[serde(rename = "type")]
    pub record_type: Option<String>,
    pub category: Option<String>,
}

/// One page of records
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordListResponse {
    /// Size of the whole filtered set, not of this page
    pub count: u64,
    pub page: u32,
    pub page_size: u32,
    pub data: Vec<Record>,
}

#[derive(Debug, Serialize)]
pub struct PingResponse {
    pub status: &'static str,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
