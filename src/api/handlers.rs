//! HTTP request handlers

use super::types::{BalanceQuery, ErrorResponse, ListRecordsQuery, PingResponse, RecordListResponse};
use super::AppState;
use crate::records::{
    BalanceSummary, NewRecord, Record, RecordError, RecordFilters, RecordType, RecordUpdate,
    SortField,
};
use crate::ussd::{UssdRequest, UssdResponse};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Gateway callback
        .route("/api/ussd", post(handle_ussd))
        .route("/api/ussd/balance", get(get_balance))
        // Record management
        .route("/api/records", post(create_record).get(list_records))
        .route(
            "/api/records/:id",
            get(get_record).put(update_record).delete(delete_record),
        )
        // Liveness
        .route("/ping", get(ping))
        .with_state(state)
}

// ============================================================
// USSD
// ============================================================

async fn handle_ussd(
    State(state): State<AppState>,
    Json(request): Json<UssdRequest>,
) -> Result<Json<UssdResponse>, AppError> {
    let response = state
        .ussd
        .handle(request)
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    Ok(Json(response))
}

async fn get_balance(
    State(state): State<AppState>,
    Query(query): Query<BalanceQuery>,
) -> Result<Json<BalanceSummary>, AppError> {
    let filters = RecordFilters {
        record_type: parse_record_type(query.record_type.as_deref())?,
        category: query.category,
        ..RecordFilters::default()
    };
    let summary = state.records.aggregate_balance(Some(&filters)).await?;
    Ok(Json(summary))
}

// ============================================================
// Records
// ============================================================

async fn create_record(
    State(state): State<AppState>,
    Json(new): Json<NewRecord>,
) -> Result<(StatusCode, Json<Record>), AppError> {
    let record = state.records.create(new).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn list_records(
    State(state): State<AppState>,
    Query(query): Query<ListRecordsQuery>,
) -> Result<Json<RecordListResponse>, AppError> {
    let defaults = RecordFilters::default();
    let filters = RecordFilters {
        record_type: parse_record_type(query.record_type.as_deref())?,
        category: query.category,
        page: query.page.unwrap_or(defaults.page),
        page_size: query.page_size.unwrap_or(defaults.page_size),
        sort_by: parse_sort_field(query.sort_by.as_deref())?,
        sort_descending: query.sort_descending.unwrap_or(defaults.sort_descending),
    };

    let page = state.records.list_page(&filters).await?;
    Ok(Json(RecordListResponse {
        count: page.total_count,
        page: filters.effective_page(),
        page_size: filters.effective_page_size(),
        data: page.records,
    }))
}

async fn get_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Record>, AppError> {
    state
        .records
        .get_by_id(&id)
        .await?
        .map(Json)
        .ok_or_else(|| record_not_found(&id))
}

async fn update_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<RecordUpdate>,
) -> Result<Json<Record>, AppError> {
    state
        .records
        .update(&id, update)
        .await?
        .map(Json)
        .ok_or_else(|| record_not_found(&id))
}

async fn delete_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if state.records.delete(&id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(record_not_found(&id))
    }
}

async fn ping() -> Json<PingResponse> {
    Json(PingResponse { status: "ok" })
}

// ============================================================
// Query Parsing
// ============================================================

fn parse_record_type(raw: Option<&str>) -> Result<Option<RecordType>, AppError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(AppError::BadRequest),
    }
}

fn parse_sort_field(raw: Option<&str>) -> Result<SortField, AppError> {
    let Some(value) = raw.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(SortField::default());
    };
    match value.to_ascii_lowercase().replace('_', "").as_str() {
        "createdat" => Ok(SortField::CreatedAt),
        "updatedat" => Ok(SortField::UpdatedAt),
        "amount" => Ok(SortField::Amount),
        _ => Err(AppError::BadRequest(format!("unknown sort field: {value}"))),
    }
}

fn record_not_found(id: &str) -> AppError {
    AppError::NotFound(format!("Record not found: {id}"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl From<RecordError> for AppError {
    fn from(e: RecordError) -> Self {
        match e {
            RecordError::Invalid(msg) => AppError::BadRequest(msg),
            other => {
                tracing::error!(error = %other, "Record service failed");
                AppError::Internal(other.to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
