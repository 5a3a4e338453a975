use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures_util::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::warn;

use crate::application::services::import_service::ImportService;
use crate::application::services::order_service::{OrderService, Page, Quote, ResolvedPoint};
use crate::domain::entities::import_session::{ImportEvent, ImportSummary, SessionId};
use crate::domain::entities::order::{OrderRecord, RawRow, UpsertOutcome};
use crate::domain::errors::{ImportError, OrderError};
use crate::domain::value_objects::coordinates::Coordinates;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub orders: OrderService,
    pub imports: ImportService,
}

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, error: impl ToString) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
}

impl From<OrderError> for (StatusCode, Json<ErrorResponse>) {
    fn from(err: OrderError) -> Self {
        let status = match &err {
            OrderError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
            OrderError::NotFound(_) => StatusCode::NOT_FOUND,
            OrderError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        api_error(status, err)
    }
}

impl From<ImportError> for (StatusCode, Json<ErrorResponse>) {
    fn from(err: ImportError) -> Self {
        let status = match &err {
            ImportError::Parse(_) => StatusCode::BAD_REQUEST,
            ImportError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            ImportError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        api_error(status, err)
    }
}

/// Query parameters for point lookups
#[derive(Debug, Serialize, Deserialize)]
pub struct PointQuery {
    pub lat: f64,
    pub lon: f64,
}

/// Query parameters for tax quotes
#[derive(Debug, Serialize, Deserialize)]
pub struct QuoteQuery {
    pub lat: f64,
    pub lon: f64,
    pub subtotal: f64,
}

/// Pagination for order listing (limit default 50, max 500)
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ListQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// Manual order body
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub id: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub subtotal: f64,
    pub timestamp: Option<String>,
}

impl From<CreateOrderRequest> for RawRow {
    fn from(req: CreateOrderRequest) -> Self {
        RawRow {
            id: Some(req.id.to_string()),
            latitude: Some(req.latitude.to_string()),
            longitude: Some(req.longitude.to_string()),
            subtotal: Some(req.subtotal.to_string()),
            timestamp: req.timestamp,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreateOrderResponse {
    pub outcome: UpsertOutcome,
    pub order: OrderRecord,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CancelResponse {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    pub cancelled: bool,
}

pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Resolve the jurisdiction for a point
pub async fn resolve_jurisdiction(
    State(state): State<AppState>,
    Query(params): Query<PointQuery>,
) -> Result<Json<ResolvedPoint>, ApiError> {
    let resolved = state
        .orders
        .resolve(Coordinates::new(params.lat, params.lon))
        .await?;
    Ok(Json(resolved))
}

/// Quote tax for a subtotal at a point, without storing anything
pub async fn quote_tax(
    State(state): State<AppState>,
    Query(params): Query<QuoteQuery>,
) -> Result<Json<Quote>, ApiError> {
    let quote = state
        .orders
        .quote(Coordinates::new(params.lat, params.lon), params.subtotal)
        .await?;
    Ok(Json(quote))
}

pub async fn create_order(
    State(state): State<AppState>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<CreateOrderResponse>), ApiError> {
    let (outcome, order) = state.orders.create_order(&request.into()).await?;
    let status = match outcome {
        UpsertOutcome::Inserted => StatusCode::CREATED,
        UpsertOutcome::Updated => StatusCode::OK,
    };
    Ok((status, Json(CreateOrderResponse { outcome, order })))
}

pub async fn list_orders(
    State(state): State<AppState>,
    Query(params): Query<ListQuery>,
) -> Result<Json<Page>, ApiError> {
    Ok(Json(
        state.orders.list_orders(params.limit, params.offset).await?,
    ))
}

pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<OrderRecord>, ApiError> {
    Ok(Json(state.orders.get_order(id).await?))
}

/// Import a CSV body and answer with the final summary
pub async fn import_orders(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ImportSummary>, ApiError> {
    Ok(Json(state.imports.import_csv_synchronously(&body).await?))
}

/// Import a CSV body, streaming `ImportEvent`s as server-sent events.
///
/// A parse error is answered with 400 before any event is sent.
pub async fn import_orders_stream(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, ApiError> {
    let (_, events) = state.imports.start_streaming_csv_import(&body).await?;
    Ok(Sse::new(event_stream(events)).keep_alive(KeepAlive::default()))
}

fn event_stream(
    events: mpsc::Receiver<ImportEvent>,
) -> impl Stream<Item = Result<Event, axum::Error>> {
    stream::unfold(events, |mut events| async move {
        let event = events.recv().await?;
        let sse = Event::default().json_data(&event);
        if let Err(e) = &sse {
            warn!("Failed to encode import event: {}", e);
        }
        Some((sse, events))
    })
}

pub async fn cancel_import(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<CancelResponse>, ApiError> {
    state
        .imports
        .cancel_session(&SessionId::from(session_id.as_str()))
        .await?;
    Ok(Json(CancelResponse {
        session_id,
        cancelled: true,
    }))
}
