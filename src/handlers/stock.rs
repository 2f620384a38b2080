use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::Utc;
use uuid::Uuid;

use crate::dtos::MessageResponse;
use crate::dtos::stock::{CreateStockRequest, StockEntryResponse, UpdateStockRequest};
use crate::error::AppError;
use crate::extract::{AppJson, AppPath};
use crate::models::Principal;
use crate::state::AppState;

// POST /stock
pub async fn create_stock(
    State(state): State<AppState>,
    Extension(actor): Extension<Principal>,
    AppJson(req): AppJson<CreateStockRequest>,
) -> Result<(StatusCode, Json<StockEntryResponse>), AppError> {
    let entry = state.ledger.create_stock_entry(&actor, req, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(entry.into())))
}

// GET /stock
pub async fn list_stock(
    State(state): State<AppState>,
    Extension(actor): Extension<Principal>,
) -> Result<Json<Vec<StockEntryResponse>>, AppError> {
    let entries = state.ledger.list_stock_entries(&actor).await?;
    Ok(Json(entries.into_iter().map(StockEntryResponse::from).collect()))
}

// GET /stock/{id}
pub async fn get_stock(
    State(state): State<AppState>,
    Extension(actor): Extension<Principal>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<StockEntryResponse>, AppError> {
    let entry = state.ledger.get_stock_entry(&actor, id).await?;
    Ok(Json(entry.into()))
}

// PUT /stock/{id}
pub async fn update_stock(
    State(state): State<AppState>,
    Extension(actor): Extension<Principal>,
    AppPath(id): AppPath<Uuid>,
    AppJson(req): AppJson<UpdateStockRequest>,
) -> Result<Json<StockEntryResponse>, AppError> {
    let entry = state.ledger.update_stock_entry(&actor, id, req, Utc::now()).await?;
    Ok(Json(entry.into()))
}

// DELETE /stock/{id}
pub async fn delete_stock(
    State(state): State<AppState>,
    Extension(actor): Extension<Principal>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<MessageResponse>, AppError> {
    state.ledger.delete_stock_entry(&actor, id).await?;
    Ok(Json(MessageResponse::new("Stock deleted successfully")))
}
