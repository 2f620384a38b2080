use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::Utc;
use uuid::Uuid;

use crate::dtos::sale::{CreateSaleRequest, SaleResponse, UpdateSaleRequest};
use crate::dtos::MessageResponse;
use crate::error::AppError;
use crate::extract::{AppJson, AppPath};
use crate::models::Principal;
use crate::state::AppState;

// POST /sales
pub async fn create_sale(
    State(state): State<AppState>,
    Extension(actor): Extension<Principal>,
    AppJson(req): AppJson<CreateSaleRequest>,
) -> Result<(StatusCode, Json<SaleResponse>), AppError> {
    let sale = state.ledger.create_sale(&actor, req, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(sale.into())))
}

// GET /sales - admins see the station's sales, staff their own
pub async fn list_sales(
    State(state): State<AppState>,
    Extension(actor): Extension<Principal>,
) -> Result<Json<Vec<SaleResponse>>, AppError> {
    let sales = state.ledger.list_sales(&actor).await?;
    Ok(Json(sales.into_iter().map(SaleResponse::from).collect()))
}

// GET /sales/{id}
pub async fn get_sale(
    State(state): State<AppState>,
    Extension(actor): Extension<Principal>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<SaleResponse>, AppError> {
    let sale = state.ledger.get_sale(&actor, id).await?;
    Ok(Json(sale.into()))
}

// PUT /sales/{id}
pub async fn update_sale(
    State(state): State<AppState>,
    Extension(actor): Extension<Principal>,
    AppPath(id): AppPath<Uuid>,
    AppJson(req): AppJson<UpdateSaleRequest>,
) -> Result<Json<SaleResponse>, AppError> {
    let sale = state.ledger.update_sale(&actor, id, req, Utc::now()).await?;
    Ok(Json(sale.into()))
}

// DELETE /sales/{id}
pub async fn delete_sale(
    State(state): State<AppState>,
    Extension(actor): Extension<Principal>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<MessageResponse>, AppError> {
    state.ledger.delete_sale(&actor, id, Utc::now()).await?;
    Ok(Json(MessageResponse::new("Sale deleted and stock restored")))
}
