use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::Utc;
use uuid::Uuid;

use crate::dtos::MessageResponse;
use crate::dtos::tank::{CreateTankRequest, TankResponse, UpdateTankRequest};
use crate::error::AppError;
use crate::extract::{AppJson, AppPath};
use crate::models::Principal;
use crate::state::AppState;

// POST /tanks
pub async fn create_tank(
    State(state): State<AppState>,
    Extension(actor): Extension<Principal>,
    AppJson(req): AppJson<CreateTankRequest>,
) -> Result<(StatusCode, Json<TankResponse>), AppError> {
    let tank = state.ledger.create_tank(&actor, req, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(tank.into())))
}

// GET /tanks
pub async fn list_tanks(
    State(state): State<AppState>,
    Extension(actor): Extension<Principal>,
) -> Result<Json<Vec<TankResponse>>, AppError> {
    let tanks = state.ledger.list_tanks(&actor).await?;
    Ok(Json(tanks.into_iter().map(TankResponse::from).collect()))
}

// GET /tanks/{id}
pub async fn get_tank(
    State(state): State<AppState>,
    Extension(actor): Extension<Principal>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<TankResponse>, AppError> {
    let tank = state.ledger.get_tank(&actor, id).await?;
    Ok(Json(tank.into()))
}

// PUT /tanks/{id}
pub async fn update_tank(
    State(state): State<AppState>,
    Extension(actor): Extension<Principal>,
    AppPath(id): AppPath<Uuid>,
    AppJson(req): AppJson<UpdateTankRequest>,
) -> Result<Json<TankResponse>, AppError> {
    let tank = state.ledger.update_tank(&actor, id, req, Utc::now()).await?;
    Ok(Json(tank.into()))
}

// DELETE /tanks/{id}
pub async fn delete_tank(
    State(state): State<AppState>,
    Extension(actor): Extension<Principal>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<MessageResponse>, AppError> {
    state.ledger.delete_tank(&actor, id).await?;
    Ok(Json(MessageResponse::new("Tank deleted successfully")))
}
