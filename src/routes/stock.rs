use axum::{middleware::from_fn_with_state, routing::get, Router};

use crate::handlers::stock::{create_stock, delete_stock, get_stock, list_stock, update_stock};
use crate::middleware::auth::require_auth;
use crate::state::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/stock", get(list_stock).post(create_stock))
        .route("/stock/{id}", get(get_stock).put(update_stock).delete(delete_stock))
        .route_layer(from_fn_with_state(state, require_auth))
}
