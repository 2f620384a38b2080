use axum::{middleware::from_fn_with_state, routing::get, Router};

use crate::handlers::tank::{create_tank, delete_tank, get_tank, list_tanks, update_tank};
use crate::middleware::auth::require_auth;
use crate::state::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/tanks", get(list_tanks).post(create_tank))
        .route("/tanks/{id}", get(get_tank).put(update_tank).delete(delete_tank))
        .route_layer(from_fn_with_state(state, require_auth))
}
