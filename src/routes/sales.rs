use axum::{middleware::from_fn_with_state, routing::get, Router};

use crate::handlers::sale;
use crate::middleware::auth::require_auth;
use crate::state::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Admins and staff alike; ownership is checked per sale
        .route("/sales", get(sale::list_sales).post(sale::create_sale))
        .route(
            "/sales/{id}",
            get(sale::get_sale).put(sale::update_sale).delete(sale::delete_sale),
        )
        .route_layer(from_fn_with_state(state, require_auth))
}
