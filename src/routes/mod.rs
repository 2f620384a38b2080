pub mod sales;
pub mod stock;
pub mod tanks;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;

pub fn create_router(state: AppState) -> Router<AppState> {
    Router::new()
        .merge(tanks::routes(state.clone()))
        .merge(stock::routes(state.clone()))
        .merge(sales::routes(state))
}

/// Full application: authenticated API under `/api`, open banner and health check.
pub fn app(state: AppState) -> Router {
    Router::new()
        .nest("/api", create_router(state.clone()))
        .route("/", get(|| async { "Fuel Station API" }))
        .route("/health", get(health_check))
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use chrono::Duration;
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::auth::jwt::tests::sign;
    use crate::ledger::{Ledger, LedgerSettings};
    use crate::models::Principal;
    use crate::store::MemoryStore;

    const SECRET: &str = "router-test-secret";

    struct TestApp {
        router: Router,
        admin: Principal,
        staff: Principal,
    }

    fn test_app() -> TestApp {
        let ledger = Ledger::new(Arc::new(MemoryStore::new()), LedgerSettings::default());
        let admin = Principal::admin(Uuid::new_v4());
        let staff = Principal::staff(Uuid::new_v4(), admin.id);
        TestApp { router: app(AppState::new(ledger, SECRET)), admin, staff }
    }

    async fn call(router: &Router, method: Method, uri: &str, actor: Option<&Principal>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(actor) = actor {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", sign(actor, SECRET, Duration::hours(1))));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn health_is_open_and_api_requires_token() {
        let app = test_app();
        let response = app
            .router
            .clone()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let (status, body) = call(&app.router, Method::GET, "/api/sales", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "unauthorized");
    }

    #[tokio::test]
    async fn sale_flow_over_http() {
        let app = test_app();
        let admin = Some(&app.admin);
        let staff = Some(&app.staff);

        let (status, tank) = call(
            &app.router,
            Method::POST,
            "/api/tanks",
            admin,
            Some(json!({"name": "Main petrol", "fuel_type": "petrol", "capacity": 1000})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = call(
            &app.router,
            Method::POST,
            "/api/tanks",
            staff,
            Some(json!({"name": "Diesel", "fuel_type": "diesel", "capacity": 1000})),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "forbidden");

        let (status, tanks) = call(&app.router, Method::GET, "/api/tanks", staff, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(tanks[0]["capacity"], "1000");

        let (status, body) = call(
            &app.router,
            Method::POST,
            "/api/sales",
            staff,
            Some(json!({"nozzle_id": "N1", "fuel_type": "petrol", "opening_reading": 0, "closing_reading": 10, "rate": 90})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "stock_unavailable");

        let (status, entry) = call(
            &app.router,
            Method::POST,
            "/api/stock",
            admin,
            Some(json!({"tank_id": tank["id"], "dip_reading": 800})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(entry["closing_stock"], "800");

        let (status, sale) = call(
            &app.router,
            Method::POST,
            "/api/sales",
            staff,
            Some(json!({"nozzle_id": "N1", "fuel_type": "petrol", "opening_reading": 0, "closing_reading": 100, "rate": 90})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(sale["amount"], "9000");

        let (status, body) = call(
            &app.router,
            Method::POST,
            "/api/sales",
            admin,
            Some(json!({"nozzle_id": "N2", "fuel_type": "petrol", "opening_reading": 100, "closing_reading": 850, "rate": 90})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "insufficient_stock");

        let sale_uri = format!("/api/sales/{}", sale["id"].as_str().unwrap());
        let (status, updated) = call(&app.router, Method::PUT, &sale_uri, staff, Some(json!({"closing_reading": 150}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["quantity"], "150");

        let entry_uri = format!("/api/stock/{}", entry["id"].as_str().unwrap());
        let (_, entry) = call(&app.router, Method::GET, &entry_uri, staff, None).await;
        assert_eq!(entry["closing_stock"], "650");

        let (status, body) = call(&app.router, Method::DELETE, &sale_uri, admin, None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["message"].is_string());

        let (_, entry) = call(&app.router, Method::GET, &entry_uri, admin, None).await;
        assert_eq!(entry["closing_stock"], "800");
        let (_, sales) = call(&app.router, Method::GET, "/api/sales", admin, None).await;
        assert_eq!(sales.as_array().map(Vec::len), Some(0));
    }

    #[tokio::test]
    async fn missing_sale_fields_are_a_validation_error() {
        let app = test_app();
        let (status, body) = call(
            &app.router,
            Method::POST,
            "/api/sales",
            Some(&app.admin),
            Some(json!({"nozzle_id": "N1", "fuel_type": "petrol"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid_argument");
    }

    #[tokio::test]
    async fn malformed_bodies_get_the_error_envelope() {
        let app = test_app();
        let admin = Some(&app.admin);

        let (status, body) =
            call(&app.router, Method::POST, "/api/tanks", admin, Some(json!({"name": "Petrol", "fuel_type": "petrol"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid_argument");
        assert!(body["error"].as_str().is_some_and(|e| e.contains("capacity")));

        let (status, tank) = call(
            &app.router,
            Method::POST,
            "/api/tanks",
            admin,
            Some(json!({"name": "Petrol", "fuel_type": "petrol", "capacity": 1000})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = call(&app.router, Method::POST, "/api/stock", admin, Some(json!({"tank_id": tank["id"]}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid_argument");
        assert!(body["error"].as_str().is_some_and(|e| e.contains("dip_reading")));

        let (status, body) = call(&app.router, Method::GET, "/api/stock/not-a-uuid", admin, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid_argument");
    }
}
