use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use permafolio::market_data::{QuoteService, StaticPriceSource};
use permafolio::models::Id;
use permafolio::service::PortfolioService;
use permafolio::storage::{JsonFileStorage, MemoryStorage, Storage};
use permafolio_server::{app_router, AppState};
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tower::ServiceExt;

fn router_with(storage: Arc<dyn Storage>) -> Router {
    let prices = StaticPriceSource::new()
        .with_price("600519", dec!(100))
        .with_price("019547", dec!(100))
        .with_price("AU9999", dec!(100));
    let service = PortfolioService::new(storage, Arc::new(QuoteService::new(Arc::new(prices))))
        .with_expected_return(Some(0.06));
    app_router(Arc::new(AppState::new(service, Id::from("local"))))
}

fn test_router() -> Router {
    router_with(Arc::new(MemoryStorage::new()))
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    user: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header("X-User-Id", user);
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn create(app: &Router, user: Option<&str>, body: Value) -> Value {
    let (status, created) = send(app, Method::POST, "/api/assets", user, Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    created
}

#[tokio::test]
async fn health_reports_ok() {
    let app = test_router();
    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["storage"], "ok");
}

#[tokio::test]
async fn create_list_and_overview() {
    let app = test_router();
    let stock = create(
        &app,
        None,
        json!({"asset_type": "stock", "symbol": "600519", "quantity": 10, "name": "Moutai"}),
    )
    .await;
    assert_eq!(stock["asset_type"], "stock");
    assert_eq!(stock["current_price"].as_f64(), Some(100.0));
    assert_eq!(stock["total_value"].as_f64(), Some(1000.0));

    create(
        &app,
        None,
        json!({"asset_type": "cash", "symbol": "CNY", "quantity": 500}),
    )
    .await;

    let (status, list) = send(&app, Method::GET, "/api/assets", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().map(Vec::len), Some(2));

    let (status, overview) = send(&app, Method::GET, "/api/assets/overview", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(overview["total_value"].as_f64(), Some(1500.0));
    assert_eq!(overview["cash_value"].as_f64(), Some(500.0));
    assert_eq!(overview["stock_value"].as_f64(), Some(1000.0));
}

#[tokio::test]
async fn rebalancing_suggestions_over_http() {
    let app = test_router();
    for (asset_type, symbol, quantity) in [
        ("cash", "CNY", 50000),
        ("stock", "600519", 250),
        ("bond", "019547", 150),
        ("gold", "AU9999", 100),
    ] {
        create(
            &app,
            Some("alice"),
            json!({"asset_type": asset_type, "symbol": symbol, "quantity": quantity}),
        )
        .await;
    }

    let (status, result) = send(
        &app,
        Method::GET,
        "/api/rebalancing/suggestions",
        Some("alice"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["current_allocation"]["cash"].as_f64(), Some(50.0));
    assert_eq!(result["target_allocation"]["growth"].as_f64(), Some(25.0));
    assert_eq!(result["expected_return"].as_f64(), Some(0.06));

    let suggestions = result["suggestions"].as_array().unwrap();
    assert_eq!(suggestions.len(), 3);
    assert_eq!(suggestions[0]["action"], "sell");
    assert_eq!(suggestions[0]["asset_type"], "cash");
    assert_eq!(suggestions[0]["amount"].as_f64(), Some(25000.0));
    assert_eq!(suggestions[1]["action"], "buy");
    assert_eq!(suggestions[1]["asset_type"], "bond");
    assert_eq!(suggestions[1]["amount"].as_f64(), Some(10000.0));
    assert_eq!(suggestions[2]["asset_type"], "gold");
    assert_eq!(suggestions[2]["amount"].as_f64(), Some(15000.0));

    let (status, unprefixed) =
        send(&app, Method::GET, "/rebalancing/suggestions", Some("alice"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(unprefixed, result);

    // The default user has no holdings.
    let (_, result) = send(&app, Method::GET, "/api/rebalancing/suggestions", None, None).await;
    assert_eq!(result["suggestions"], json!([]));
}

#[tokio::test]
async fn update_and_delete_holdings() {
    let app = test_router();
    let stock = create(
        &app,
        None,
        json!({"asset_type": "stock", "symbol": "600519", "quantity": 10}),
    )
    .await;
    let id = stock["id"].as_str().unwrap().to_string();

    let (status, updated) = send(
        &app,
        Method::PUT,
        &format!("/api/assets/{id}"),
        None,
        Some(json!({"quantity": 20})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["quantity"].as_f64(), Some(20.0));
    assert_eq!(updated["total_value"].as_f64(), Some(2000.0));

    let (status, _) = send(&app, Method::DELETE, &format!("/api/assets/{id}"), None, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, Method::DELETE, &format!("/api/assets/{id}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn batch_delete_counts_removed_holdings() {
    let app = test_router();
    let a = create(&app, None, json!({"asset_type": "cash", "symbol": "CNY", "quantity": 1})).await;
    let b = create(&app, None, json!({"asset_type": "cash", "symbol": "USD", "quantity": 2})).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/assets/batch-delete",
        None,
        Some(json!({"asset_ids": [a["id"], b["id"], "missing"]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], 2);
}

#[tokio::test]
async fn refresh_without_quote_is_unavailable() {
    let app = test_router();
    let fund = create(
        &app,
        None,
        json!({"asset_type": "fund", "symbol": "005875", "quantity": 1000, "purchase_price": 1.2}),
    )
    .await;
    assert_eq!(fund["current_price"].as_f64(), Some(1.2));
    let id = fund["id"].as_str().unwrap();

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/assets/{id}/refresh"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "PRICE_UNAVAILABLE");

    let (status, all) = send(&app, Method::POST, "/api/assets/refresh-all", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all[0]["current_price"].as_f64(), Some(1.2));
}

#[tokio::test]
async fn invalid_requests_are_rejected() {
    let app = test_router();

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/assets",
        None,
        Some(json!({"asset_type": "crypto", "symbol": "BTC", "quantity": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/assets",
        None,
        Some(json!({"asset_type": "stock", "symbol": "600519", "quantity": -5})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, _) = send(&app, Method::GET, "/api/assets", Some("../etc"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn oversized_holding_is_rejected_and_reads_keep_working() {
    let app = test_router();
    create(&app, None, json!({"asset_type": "cash", "symbol": "CNY", "quantity": 500})).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/assets",
        None,
        Some(json!({
            "asset_type": "stock",
            "symbol": "X",
            "quantity": "100000000000000000000",
            "purchase_price": "10000000000"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    for uri in [
        "/api/assets",
        "/api/assets/overview",
        "/rebalancing/suggestions",
        "/api/reports/daily",
    ] {
        let (status, body) = send(&app, Method::GET, uri, None, None).await;
        assert_eq!(status, StatusCode::OK, "{uri}: {body}");
    }
}

#[tokio::test]
async fn daily_report_scores_cash_ratio() {
    let app = test_router();
    create(&app, None, json!({"asset_type": "cash", "symbol": "CNY", "quantity": 100})).await;
    create(&app, None, json!({"asset_type": "stock", "symbol": "600519", "quantity": 10})).await;

    let (status, report) = send(&app, Method::GET, "/api/reports/daily", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["total_assets"].as_f64(), Some(1100.0));
    assert_eq!(report["health_score"], 70);
    assert_eq!(report["risk_assessment"], "high");
    assert_eq!(report["asset_allocation"]["growth"].as_f64(), Some(1000.0));
    assert_eq!(report["recommendations"].as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn json_storage_persists_across_routers() {
    let dir = tempfile::tempdir().unwrap();

    let app = router_with(Arc::new(JsonFileStorage::new(dir.path())));
    create(&app, None, json!({"asset_type": "gold", "symbol": "AU9999", "quantity": 3})).await;

    let app = router_with(Arc::new(JsonFileStorage::new(dir.path())));
    let (_, list) = send(&app, Method::GET, "/api/assets", None, None).await;
    assert_eq!(list[0]["symbol"], "AU9999");
    assert_eq!(list[0]["total_value"].as_f64(), Some(300.0));
}
