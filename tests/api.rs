// tests/api.rs
mod common;

use serde_json::{json, Value};
use std::sync::Arc;
use warp::http::StatusCode;

use common::{aapl_fetcher, catalog, config};
use dcf_dashboard::routes::routes;
use dcf_dashboard::services::snapshot::DEFAULT_SNAPSHOT_ID;
use dcf_dashboard::services::store::{KeyValueStore, MemoryStore};
use dcf_dashboard::state::AppState;

fn state() -> AppState {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    AppState::new(config(), Arc::new(aapl_fetcher()), store, catalog())
}

fn body(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes).unwrap()
}

#[tokio::test]
async fn report_carries_record_quote_and_suggestions() {
    let api = routes(state());
    let res = warp::test::request()
        .method("GET")
        .path("/api/v1/report/aapl")
        .reply(&api)
        .await;

    assert_eq!(res.status(), StatusCode::OK);
    let json = body(res.body());
    assert_eq!(json["ticker"], "AAPL");
    assert_eq!(json["record"].as_array().unwrap().len(), 6);
    assert_eq!(json["quote"]["mrq_date"], "30-Sep-2020");
    assert!(json["current_year"].is_object());
    assert!(json["suggested"].is_object());
}

#[tokio::test]
async fn invalid_ticker_is_a_bad_request() {
    let api = routes(state());
    let res = warp::test::request()
        .method("GET")
        .path("/api/v1/report/INVALID")
        .reply(&api)
        .await;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let message = body(res.body())["error"].as_str().unwrap().to_string();
    assert!(message.contains("INVALID"), "{}", message);
    assert!(message.contains("NASDAQ, NYSE"), "{}", message);
}

#[tokio::test]
async fn symbol_lookup() {
    let api = routes(state());
    let res = warp::test::request()
        .method("GET")
        .path("/api/v1/symbols/jpm")
        .reply(&api)
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        body(res.body())["description"],
        "JPM(NYSE):JPMorgan Chase & Co."
    );

    let res = warp::test::request()
        .method("GET")
        .path("/api/v1/symbols/ZZZZ")
        .reply(&api)
        .await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn dcf_returns_the_formatted_table() {
    let api = routes(state());
    let res = warp::test::request()
        .method("POST")
        .path("/api/v1/dcf/AAPL")
        .json(&json!({ "parameters": { "cost_of_capital": 9.0 } }))
        .reply(&api)
        .await;

    assert_eq!(res.status(), StatusCode::OK);
    let json = body(res.body());
    assert_eq!(json["from_snapshot"], false);
    assert_eq!(json["headers"].as_array().unwrap().len(), 11);
    // base year, ten projected years and the terminal year
    assert_eq!(json["table"].as_array().unwrap().len(), 12);
    assert!(json["link"].as_str().unwrap().starts_with("/apps/dcf/AAPL/"));
}

#[tokio::test]
async fn dcf_rejects_cost_of_capital_below_terminal_growth() {
    let api = routes(state());
    let res = warp::test::request()
        .method("POST")
        .path("/api/v1/dcf/AAPL")
        .json(&json!({
            "parameters": {
                "cost_of_capital": 3.0,
                "terminal_growth_eq_riskfree": false,
                "terminal_growth_rate": 3.0
            }
        }))
        .reply(&api)
        .await;

    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body(res.body())["error"].is_string());
}

#[tokio::test]
async fn malformed_body_is_a_bad_request() {
    let api = routes(state());
    let res = warp::test::request()
        .method("POST")
        .path("/api/v1/dcf/AAPL")
        .header("content-type", "application/json")
        .body("{not json")
        .reply(&api)
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn saved_snapshot_is_served_verbatim() {
    let api = routes(state());
    let path = format!("/api/v1/snapshot/AAPL/{}", DEFAULT_SNAPSHOT_ID);

    let missing = warp::test::request()
        .method("GET")
        .path(&path)
        .reply(&api)
        .await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    let saved = warp::test::request()
        .method("POST")
        .path(&path)
        .json(&json!({ "cost_of_capital": 9.0 }))
        .reply(&api)
        .await;
    assert_eq!(saved.status(), StatusCode::OK);
    assert_eq!(
        body(saved.body())["link"],
        format!("/apps/dcf/AAPL/{}", DEFAULT_SNAPSHOT_ID)
    );

    let first = warp::test::request().method("GET").path(&path).reply(&api).await;
    let second = warp::test::request().method("GET").path(&path).reply(&api).await;
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(first.body(), second.body());
    assert_eq!(body(first.body())["ticker"], "AAPL");

    let again = warp::test::request()
        .method("POST")
        .path(&path)
        .json(&json!({ "cost_of_capital": 12.0 }))
        .reply(&api)
        .await;
    assert_eq!(again.status(), StatusCode::CONFLICT);
    let third = warp::test::request().method("GET").path(&path).reply(&api).await;
    assert_eq!(third.body(), first.body());
}
