// src/routes.rs
use log::info;
use std::convert::Infallible;
use uuid::Uuid;
use warp::filters::body::BodyDeserializeError;
use warp::http::StatusCode;
use warp::reject::Rejection;
use warp::{Filter, Reply};

use crate::handlers::error::ApiError;
use crate::handlers::report::{get_report, get_symbol};
use crate::handlers::snapshot::{get_snapshot, save_snapshot};
use crate::handlers::valuation::post_dcf;
use crate::state::AppState;

const MAX_BODY_BYTES: u64 = 64 * 1024;

async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (code, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not Found".to_string())
    } else if let Some(api_error) = err.find::<ApiError>() {
        (api_error.status(), api_error.message.clone())
    } else if let Some(body_error) = err.find::<BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, body_error.to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed".to_string())
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
    };

    Ok(warp::reply::with_status(
        warp::reply::json(&serde_json::json!({
            "error": message,
        })),
        code,
    ))
}

pub fn routes(state: AppState) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
    info!("Configuring routes...");

    let state_filter = warp::any().map(move || state.clone());

    let report_route = warp::path!("api" / "v1" / "report" / String)
        .and(warp::get())
        .and(state_filter.clone())
        .and_then(get_report);

    let symbol_route = warp::path!("api" / "v1" / "symbols" / String)
        .and(warp::get())
        .and(state_filter.clone())
        .and_then(get_symbol);

    let dcf_route = warp::path!("api" / "v1" / "dcf" / String)
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(state_filter.clone())
        .and_then(post_dcf);

    let save_snapshot_route = warp::path!("api" / "v1" / "snapshot" / String / Uuid)
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(state_filter.clone())
        .and_then(save_snapshot);

    let get_snapshot_route = warp::path!("api" / "v1" / "snapshot" / String / Uuid)
        .and(warp::get())
        .and(state_filter.clone())
        .and_then(get_snapshot);

    info!("All routes configured successfully.");

    report_route
        .or(symbol_route)
        .or(dcf_route)
        .or(save_snapshot_route)
        .or(get_snapshot_route)
        .recover(handle_rejection)
}
