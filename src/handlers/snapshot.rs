// src/handlers/snapshot.rs
use log::{error, info};
use uuid::Uuid;
use warp::http::Response;
use warp::reply::Json;
use warp::Rejection;

use crate::handlers::error::{ApiError, ErrorKind};
use crate::models::ValuationParameters;
use crate::services::snapshot::{AnalysisMode, SnapshotSession};
use crate::state::AppState;

pub async fn save_snapshot(
    ticker: String,
    snapshot_id: Uuid,
    parameters: ValuationParameters,
    state: AppState,
) -> Result<Json, Rejection> {
    let session = SnapshotSession::restore(&ticker, AnalysisMode::Live, snapshot_id);
    match state.policy.save(&session, &parameters).await {
        Ok(bundle) => {
            info!("Snapshot saved at {}", session.link());
            Ok(warp::reply::json(&serde_json::json!({
                "link": session.link(),
                "saved_at": bundle.saved_at,
                "summary": bundle.summary,
            })))
        }
        Err(e) => {
            error!("Failed to save snapshot {}: {}", session.link(), e);
            Err(warp::reject::custom(ApiError::from(e)))
        }
    }
}

/// The persisted bundle exactly as stored.
pub async fn get_snapshot(
    ticker: String,
    snapshot_id: Uuid,
    state: AppState,
) -> Result<Response<Vec<u8>>, Rejection> {
    let bytes = state
        .policy
        .read_bundle_bytes(&ticker, &snapshot_id)
        .await
        .map_err(|e| warp::reject::custom(ApiError::from(e)))?
        .ok_or_else(|| {
            warp::reject::custom(ApiError::new(
                ErrorKind::DataUnavailable,
                format!("No snapshot {} for {}", snapshot_id, ticker.to_uppercase()),
            ))
        })?;

    Response::builder()
        .header("content-type", "application/json")
        .body(bytes)
        .map_err(|e| warp::reject::custom(ApiError::new(ErrorKind::Internal, e.to_string())))
}
