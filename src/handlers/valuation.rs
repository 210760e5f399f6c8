// src/handlers/valuation.rs
use log::{error, info};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use warp::reply::Json;
use warp::Rejection;

use crate::handlers::error::ApiError;
use crate::models::{ProjectionTable, SnapshotBundle, ValuationParameters};
use crate::services::snapshot::{AnalysisMode, SnapshotSession};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DcfRequest {
    pub mode: AnalysisMode,
    /// Id from a shared link; a fresh one is derived when absent.
    pub snapshot_id: Option<Uuid>,
    pub parameters: ValuationParameters,
    /// Replace the cost of capital with one worked out from the capital structure.
    pub derive_cost_of_capital: bool,
}

#[derive(Debug, Serialize)]
pub struct DcfResponse {
    pub link: String,
    pub from_snapshot: bool,
    pub headers: [&'static str; 11],
    pub table: Vec<Vec<String>>,
    pub price_to_value_percent: Option<f64>,
    pub bundle: SnapshotBundle,
}

fn session_for(ticker: &str, request: &DcfRequest) -> SnapshotSession {
    match request.snapshot_id {
        Some(id) => SnapshotSession::restore(ticker, request.mode, id),
        None => {
            let mut session = SnapshotSession::for_ticker(ticker);
            session.select_mode(request.mode);
            session
        }
    }
}

pub async fn post_dcf(ticker: String, request: DcfRequest, state: AppState) -> Result<Json, Rejection> {
    let policy = &state.policy;
    let ticker = policy
        .ingestor()
        .catalog()
        .validate(&ticker)
        .map_err(|e| warp::reject::custom(ApiError::from(e)))?;
    let session = session_for(&ticker, &request);
    info!("DCF requested for {} ({:?})", ticker, session.mode);

    let mut parameters = request.parameters.clone();
    if request.derive_cost_of_capital {
        let report = policy
            .ingestor()
            .fetch_statement_record_cached(&ticker)
            .await
            .map_err(|e| warp::reject::custom(ApiError::from(e)))?;
        parameters.cost_of_capital = policy
            .resolve_cost_of_capital(&session, &report, &parameters)
            .await
            .map_err(|e| warp::reject::custom(ApiError::from(e)))?;
        info!("Cost of capital for {}: {:.2}%", ticker, parameters.cost_of_capital.0);
    }

    match policy.evaluate(&session, &parameters).await {
        Ok(evaluation) => {
            let bundle = evaluation.bundle;
            let response = DcfResponse {
                link: session.link(),
                from_snapshot: evaluation.from_snapshot,
                headers: ProjectionTable::HEADERS,
                table: bundle.projection.formatted(),
                price_to_value_percent: bundle.summary.price_to_value_percent(),
                bundle,
            };
            Ok(warp::reply::json(&response))
        }
        Err(e) => {
            error!("Valuation failed for {}: {}", ticker, e);
            Err(warp::reject::custom(ApiError::from(e)))
        }
    }
}
