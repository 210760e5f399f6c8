// src/handlers/report.rs
use log::{error, info};
use serde::Serialize;
use warp::reply::Json;
use warp::Rejection;

use crate::handlers::error::{ApiError, ErrorKind};
use crate::models::StatementReport;
use crate::services::dcf::{suggest_parameters, CurrentYear, SuggestedParameters};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ReportResponse {
    #[serde(flatten)]
    pub report: StatementReport,
    pub current_year: CurrentYear,
    pub suggested: SuggestedParameters,
}

pub async fn get_report(ticker: String, state: AppState) -> Result<Json, Rejection> {
    info!("Statement report requested for {}", ticker);
    match state.ingestor().fetch_statement_record_cached(&ticker).await {
        Ok(report) => {
            let response = ReportResponse {
                current_year: CurrentYear::from_record(&report.record),
                suggested: suggest_parameters(&report.record),
                report,
            };
            Ok(warp::reply::json(&response))
        }
        Err(e) => {
            error!("Failed to build report for {}: {}", ticker, e);
            Err(warp::reject::custom(ApiError::from(e)))
        }
    }
}

pub async fn get_symbol(ticker: String, state: AppState) -> Result<Json, Rejection> {
    let catalog = state.ingestor().catalog();
    match catalog.describe(&ticker) {
        Some(description) => Ok(warp::reply::json(&serde_json::json!({
            "symbol": ticker.to_uppercase(),
            "description": description,
        }))),
        None => Err(warp::reject::custom(ApiError::new(
            ErrorKind::DataUnavailable,
            format!("Unknown ticker: {}", ticker),
        ))),
    }
}
