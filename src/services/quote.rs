// src/services/quote.rs
use chrono::Duration;
use log::{info, warn};
use regex::Regex;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration as StdDuration;

use crate::error::ReportError;
use crate::services::fetch::Fetch;
use crate::services::numeric;
use crate::services::store::{memoize, KeyValueStore, PROFILE_HORIZON_SECS};

pub const NOT_AVAILABLE: &str = "N/A";

/// Slow-moving quote facts shown next to the statements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteProfile {
    pub beta: Option<f64>,
    pub next_earnings_date: String,
}

impl Default for QuoteProfile {
    fn default() -> Self {
        QuoteProfile {
            beta: None,
            next_earnings_date: NOT_AVAILABLE.to_string(),
        }
    }
}

fn cell_text(document: &Html, css: &str) -> Result<Option<String>, ReportError> {
    let sel = Selector::parse(css)
        .map_err(|e| ReportError::Page(format!("bad selector {}: {:?}", css, e)))?;
    Ok(document
        .select(&sel)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|text| !text.is_empty()))
}

/// Beta from the quote summary JSON embedded in pages without the table
/// cell: `{"raw": 1.28, "fmt": "1.28"}`, either field possibly absent.
fn embedded_beta(html: &str) -> Result<Option<f64>, ReportError> {
    let re = Regex::new(r#""beta":(\{[^{}]*\})"#).map_err(|e| ReportError::Page(e.to_string()))?;
    let summary: Option<Value> = re
        .captures(html)
        .and_then(|caps| caps.get(1))
        .and_then(|m| serde_json::from_str(m.as_str()).ok());
    Ok(summary.and_then(|beta| {
        numeric::parse_value(&beta["raw"]).or_else(|| numeric::parse_value(&beta["fmt"]))
    }))
}

pub fn parse_profile(html: &str) -> Result<QuoteProfile, ReportError> {
    let document = Html::parse_document(html);

    let mut beta = cell_text(&document, r#"td[data-test="BETA_5Y-value"]"#)?
        .and_then(|text| text.parse::<f64>().ok());
    if beta.is_none() {
        beta = embedded_beta(html)?;
    }

    let next_earnings_date = cell_text(&document, r#"td[data-test="EARNINGS_DATE-value"]"#)?
        .unwrap_or_else(|| NOT_AVAILABLE.to_string());

    Ok(QuoteProfile {
        beta,
        next_earnings_date,
    })
}

/// Beta and next earnings date for `ticker`, memoized for a week. Never
/// fails: an unreachable quote page yields the "N/A" profile.
pub async fn fetch_quote_profile(
    fetcher: &dyn Fetch,
    store: &dyn KeyValueStore,
    base_url: &str,
    ticker: &str,
    timeout: StdDuration,
) -> QuoteProfile {
    let url = format!("{}/{}", base_url.trim_end_matches('/'), ticker);
    let key = format!("profile-{}", ticker);
    let result = memoize(
        store,
        &key,
        Duration::seconds(PROFILE_HORIZON_SECS),
        || async {
            let body = fetcher.fetch_text(&url, timeout).await?;
            parse_profile(&body)
        },
    )
    .await;

    match result {
        Ok(profile) => {
            info!("Quote profile for {}: {:?}", ticker, profile);
            profile
        }
        Err(e) => {
            warn!("Quote profile unavailable for {}: {}", ticker, e);
            QuoteProfile::default()
        }
    }
}
