// src/services/snapshot.rs
use chrono::Utc;
use log::info;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{ReportError, SnapshotError, StoreError};
use crate::models::{Percent, SnapshotBundle, StatementReport, ValuationParameters};
use crate::services::capital;
use crate::services::dcf::{self, CurrentYear};
use crate::services::fin_report::StatementIngestor;
use crate::services::store::KeyValueStore;

pub const DEFAULT_TICKER: &str = "AAPL";
pub const DEFAULT_SNAPSHOT_ID: Uuid = Uuid::from_u128(0x95df36ac_bc52_52e1_bdf6_bac53b7aa4ca);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    /// Recompute on every request.
    #[default]
    Live,
    /// Serve the persisted bundle when there is one.
    Snapshot,
}

/// Next snapshot id: UUID v5 of the upper-cased ticker in the current id's namespace.
pub fn derive_snapshot_id(current: &Uuid, ticker: &str) -> Uuid {
    Uuid::new_v5(current, ticker.to_uppercase().as_bytes())
}

pub fn snapshot_key(ticker: &str, snapshot_id: &Uuid) -> String {
    format!("snapshot-{}-{}", ticker.to_uppercase(), snapshot_id)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotSession {
    pub mode: AnalysisMode,
    pub ticker: String,
    pub snapshot_id: Uuid,
}

impl Default for SnapshotSession {
    fn default() -> Self {
        SnapshotSession {
            mode: AnalysisMode::Live,
            ticker: DEFAULT_TICKER.to_string(),
            snapshot_id: DEFAULT_SNAPSHOT_ID,
        }
    }
}

impl SnapshotSession {
    /// A session for `ticker` as a fresh visitor would reach it.
    pub fn for_ticker(ticker: &str) -> Self {
        let mut session = SnapshotSession::default();
        session.select_ticker(ticker);
        session
    }

    /// Resumes a session from a shared link; no id is derived.
    pub fn restore(ticker: &str, mode: AnalysisMode, snapshot_id: Uuid) -> Self {
        SnapshotSession {
            mode,
            ticker: ticker.to_uppercase(),
            snapshot_id,
        }
    }

    pub fn select_ticker(&mut self, ticker: &str) {
        let ticker = ticker.to_uppercase();
        if ticker != self.ticker {
            self.ticker = ticker;
            self.refresh_id();
        }
    }

    pub fn select_mode(&mut self, mode: AnalysisMode) {
        if mode != self.mode {
            self.mode = mode;
            self.refresh_id();
        }
    }

    fn refresh_id(&mut self) {
        if self.mode == AnalysisMode::Live {
            self.snapshot_id = derive_snapshot_id(&self.snapshot_id, &self.ticker);
        }
    }

    pub fn key(&self) -> String {
        snapshot_key(&self.ticker, &self.snapshot_id)
    }

    pub fn link(&self) -> String {
        format!("/apps/dcf/{}/{}", self.ticker, self.snapshot_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub bundle: SnapshotBundle,
    pub from_snapshot: bool,
}

/// Decides per request whether to recompute or to serve a saved bundle.
pub struct SnapshotPolicy {
    ingestor: Arc<StatementIngestor>,
    store: Arc<dyn KeyValueStore>,
}

impl SnapshotPolicy {
    pub fn new(ingestor: Arc<StatementIngestor>, store: Arc<dyn KeyValueStore>) -> Self {
        SnapshotPolicy { ingestor, store }
    }

    pub fn ingestor(&self) -> &StatementIngestor {
        &self.ingestor
    }

    /// Snapshot mode serves the saved bundle and falls back to a live
    /// computation when there is none; live mode always recomputes.
    pub async fn evaluate(
        &self,
        session: &SnapshotSession,
        parameters: &ValuationParameters,
    ) -> Result<Evaluation, SnapshotError> {
        if session.mode == AnalysisMode::Snapshot {
            if let Some(bundle) = self.read_bundle(&session.ticker, &session.snapshot_id).await? {
                info!("Serving snapshot {}", session.link());
                return Ok(Evaluation {
                    bundle,
                    from_snapshot: true,
                });
            }
            info!("No snapshot at {}, computing live", session.link());
        }
        let bundle = self.compute(session, parameters).await?;
        Ok(Evaluation {
            bundle,
            from_snapshot: false,
        })
    }

    /// Recomputes and persists the bundle under the session key. Live mode
    /// only, and once per key: a saved snapshot is never replaced.
    pub async fn save(
        &self,
        session: &SnapshotSession,
        parameters: &ValuationParameters,
    ) -> Result<SnapshotBundle, SnapshotError> {
        if session.mode != AnalysisMode::Live {
            return Err(SnapshotError::NotLive);
        }
        if self.store.exists(&session.key()).await? {
            return Err(SnapshotError::AlreadySaved(session.link()));
        }
        let bundle = self.compute(session, parameters).await?;
        let bytes = serde_json::to_vec(&bundle).map_err(StoreError::from)?;
        self.store.set(&session.key(), bytes).await?;
        info!("Saved snapshot {}", session.link());
        Ok(bundle)
    }

    pub async fn read_bundle_bytes(
        &self,
        ticker: &str,
        snapshot_id: &Uuid,
    ) -> Result<Option<Vec<u8>>, SnapshotError> {
        Ok(self.store.get(&snapshot_key(ticker, snapshot_id)).await?)
    }

    pub async fn read_bundle(
        &self,
        ticker: &str,
        snapshot_id: &Uuid,
    ) -> Result<Option<SnapshotBundle>, SnapshotError> {
        match self.read_bundle_bytes(ticker, snapshot_id).await? {
            Some(bytes) => Ok(Some(
                serde_json::from_slice(&bytes).map_err(StoreError::from)?,
            )),
            None => Ok(None),
        }
    }

    /// A saved cost of capital wins in snapshot mode; otherwise it is worked
    /// out from the capital structure at the last price.
    pub async fn resolve_cost_of_capital(
        &self,
        session: &SnapshotSession,
        report: &StatementReport,
        parameters: &ValuationParameters,
    ) -> Result<Percent, SnapshotError> {
        if session.mode == AnalysisMode::Snapshot {
            if let Some(bundle) = self.read_bundle(&session.ticker, &session.snapshot_id).await? {
                return Ok(bundle.parameters.cost_of_capital);
            }
        }
        let current = CurrentYear::from_record(&report.record).overridden_by(&parameters.overrides);
        let mut inputs = parameters.capital_structure.clone();
        if inputs.beta.is_none() {
            inputs.beta = report.quote.beta;
        }
        let breakdown = capital::cost_of_capital(
            &current,
            &inputs,
            last_price(report)?,
            parameters.riskfree_rate,
            parameters.tax_rate,
        )?;
        Ok(breakdown.cost_of_capital)
    }

    async fn compute(
        &self,
        session: &SnapshotSession,
        parameters: &ValuationParameters,
    ) -> Result<SnapshotBundle, SnapshotError> {
        let report = self
            .ingestor
            .fetch_statement_record_cached(&session.ticker)
            .await?;
        let (projection, summary) = dcf::project(&report.record, parameters, last_price(&report)?)?;
        Ok(SnapshotBundle {
            ticker: report.ticker,
            snapshot_id: session.snapshot_id,
            saved_at: Utc::now(),
            record: report.record,
            quote: report.quote,
            parameters: parameters.clone(),
            projection,
            summary,
        })
    }
}

fn last_price(report: &StatementReport) -> Result<f64, ReportError> {
    report
        .quote
        .last_price_value()
        .ok_or_else(|| ReportError::NoData(report.ticker.clone()))
}
