// src/services/symbols.rs
use chrono::Duration;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::time::Duration as StdDuration;

use crate::error::{FetchError, ReportError, StoreError};
use crate::services::fetch::Fetch;
use crate::services::store::{memoize, KeyValueStore, SYMBOL_HORIZON_SECS};

const CATALOG_KEY: &str = "symbols";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolEntry {
    pub symbol: String,
    pub exchange: String,
    pub name: String,
}

/// Known tickers, keyed by upper-case symbol.
#[derive(Debug, Clone, Default)]
pub struct SymbolCatalog {
    entries: HashMap<String, SymbolEntry>,
}

impl SymbolCatalog {
    pub fn from_entries(entries: Vec<SymbolEntry>) -> Self {
        let entries = entries
            .into_iter()
            .map(|entry| (entry.symbol.to_uppercase(), entry))
            .collect();
        SymbolCatalog { entries }
    }

    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ReportError> {
        Ok(Self::from_entries(read_entries(path.as_ref()).await?))
    }

    /// Reads the catalog from `url` when given, else from `path`, memoized for
    /// the symbol horizon.
    pub async fn load(
        path: &Path,
        url: Option<&str>,
        fetcher: &dyn Fetch,
        store: &dyn KeyValueStore,
        timeout: StdDuration,
    ) -> Result<Self, ReportError> {
        let entries = memoize(
            store,
            CATALOG_KEY,
            Duration::seconds(SYMBOL_HORIZON_SECS),
            || async move {
                match url {
                    Some(url) => {
                        let value = fetcher.fetch_json(url, timeout).await?;
                        serde_json::from_value::<Vec<SymbolEntry>>(value).map_err(|e| {
                            ReportError::Fetch(FetchError::Malformed {
                                url: url.to_string(),
                                reason: e.to_string(),
                            })
                        })
                    }
                    None => read_entries(path).await,
                }
            },
        )
        .await?;
        info!("Loaded {} symbols", entries.len());
        Ok(Self::from_entries(entries))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Alphabetic and listed; case-insensitive.
    pub fn is_known_ticker(&self, symbol: &str) -> bool {
        !symbol.is_empty()
            && symbol.chars().all(|c| c.is_ascii_alphabetic())
            && self.entries.contains_key(&symbol.to_uppercase())
    }

    /// "AAPL(NASDAQ):Apple Inc."
    pub fn describe(&self, symbol: &str) -> Option<String> {
        self.entries
            .get(&symbol.to_uppercase())
            .map(|e| format!("{}({}):{}", e.symbol, e.exchange, e.name))
    }

    pub fn exchanges(&self) -> Vec<String> {
        self.entries
            .values()
            .map(|e| e.exchange.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Normalizes `symbol` to upper case, or explains why it is rejected.
    pub fn validate(&self, symbol: &str) -> Result<String, ReportError> {
        let trimmed = symbol.trim();
        if self.is_known_ticker(trimmed) {
            return Ok(trimmed.to_uppercase());
        }
        warn!("Rejected ticker {:?}", symbol);
        Err(ReportError::InvalidTicker {
            ticker: symbol.to_string(),
            exchanges: self.exchanges().join(", "),
        })
    }
}

async fn read_entries(path: &Path) -> Result<Vec<SymbolEntry>, ReportError> {
    let bytes = tokio::fs::read(path).await.map_err(StoreError::from)?;
    Ok(serde_json::from_slice(&bytes).map_err(StoreError::from)?)
}
