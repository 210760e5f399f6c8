// src/state.rs
use anyhow::Context;
use log::info;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::services::fetch::{Fetch, HttpFetcher};
use crate::services::fin_report::StatementIngestor;
use crate::services::snapshot::SnapshotPolicy;
use crate::services::store::{FileStore, KeyValueStore};
use crate::services::symbols::SymbolCatalog;

/// Process-lifetime collaborators shared by every request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub policy: Arc<SnapshotPolicy>,
}

impl AppState {
    pub fn new(
        config: Config,
        fetcher: Arc<dyn Fetch>,
        store: Arc<dyn KeyValueStore>,
        catalog: SymbolCatalog,
    ) -> Self {
        let ingestor = StatementIngestor::new(fetcher, Arc::new(catalog), store.clone(), &config);
        AppState {
            config: Arc::new(config),
            policy: Arc::new(SnapshotPolicy::new(Arc::new(ingestor), store)),
        }
    }

    /// Wires the HTTP fetcher, the file store and the symbol catalog.
    pub async fn build(config: Config) -> anyhow::Result<Self> {
        let fetcher: Arc<dyn Fetch> = Arc::new(HttpFetcher::new()?);
        let store: Arc<dyn KeyValueStore> = Arc::new(
            FileStore::open(&config.snapshot_dir)
                .await
                .context("opening snapshot directory")?,
        );
        let catalog = SymbolCatalog::load(
            &config.symbols_path,
            config.symbols_url.as_deref(),
            fetcher.as_ref(),
            store.as_ref(),
            Duration::from_secs(config.fetch_timeout_secs),
        )
        .await
        .context("loading symbol catalog")?;
        info!("Symbol catalog covers {} tickers", catalog.len());
        Ok(AppState::new(config, fetcher, store, catalog))
    }

    pub fn ingestor(&self) -> &StatementIngestor {
        self.policy.ingestor()
    }
}
