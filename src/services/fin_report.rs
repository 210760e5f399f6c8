// src/services/fin_report.rs
use chrono::{Datelike, Duration};
use futures::future::join_all;
use log::{error, info, warn};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use crate::config::Config;
use crate::error::ReportError;
use crate::models::{QuoteMetadata, StatementReport};
use crate::services::fetch::Fetch;
use crate::services::locator::{self, StatementPage};
use crate::services::market_today;
use crate::services::quote::{self, QuoteProfile};
use crate::services::reconciler::{self, StatementPages};
use crate::services::store::{memoize, KeyValueStore, STATEMENT_HORIZON_SECS};
use crate::services::symbols::SymbolCatalog;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Statement {
    Income,
    BalanceSheet,
    CashFlow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Annual,
    Quarterly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Source {
    pub statement: Statement,
    pub period: Period,
}

pub const SOURCES: [Source; 6] = [
    Source { statement: Statement::Income, period: Period::Annual },
    Source { statement: Statement::BalanceSheet, period: Period::Annual },
    Source { statement: Statement::CashFlow, period: Period::Annual },
    Source { statement: Statement::Income, period: Period::Quarterly },
    Source { statement: Statement::BalanceSheet, period: Period::Quarterly },
    Source { statement: Statement::CashFlow, period: Period::Quarterly },
];

impl Source {
    /// Page URL for `ticker` under the statements site.
    pub fn url(&self, base_url: &str, ticker: &str) -> String {
        let path = match (self.statement, self.period) {
            (Statement::Income, Period::Annual) => "financials",
            (Statement::BalanceSheet, Period::Annual) => "financials/balance-sheet",
            (Statement::CashFlow, Period::Annual) => "financials/cash-flow",
            (Statement::Income, Period::Quarterly) => "financials/income/quarter",
            (Statement::BalanceSheet, Period::Quarterly) => "financials/balance-sheet/quarter",
            (Statement::CashFlow, Period::Quarterly) => "financials/cash-flow/quarter",
        };
        format!("{}/{}/{}", base_url.trim_end_matches('/'), ticker, path)
    }

    fn slot<'a>(&self, pages: &'a mut StatementPages) -> &'a mut Option<StatementPage> {
        match (self.statement, self.period) {
            (Statement::Income, Period::Annual) => &mut pages.annual_income,
            (Statement::BalanceSheet, Period::Annual) => &mut pages.annual_balance_sheet,
            (Statement::CashFlow, Period::Annual) => &mut pages.annual_cash_flow,
            (Statement::Income, Period::Quarterly) => &mut pages.quarterly_income,
            (Statement::BalanceSheet, Period::Quarterly) => &mut pages.quarterly_balance_sheet,
            (Statement::CashFlow, Period::Quarterly) => &mut pages.quarterly_cash_flow,
        }
    }
}

/// Fetches, parses and reconciles the statement pages of one ticker.
pub struct StatementIngestor {
    fetcher: Arc<dyn Fetch>,
    catalog: Arc<SymbolCatalog>,
    store: Arc<dyn KeyValueStore>,
    statement_base_url: String,
    quote_base_url: String,
    timeout: StdDuration,
}

impl StatementIngestor {
    pub fn new(
        fetcher: Arc<dyn Fetch>,
        catalog: Arc<SymbolCatalog>,
        store: Arc<dyn KeyValueStore>,
        config: &Config,
    ) -> Self {
        StatementIngestor {
            fetcher,
            catalog,
            store,
            statement_base_url: config.statement_base_url.clone(),
            quote_base_url: config.quote_base_url.clone(),
            timeout: StdDuration::from_secs(config.fetch_timeout_secs),
        }
    }

    pub fn catalog(&self) -> &SymbolCatalog {
        &self.catalog
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    /// Same as `fetch_statement_record`, served from the store while younger
    /// than the statement horizon.
    pub async fn fetch_statement_record_cached(
        &self,
        ticker: &str,
    ) -> Result<StatementReport, ReportError> {
        let ticker = self.catalog.validate(ticker)?;
        let key = format!("report-{}", ticker);
        memoize(
            self.store.as_ref(),
            &key,
            Duration::seconds(STATEMENT_HORIZON_SECS),
            || self.fetch_statement_record(&ticker),
        )
        .await
    }

    /// Validates the ticker, then fetches the six statement pages and the
    /// quote profile concurrently. A failed page leaves its concepts missing;
    /// missing header cells fail the whole call.
    pub async fn fetch_statement_record(&self, ticker: &str) -> Result<StatementReport, ReportError> {
        let ticker = self.catalog.validate(ticker)?;
        info!("Ingesting statements for {}", ticker);

        let page_fetches = join_all(SOURCES.iter().map(|source| self.fetch_page(&ticker, *source)));
        let profile_fetch = quote::fetch_quote_profile(
            self.fetcher.as_ref(),
            self.store.as_ref(),
            &self.quote_base_url,
            &ticker,
            self.timeout,
        );
        let (fetched, profile) = tokio::join!(page_fetches, profile_fetch);

        let mut pages = StatementPages::default();
        for (source, page) in SOURCES.iter().zip(fetched) {
            *source.slot(&mut pages) = page;
        }

        let record = reconciler::reconcile(&pages, market_today().year());
        let quote = quote_metadata(&ticker, &pages, profile)?;
        info!(
            "Ingested {} years for {} at {}",
            record.years.len(),
            ticker,
            quote.last_price
        );

        Ok(StatementReport {
            ticker,
            record,
            quote,
        })
    }

    async fn fetch_page(&self, ticker: &str, source: Source) -> Option<StatementPage> {
        let url = source.url(&self.statement_base_url, ticker);
        let body = match self.fetcher.fetch_text(&url, self.timeout).await {
            Ok(body) => body,
            Err(e) => {
                error!("Failed to fetch {:?} {:?} page for {}: {}", source.period, source.statement, ticker, e);
                return None;
            }
        };
        match locator::parse_page(&body) {
            Ok(page) => Some(page),
            Err(e) => {
                warn!("Unreadable page {}: {}", url, e);
                None
            }
        }
    }
}

/// Headline cells come from the annual income page, the most recent quarter
/// label from the quarterly one (its last column is the trend chart).
fn quote_metadata(
    ticker: &str,
    pages: &StatementPages,
    profile: QuoteProfile,
) -> Result<QuoteMetadata, ReportError> {
    let no_data = || ReportError::NoData(ticker.to_string());
    let header = &pages.annual_income.as_ref().ok_or_else(no_data)?.header;
    let last_price = header.last_price.clone().ok_or_else(no_data)?;
    let last_price_time = header.last_price_time.clone().ok_or_else(no_data)?;
    let fiscal_year_note = header.fiscal_year_note.clone().ok_or_else(no_data)?;

    let titles = &pages
        .quarterly_income
        .as_ref()
        .ok_or_else(no_data)?
        .header
        .column_titles;
    let mrq_date = titles
        .len()
        .checked_sub(2)
        .and_then(|i| titles.get(i))
        .cloned()
        .ok_or_else(no_data)?;

    Ok(QuoteMetadata {
        report_date_note: format!("{}, {}", mrq_date, fiscal_year_note),
        last_price,
        last_price_time,
        mrq_date,
        fiscal_year_note,
        beta: profile.beta,
        next_earnings_date: profile.next_earnings_date,
    })
}
