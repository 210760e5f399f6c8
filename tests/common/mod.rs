// tests/common/mod.rs
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dcf_dashboard::config::Config;
use dcf_dashboard::error::FetchError;
use dcf_dashboard::services::fetch::Fetch;
use dcf_dashboard::services::fin_report::{Period, Source, Statement, SOURCES};
use dcf_dashboard::services::symbols::{SymbolCatalog, SymbolEntry};

pub const STATEMENTS: &str = "https://statements.test/investing/stock";
pub const QUOTES: &str = "https://quotes.test/quote";

#[derive(Clone)]
pub enum Reply {
    Body(String),
    Timeout,
    Status(u16),
}

/// Serves canned bodies by URL and counts every call.
#[derive(Default)]
pub struct ScriptedFetcher {
    replies: HashMap<String, Reply>,
    calls: AtomicUsize,
}

impl ScriptedFetcher {
    pub fn with(mut self, url: impl Into<String>, reply: Reply) -> Self {
        self.replies.insert(url.into(), reply);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetch for ScriptedFetcher {
    async fn fetch_text(&self, url: &str, timeout: Duration) -> Result<String, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.replies.get(url) {
            Some(Reply::Body(body)) => Ok(body.clone()),
            Some(Reply::Timeout) => Err(FetchError::Timeout(timeout.as_secs(), url.to_string())),
            Some(Reply::Status(status)) => Err(FetchError::Status {
                status: *status,
                url: url.to_string(),
            }),
            None => Err(FetchError::Status {
                status: 404,
                url: url.to_string(),
            }),
        }
    }
}

pub fn config() -> Config {
    Config {
        statement_base_url: STATEMENTS.to_string(),
        quote_base_url: QUOTES.to_string(),
        fetch_timeout_secs: 1,
        ..Config::default()
    }
}

pub fn catalog() -> SymbolCatalog {
    SymbolCatalog::from_entries(vec![
        SymbolEntry {
            symbol: "AAPL".into(),
            exchange: "NASDAQ".into(),
            name: "Apple Inc.".into(),
        },
        SymbolEntry {
            symbol: "JPM".into(),
            exchange: "NYSE".into(),
            name: "JPMorgan Chase & Co.".into(),
        },
    ])
}

pub fn url(statement: Statement, period: Period) -> String {
    Source { statement, period }.url(STATEMENTS, "AAPL")
}

type Rows<'a> = &'a [(&'a str, &'a [&'a str])];

/// A statement page in the upstream markup: header cells, labelled rows and
/// an empty trend-chart cell closing every row.
pub fn statement_html(column_titles: &[&str], rows: Rows) -> String {
    let mut html = String::from(
        r#"<html><body>
        <p class="data bgLast">129.87</p>
        <p class="lastcolumn bgTimestamp longformat">Jan 4, 2021 4:00 p.m. EST</p>
        <table><thead><tr>
        <th class="rowTitle">Fiscal year is October-September. All values USD Millions.</th>"#,
    );
    for title in column_titles {
        html.push_str(&format!(r#"<th scope="col">{}</th>"#, title));
    }
    html.push_str("</tr></thead><tbody>");
    for (label, cells) in rows {
        html.push_str(&format!(r#"<tr><td class="rowTitle">{}</td>"#, label));
        for cell in cells.iter() {
            html.push_str(&format!(r#"<td class="valueCell">{}</td>"#, cell));
        }
        html.push_str(r#"<td class="valueCell"></td></tr>"#);
    }
    html.push_str("</tbody></table></body></html>");
    html
}

const ANNUAL_TITLES: &[&str] = &["2016", "2017", "2018", "2019", "2020", "5-year trend"];
const QUARTER_TITLES: &[&str] = &[
    "30-Sep-2019",
    "31-Dec-2019",
    "31-Mar-2020",
    "30-Jun-2020",
    "30-Sep-2020",
    "5-qtr trend",
];

pub fn annual_income() -> String {
    statement_html(
        ANNUAL_TITLES,
        &[
            ("Sales/Revenue", &["215.64B", "229.23B", "265.60B", "260.17B", "274.52B"]),
            ("Sales Growth", &["-", "6.30%", "15.86%", "(2.04%)", "5.51%"]),
            ("EPS (Diluted)", &["2.08", "2.30", "2.98", "2.97", "3.28"]),
            ("EPS (Diluted) Growth", &["-", "10.58%", "29.57%", "(0.34%)", "10.44%"]),
            ("Pretax Income", &["61.37B", "64.09B", "72.90B", "65.74B", "67.09B"]),
            ("Pretax Income Growth", &["-", "4.43%", "13.75%", "(9.82%)", "2.06%"]),
            ("Consolidated Net Income", &["45.69B", "48.35B", "59.53B", "55.26B", "57.41B"]),
            ("Net Income", &["45.69B", "48.35B", "59.53B", "55.26B", "57.41B"]),
            ("Net Income Growth", &["-", "5.82%", "23.12%", "(7.17%)", "3.89%"]),
            ("Net Income After Extraordinaries", &["45.69B", "48.35B", "59.53B", "55.26B", "57.41B"]),
            ("Net Income Available to Common", &["45.69B", "48.35B", "59.53B", "55.26B", "57.41B"]),
            (" Interest Expense", &["1.46B", "2.32B", "3.24B", "3.58B", "2.87B"]),
            (" Interest Expense Growth", &["-", "58.90%", "39.66%", "10.49%", "(19.83%)"]),
            (" Gross Interest Expense", &["1.46B", "2.32B", "3.24B", "3.58B", "2.87B"]),
            ("Research & Development", &["10.05B", "11.58B", "14.24B", "16.22B", "18.75B"]),
            ("EBITDA", &["73.33B", "76.57B", "87.05B", "81.86B", "81.02B"]),
            ("EBITDA Growth", &["-", "4.42%", "13.69%", "(5.96%)", "(1.03%)"]),
            ("EBITDA Margin", &["34.01%", "33.40%", "32.77%", "31.46%", "29.51%"]),
            ("Diluted Shares Outstanding", &["22.00B", "21.01B", "20.00B", "18.60B", "17.53B"]),
        ],
    )
}

pub fn quarterly_income() -> String {
    statement_html(
        QUARTER_TITLES,
        &[
            ("Sales/Revenue", &["62.90B", "58.31B", "59.69B", "64.70B", "111.44B"]),
            ("Sales Growth", &["-", "1.00%", "1.00%", "1.00%", "1.00%"]),
            ("EPS (Diluted)", &["0.76", "0.64", "0.65", "0.73", "1.68"]),
            ("EPS (Diluted) Growth", &["-", "1.00%", "1.00%", "1.00%", "1.00%"]),
            ("Pretax Income", &["16.00B", "13.14B", "13.14B", "14.90B", "33.58B"]),
            ("Pretax Income Growth", &["-", "1.00%", "1.00%", "1.00%", "1.00%"]),
            ("Consolidated Net Income", &["13.69B", "11.25B", "11.25B", "12.67B", "28.76B"]),
            ("Net Income", &["13.69B", "11.25B", "11.25B", "12.67B", "28.76B"]),
            ("Net Income Growth", &["-", "1.00%", "1.00%", "1.00%", "1.00%"]),
            ("Net Income After Extraordinaries", &["13.69B", "11.25B", "11.25B", "12.67B", "28.76B"]),
            ("Net Income Available to Common", &["13.69B", "11.25B", "11.25B", "12.67B", "28.76B"]),
            (" Interest Expense", &["785.00M", "697.00M", "638.00M", "634.00M", "638.00M"]),
            (" Interest Expense Growth", &["-", "1.00%", "1.00%", "1.00%", "1.00%"]),
            (" Gross Interest Expense", &["785.00M", "697.00M", "638.00M", "634.00M", "638.00M"]),
            ("Research & Development", &["4.11B", "4.76B", "4.76B", "4.98B", "5.16B"]),
            ("EBITDA", &["18.00B", "16.00B", "16.00B", "17.00B", "37.00B"]),
            ("EBITDA Growth", &["-", "1.00%", "1.00%", "1.00%", "1.00%"]),
            ("EBITDA Margin", &["30.00%", "30.00%", "30.00%", "30.00%", "30.00%"]),
            ("Diluted Shares Outstanding", &["17.53B", "17.42B", "17.25B", "17.06B", "16.93B"]),
        ],
    )
}

pub fn annual_balance_sheet() -> String {
    statement_html(
        ANNUAL_TITLES,
        &[
            ("Cash & Short Term Investments", &["67.16B", "74.18B", "66.30B", "100.56B", "90.94B"]),
            ("Cash & Short Term Investments Growth", &["-", "10.45%", "(10.62%)", "51.68%", "(9.57%)"]),
            ("Total Assets", &["321.69B", "375.32B", "365.73B", "338.52B", "323.89B"]),
            ("Total Assets Growth", &["-", "16.67%", "(2.56%)", "(7.44%)", "(4.32%)"]),
            ("Total Assets Turnover", &["0.67", "0.61", "0.73", "0.77", "0.85"]),
            ("Return on Total Assets", &["14.20%", "12.88%", "16.28%", "16.32%", "17.73%"]),
            ("Total Assets per Share", &["14.62", "17.86", "18.29", "18.20", "18.48"]),
            ("Intangible Assets", &["3.21B", "2.30B", "2.15B", "1.50B", "1.20B"]),
            ("Total Current Liabilities", &["79.01B", "100.81B", "116.87B", "105.72B", "105.39B"]),
            ("Long-Term Debt excl. Capitalized Leases", &["75.43B", "97.21B", "93.74B", "91.81B", "98.67B"]),
            ("Total Shareholders' Equity", &["128.25B", "134.05B", "107.15B", "90.49B", "65.34B"]),
            ("Total Shareholders' Equity Growth", &["-", "4.52%", "(20.07%)", "(15.55%)", "(27.79%)"]),
        ],
    )
}

pub fn quarterly_balance_sheet() -> String {
    statement_html(
        QUARTER_TITLES,
        &[
            ("Cash & Short Term Investments", &["100.56B", "107.16B", "95.05B", "93.03B", "76.83B"]),
            ("Cash & Short Term Investments Growth", &["-", "1.00%", "1.00%", "1.00%", "1.00%"]),
            ("Total Assets", &["338.52B", "340.62B", "320.40B", "317.34B", "354.05B"]),
            ("Total Assets Growth", &["-", "0.62%", "(5.94%)", "(0.96%)", "11.57%"]),
            ("Total Assets Turnover", &["0.20", "0.20", "0.20", "0.20", "0.30"]),
            ("Return on Total Assets", &["4.00%", "4.00%", "4.00%", "4.00%", "8.00%"]),
            ("Total Assets per Share", &["19.00", "19.00", "19.00", "19.00", "20.00"]),
            ("Intangible Assets", &["1.50B", "1.40B", "1.30B", "1.25B", "1.20B"]),
            ("Total Current Liabilities", &["105.72B", "102.16B", "96.09B", "95.32B", "132.51B"]),
            ("Long-Term Debt excl. Capitalized Leases", &["91.81B", "93.08B", "89.09B", "94.05B", "99.28B"]),
            ("Total Shareholders' Equity", &["90.49B", "89.53B", "78.43B", "72.28B", "66.22B"]),
            ("Total Shareholders' Equity Growth", &["-", "1.00%", "1.00%", "1.00%", "1.00%"]),
        ],
    )
}

pub fn annual_cash_flow() -> String {
    statement_html(
        ANNUAL_TITLES,
        &[
            (" Net Investing Cash Flow", &["(45.98B)", "(46.45B)", "16.07B", "45.90B", "(4.29B)"]),
            (" Free Cash Flow", &["52.28B", "50.80B", "64.12B", "58.90B", "73.37B"]),
        ],
    )
}

pub fn quarterly_cash_flow() -> String {
    statement_html(
        QUARTER_TITLES,
        &[
            (" Net Investing Cash Flow", &["(1.00B)", "(5.17B)", "(5.17B)", "(5.17B)", "(3.00B)"]),
            (" Free Cash Flow", &["9.00B", "10.00B", "10.00B", "10.00B", "30.00B"]),
        ],
    )
}

pub fn quote_html() -> String {
    r#"<html><body><table>
        <tr><td data-test="BETA_5Y-value">1.28</td></tr>
        <tr><td data-test="EARNINGS_DATE-value">Jan 26, 2021</td></tr>
    </table></body></html>"#
        .to_string()
}

/// Every page of AAPL served.
pub fn aapl_fetcher() -> ScriptedFetcher {
    let pages = [
        annual_income(),
        annual_balance_sheet(),
        annual_cash_flow(),
        quarterly_income(),
        quarterly_balance_sheet(),
        quarterly_cash_flow(),
    ];
    let mut fetcher = ScriptedFetcher::default().with(format!("{}/AAPL", QUOTES), Reply::Body(quote_html()));
    for (source, page) in SOURCES.iter().zip(pages) {
        fetcher = fetcher.with(source.url(STATEMENTS, "AAPL"), Reply::Body(page));
    }
    fetcher
}

pub fn shared(fetcher: ScriptedFetcher) -> Arc<ScriptedFetcher> {
    Arc::new(fetcher)
}
