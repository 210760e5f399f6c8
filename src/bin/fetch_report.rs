// src/bin/fetch_report.rs
//! Ingests one ticker and prints the statements, the quote metadata and a
//! valuation at suggested defaults. Usage: `fetch_report [TICKER]`.
use dotenv::dotenv;
use log::{error, info};

use dcf_dashboard::config::Config;
use dcf_dashboard::models::{Column, ProjectionTable, ValuationParameters};
use dcf_dashboard::services::dcf::{self, suggest_parameters};
use dcf_dashboard::services::snapshot::DEFAULT_TICKER;
use dcf_dashboard::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let ticker = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_TICKER.to_string());
    info!("Fetching statement report for {}...", ticker);

    let state = AppState::build(Config::from_env()).await?;
    let report = match state.ingestor().fetch_statement_record(&ticker).await {
        Ok(report) => report,
        Err(e) => {
            error!("ERROR: Failed to ingest {}: {}", ticker, e);
            return Err(e.into());
        }
    };

    println!("{} ({})", report.ticker, report.quote.report_date_note);
    println!(
        "Last price {} at {}; beta {:?}; next earnings {}",
        report.quote.last_price,
        report.quote.last_price_time,
        report.quote.beta,
        report.quote.next_earnings_date
    );
    for year in &report.record.years {
        let cells = Column::ALL
            .iter()
            .map(|c| {
                let header = serde_json::to_string(c)?;
                Ok(format!("{}={}", header.trim_matches('"'), year.cell(*c)))
            })
            .collect::<Result<Vec<String>, serde_json::Error>>()?;
        println!("{}: {}", year.year, cells.join(", "));
    }

    let mut parameters = ValuationParameters::default();
    suggest_parameters(&report.record).apply_to(&mut parameters);
    let last_price = report.quote.last_price_value().unwrap_or(0.0);
    match dcf::project(&report.record, &parameters, last_price) {
        Ok((table, summary)) => {
            println!("{}", ProjectionTable::HEADERS.join(" | "));
            for row in table.formatted() {
                println!("{}", row.join(" | "));
            }
            println!(
                "Estimated value per share {:.2} vs last price {:.2} ({:.1}% of value)",
                summary.estimated_value_per_share,
                summary.last_price,
                summary.price_to_value_percent().unwrap_or(f64::NAN)
            );
        }
        Err(e) => error!("ERROR: Valuation failed: {}", e),
    }

    Ok(())
}
