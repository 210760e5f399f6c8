// src/services/reconciler.rs
//! Builds the six-year statement table from the located rows of the annual
//! and quarterly pages.
//!
//! Per concept, the annual rows come first and the folded quarterly rows
//! (one trailing-twelve-month cell each) follow, all in document order.
//! `EXTRACTIONS` then picks, per column, which annual row gives the history
//! and which trailing row gives the current year. Label matching returns
//! parent rows together with their growth/margin children, hence the
//! concept-specific offsets.
use log::warn;

use crate::models::{Column, NormalizedStatementRecord, StatementYear};
use crate::services::locator::{
    self, Concept, LineItem, LocatedRows, StatementPage, BALANCE_SHEET_ITEMS, CASH_FLOW_ITEMS,
    INCOME_ITEMS,
};
use crate::services::numeric::{self, MISSING};

pub const ANNUAL_YEARS: usize = 5;
pub const RECORD_YEARS: usize = ANNUAL_YEARS + 1;
const TTM_QUARTERS: usize = 4;
/// Bank-style income statements split the top line into this many rows.
const FINANCIAL_REVENUE_ROWS: usize = 10;

/// The six source pages; `None` where the fetch failed.
#[derive(Debug, Clone, Default)]
pub struct StatementPages {
    pub annual_income: Option<StatementPage>,
    pub annual_balance_sheet: Option<StatementPage>,
    pub annual_cash_flow: Option<StatementPage>,
    pub quarterly_income: Option<StatementPage>,
    pub quarterly_balance_sheet: Option<StatementPage>,
    pub quarterly_cash_flow: Option<StatementPage>,
}

/// Which combined row holds the trailing value.
#[derive(Debug, Clone, Copy)]
enum Ttm {
    At(usize),
    /// The first offset if that row is a single trailing cell, else the second.
    FirstSingle(usize, usize),
}

struct Extraction {
    column: Column,
    concept: Concept,
    annual: usize,
    ttm: Ttm,
}

const fn pick(column: Column, concept: Concept, annual: usize, ttm: Ttm) -> Extraction {
    Extraction {
        column,
        concept,
        annual,
        ttm,
    }
}

// Revenue and total assets have structural fallbacks and are handled apart.
const EXTRACTIONS: &[Extraction] = &[
    pick(Column::Eps, Concept::Eps, 0, Ttm::At(2)),
    pick(Column::EpsGrowth, Concept::Eps, 1, Ttm::At(3)),
    pick(Column::PretaxIncome, Concept::PretaxIncome, 0, Ttm::At(2)),
    pick(Column::NetIncome, Concept::NetIncome, 1, Ttm::At(6)),
    pick(Column::InterestExpense, Concept::InterestExpense, 0, Ttm::FirstSingle(3, 4)),
    pick(Column::ResearchAndDevelopment, Concept::ResearchAndDevelopment, 0, Ttm::At(1)),
    pick(Column::Ebitda, Concept::Ebitda, 0, Ttm::At(3)),
    pick(Column::SharesOutstanding, Concept::SharesOutstanding, 0, Ttm::At(1)),
    pick(Column::ShareholderEquity, Concept::Equity, 0, Ttm::At(2)),
    pick(Column::LongTermDebt, Concept::LongTermDebt, 0, Ttm::At(1)),
    pick(Column::IntangibleAssets, Concept::IntangibleAssets, 0, Ttm::At(1)),
    pick(Column::CurrentLiabilities, Concept::CurrentLiabilities, 0, Ttm::At(1)),
    pick(Column::Cash, Concept::Cash, 0, Ttm::At(2)),
    pick(Column::NetInvestingCashFlow, Concept::InvestingCashFlow, 0, Ttm::At(1)),
    pick(Column::FreeCashFlow, Concept::FreeCashFlow, 0, Ttm::At(1)),
];

fn last_quarters(cells: &[String]) -> Option<Vec<f64>> {
    if cells.len() < TTM_QUARTERS {
        return None;
    }
    cells[cells.len() - TTM_QUARTERS..]
        .iter()
        .map(|cell| numeric::parse(cell))
        .collect()
}

/// Sum of the last four quarters, or "-" if any of them is missing.
pub fn trailing_sum(cells: &[String]) -> String {
    match last_quarters(cells) {
        Some(quarters) => numeric::format(quarters.iter().sum()),
        None => MISSING.to_string(),
    }
}

/// Like `trailing_sum` but per-share: two decimals, no unit scaling.
pub fn trailing_per_share(cells: &[String]) -> String {
    match last_quarters(cells) {
        Some(quarters) => format!("{:.2}", quarters.iter().sum::<f64>()),
        None => MISSING.to_string(),
    }
}

/// Point-in-time figures take the latest quarter instead of a sum.
pub fn latest_quarter(cells: &[String]) -> String {
    numeric::format_or_missing(cells.last().and_then(|cell| numeric::parse(cell)))
}

fn fold_income(concept: Concept, cells: &[String]) -> String {
    match concept {
        Concept::Eps => trailing_per_share(cells),
        Concept::SharesOutstanding => latest_quarter(cells),
        _ => trailing_sum(cells),
    }
}

fn fold_balance_sheet(_: Concept, cells: &[String]) -> String {
    // most recent quarter, verbatim
    cells.last().cloned().unwrap_or_else(|| MISSING.to_string())
}

fn fold_cash_flow(_: Concept, cells: &[String]) -> String {
    trailing_sum(cells)
}

/// Annual rows followed by folded quarterly rows, per concept. A missing
/// annual page is stood in for by empty rows so trailing offsets still line
/// up with the quarterly page, which carries the same labels.
fn gather(
    annual: Option<&StatementPage>,
    quarterly: Option<&StatementPage>,
    items: &[LineItem],
    fold: fn(Concept, &[String]) -> String,
) -> LocatedRows {
    let annual = annual.map(|page| locator::locate_items(page, items));
    let quarterly = quarterly.map(|page| locator::locate_items(page, items));
    let rows_in = |located: &Option<LocatedRows>, concept: Concept| {
        located
            .as_ref()
            .and_then(|rows| rows.get(&concept))
            .cloned()
            .unwrap_or_default()
    };

    items
        .iter()
        .map(|item| {
            let trailing: Vec<Vec<String>> = rows_in(&quarterly, item.concept)
                .iter()
                .map(|cells| vec![fold(item.concept, cells)])
                .collect();
            let mut rows = match annual {
                Some(_) => rows_in(&annual, item.concept),
                None => vec![Vec::new(); trailing.len()],
            };
            rows.extend(trailing);
            (item.concept, rows)
        })
        .collect()
}

fn annual_slots(row: Option<&Vec<String>>) -> Vec<String> {
    let cells = row.map(Vec::as_slice).unwrap_or(&[]);
    let recent = &cells[cells.len().saturating_sub(ANNUAL_YEARS)..];
    let mut slots = vec![MISSING.to_string(); ANNUAL_YEARS - recent.len()];
    slots.extend(recent.iter().cloned());
    slots
}

fn ttm_slot(rows: &[Vec<String>], ttm: Ttm) -> String {
    let index = match ttm {
        Ttm::At(index) => index,
        Ttm::FirstSingle(first, second) => {
            if rows.get(first).map_or(false, |row| row.len() == 1) {
                first
            } else {
                second
            }
        }
    };
    rows.get(index)
        .and_then(|row| row.last())
        .cloned()
        .unwrap_or_else(|| MISSING.to_string())
}

fn series(rows: &[Vec<String>], annual: usize, ttm: Ttm) -> Vec<String> {
    let mut slots = annual_slots(rows.get(annual));
    slots.push(ttm_slot(rows, ttm));
    slots
}

/// Revenue and revenue growth. Financial filers show net interest income and
/// non-interest income instead of sales; their sum is the top line.
fn revenue_series(rows: &[Vec<String>]) -> (Vec<String>, Vec<String>) {
    if rows.len() != FINANCIAL_REVENUE_ROWS {
        return (series(rows, 0, Ttm::At(2)), series(rows, 1, Ttm::At(3)));
    }
    let after_provision = series(rows, 2, Ttm::At(7));
    let non_interest = series(rows, 4, Ttm::At(9));
    let revenue = after_provision
        .iter()
        .zip(&non_interest)
        .map(|(a, b)| match (numeric::parse(a), numeric::parse(b)) {
            (Some(a), Some(b)) => numeric::format(a + b),
            _ => MISSING.to_string(),
        })
        .collect();
    (revenue, series(rows, 3, Ttm::At(8)))
}

fn total_assets_series(rows: &[Vec<String>]) -> Vec<String> {
    let primary_dashed = rows
        .get(1)
        .and_then(|row| row.first())
        .map_or(true, |cell| cell.starts_with('-'));
    let chosen = if primary_dashed {
        series(rows, 0, Ttm::At(5))
    } else {
        series(rows, 1, Ttm::At(6))
    };
    // a total below 10 means the offsets landed on a ratio row
    if numeric::parse(&chosen[0]).map_or(false, |v| v < 10.0) {
        return series(rows, 0, Ttm::At(4));
    }
    chosen
}

fn ratio(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    match (numerator, denominator) {
        (Some(n), Some(d)) if d != 0.0 => Some(n / d),
        _ => None,
    }
}

fn derive_ratios(year: &mut StatementYear) {
    let revenue = year.value(Column::Revenue);
    let net_income = year.value(Column::NetIncome);
    let capital_employed = match (
        year.value(Column::TotalAssets),
        year.value(Column::CurrentLiabilities),
    ) {
        (Some(assets), Some(liabilities)) => Some(assets - liabilities),
        _ => None,
    };

    year.set(
        Column::NetProfitMargin,
        numeric::format_or_missing(ratio(net_income, revenue)),
    );
    year.set(
        Column::SalesToCapital,
        numeric::format_or_missing(ratio(revenue, capital_employed)),
    );
    year.set(
        Column::Roce,
        numeric::format_or_missing(ratio(net_income, capital_employed)),
    );
    year.set(Column::CapitalEmployed, numeric::format_or_missing(capital_employed));
}

/// Reconciles the six pages into one row per year, `current_year - 5` through
/// `current_year` (the trailing-twelve-month row).
pub fn reconcile(pages: &StatementPages, current_year: i32) -> NormalizedStatementRecord {
    let mut located = gather(
        pages.annual_income.as_ref(),
        pages.quarterly_income.as_ref(),
        INCOME_ITEMS,
        fold_income,
    );
    located.extend(gather(
        pages.annual_balance_sheet.as_ref(),
        pages.quarterly_balance_sheet.as_ref(),
        BALANCE_SHEET_ITEMS,
        fold_balance_sheet,
    ));
    located.extend(gather(
        pages.annual_cash_flow.as_ref(),
        pages.quarterly_cash_flow.as_ref(),
        CASH_FLOW_ITEMS,
        fold_cash_flow,
    ));

    for (concept, rows) in &located {
        if rows.is_empty() {
            warn!("No rows located for {:?}; its series stays missing", concept);
        }
    }
    let rows_of = |concept: Concept| located.get(&concept).map(Vec::as_slice).unwrap_or(&[]);

    let mut columns: Vec<(Column, Vec<String>)> = Vec::with_capacity(Column::ALL.len());
    let (revenue, revenue_growth) = revenue_series(rows_of(Concept::Revenue));
    columns.push((Column::Revenue, revenue));
    columns.push((Column::RevenueGrowth, revenue_growth));
    columns.push((
        Column::TotalAssets,
        total_assets_series(rows_of(Concept::TotalAssets)),
    ));

    for extraction in EXTRACTIONS {
        let rows = rows_of(extraction.concept);
        let mut values = series(rows, extraction.annual, extraction.ttm);
        if extraction.column == Column::CurrentLiabilities
            && !rows.is_empty()
            && values.iter().all(|cell| cell == MISSING)
        {
            // financial filers report no current liabilities
            values = vec!["0".to_string(); RECORD_YEARS];
        }
        columns.push((extraction.column, values));
    }

    let first_year = current_year - ANNUAL_YEARS as i32;
    let years = (0..RECORD_YEARS)
        .map(|slot| {
            let mut year = StatementYear::new(first_year + slot as i32);
            for (column, values) in &columns {
                year.set(*column, values[slot].clone());
            }
            derive_ratios(&mut year);
            year
        })
        .collect();

    NormalizedStatementRecord { years }
}
