// src/services/locator.rs
//! Finds labelled rows in statement pages.
//!
//! A page is reduced to owned rows right after parsing: `scraper::Html` is
//! not `Send` and must not live across an await.
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeMap;

use crate::error::ReportError;

/// A tracked line item of the statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Concept {
    Revenue,
    Eps,
    PretaxIncome,
    NetIncome,
    InterestExpense,
    ResearchAndDevelopment,
    Ebitda,
    SharesOutstanding,
    Equity,
    LongTermDebt,
    TotalAssets,
    IntangibleAssets,
    CurrentLiabilities,
    Cash,
    InvestingCashFlow,
    FreeCashFlow,
}

/// A concept and the label fragments that identify its rows.
#[derive(Debug, Clone, Copy)]
pub struct LineItem {
    pub concept: Concept,
    pub labels: &'static [&'static str],
}

impl LineItem {
    pub fn matches(&self, label: &str) -> bool {
        self.labels.iter().any(|fragment| label.contains(fragment))
    }
}

// Upstream label text is the wire format here; keep these in step with the
// pages. Some fragments carry a leading space on purpose.
pub const INCOME_ITEMS: &[LineItem] = &[
    LineItem {
        concept: Concept::Revenue,
        labels: &["Sales", "Net Interest Inc", "Non-Interest Income"],
    },
    LineItem { concept: Concept::Eps, labels: &["EPS (Diluted)"] },
    LineItem { concept: Concept::PretaxIncome, labels: &["Pretax Income"] },
    LineItem { concept: Concept::NetIncome, labels: &["Net Income"] },
    LineItem { concept: Concept::InterestExpense, labels: &[" Interest Expense"] },
    LineItem {
        concept: Concept::ResearchAndDevelopment,
        labels: &["Research & Development"],
    },
    LineItem { concept: Concept::Ebitda, labels: &["EBITDA"] },
    LineItem {
        concept: Concept::SharesOutstanding,
        labels: &["Diluted Shares Outstanding"],
    },
];

pub const BALANCE_SHEET_ITEMS: &[LineItem] = &[
    LineItem {
        concept: Concept::Equity,
        labels: &["Total Shareholders' Equity"],
    },
    LineItem { concept: Concept::LongTermDebt, labels: &["Debt excl. Capital"] },
    LineItem { concept: Concept::TotalAssets, labels: &["Total Assets"] },
    LineItem { concept: Concept::IntangibleAssets, labels: &["Intangible Assets"] },
    LineItem {
        concept: Concept::CurrentLiabilities,
        labels: &["Total Current Liabilities"],
    },
    LineItem {
        concept: Concept::Cash,
        labels: &["Cash & Short Term Investments", "Cash & Due from"],
    },
];

pub const CASH_FLOW_ITEMS: &[LineItem] = &[
    LineItem {
        concept: Concept::InvestingCashFlow,
        labels: &[" Net Investing Cash Flow"],
    },
    LineItem { concept: Concept::FreeCashFlow, labels: &[" Free Cash Flow"] },
];

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LabeledRow {
    pub label: String,
    pub cells: Vec<String>,
}

/// Header cells the quote metadata is read from.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PageHeader {
    pub last_price: Option<String>,
    pub last_price_time: Option<String>,
    pub fiscal_year_note: Option<String>,
    pub column_titles: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatementPage {
    pub rows: Vec<LabeledRow>,
    pub header: PageHeader,
}

/// Rows located per concept, in document order.
pub type LocatedRows = BTreeMap<Concept, Vec<Vec<String>>>;

fn selector(css: &'static str) -> Result<Selector, ReportError> {
    Selector::parse(css).map_err(|e| ReportError::Page(format!("bad selector {}: {:?}", css, e)))
}

fn has_class(element: &ElementRef, class: &str) -> bool {
    element
        .value()
        .attr("class")
        .map(|classes| classes.split_whitespace().any(|c| c == class))
        .unwrap_or(false)
}

fn text_of(element: &ElementRef) -> String {
    element.text().collect::<String>()
}

fn first_text(document: &Html, css: &'static str) -> Result<Option<String>, ReportError> {
    let sel = selector(css)?;
    Ok(document
        .select(&sel)
        .next()
        .map(|el| text_of(&el).trim().to_string()))
}

/// Parses a statement page into labelled rows and header cells.
pub fn parse_page(html: &str) -> Result<StatementPage, ReportError> {
    let document = Html::parse_document(html);
    let title_sel = selector("td.rowTitle")?;

    let rows = document
        .select(&title_sel)
        .map(|title| {
            let cells = title
                .next_siblings()
                .filter_map(ElementRef::wrap)
                .filter(|el| has_class(el, "valueCell"))
                .map(|el| text_of(&el).trim().to_string())
                .filter(|text| !text.is_empty())
                .collect();
            LabeledRow {
                label: text_of(&title),
                cells,
            }
        })
        .collect();

    let fiscal_year_note = first_text(&document, "th.rowTitle")?
        .map(|note| note.split('.').next().unwrap_or_default().trim().to_string());
    let col_sel = selector(r#"th[scope="col"]"#)?;
    let column_titles = document
        .select(&col_sel)
        .map(|el| text_of(&el).trim().to_string())
        .collect();

    Ok(StatementPage {
        rows,
        header: PageHeader {
            last_price: first_text(&document, "p.data.bgLast")?,
            last_price_time: first_text(&document, "p.lastcolumn.bgTimestamp.longformat")?,
            fiscal_year_note,
            column_titles,
        },
    })
}

/// Value lists of every row `item` matches. Rows with no non-empty cells
/// are dropped.
pub fn locate(page: &StatementPage, item: &LineItem) -> Vec<Vec<String>> {
    page.rows
        .iter()
        .filter(|row| item.matches(&row.label))
        .filter(|row| !row.cells.is_empty())
        .map(|row| row.cells.clone())
        .collect()
}

/// Runs `locate` for every item of a catalog. A row may feed several concepts.
pub fn locate_items(page: &StatementPage, items: &[LineItem]) -> LocatedRows {
    items
        .iter()
        .map(|item| (item.concept, locate(page, item)))
        .collect()
}
