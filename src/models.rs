// src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::services::numeric;

/// An amount in base currency units (dollars, not millions).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dollars(pub f64);

/// An amount in millions, the unit the valuation form is filled in.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Millions(pub f64);

/// A rate entered as a percentage: `Percent(15.0)` is 15%.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Percent(pub f64);

impl Dollars {
    pub fn to_millions(self) -> Millions {
        Millions(self.0 / 1e6)
    }
}

impl Millions {
    pub fn to_dollars(self) -> Dollars {
        Dollars(self.0 * 1e6)
    }
}

impl Percent {
    pub fn fraction(self) -> f64 {
        self.0 / 100.0
    }

    pub fn from_fraction(fraction: f64) -> Self {
        Percent(fraction * 100.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Currency,
    PerShare,
    Shares,
    Percent,
}

/// Columns of the normalized statement table. The serialized names are the
/// headers the dashboard renders, unit suffix included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Column {
    #[serde(rename = "Revenue($)")]
    Revenue,
    #[serde(rename = "Revenue Growth(%)")]
    RevenueGrowth,
    #[serde(rename = "EPS($)")]
    Eps,
    #[serde(rename = "EPS Growth(%)")]
    EpsGrowth,
    #[serde(rename = "Pretax Income($)")]
    PretaxIncome,
    #[serde(rename = "Net Income($)")]
    NetIncome,
    #[serde(rename = "Interest Expense($)")]
    InterestExpense,
    #[serde(rename = "EBITDA($)")]
    Ebitda,
    #[serde(rename = "Research & Development($)")]
    ResearchAndDevelopment,
    #[serde(rename = "Shares Outstanding")]
    SharesOutstanding,
    #[serde(rename = "Longterm Debt($)")]
    LongTermDebt,
    #[serde(rename = "Shareholder Equity($)")]
    ShareholderEquity,
    #[serde(rename = "Total Assets($)")]
    TotalAssets,
    #[serde(rename = "Intangible Assets($)")]
    IntangibleAssets,
    #[serde(rename = "Total Current Liabilities($)")]
    CurrentLiabilities,
    #[serde(rename = "Cash($)")]
    Cash,
    #[serde(rename = "Net Investing Cash Flow($)")]
    NetInvestingCashFlow,
    #[serde(rename = "Free Cash Flow($)")]
    FreeCashFlow,
    #[serde(rename = "Net Profit Margin(%)")]
    NetProfitMargin,
    #[serde(rename = "Capital Employed($)")]
    CapitalEmployed,
    #[serde(rename = "Sales-to-Capital(%)")]
    SalesToCapital,
    #[serde(rename = "ROCE(%)")]
    Roce,
}

impl Column {
    pub const ALL: [Column; 22] = [
        Column::Revenue,
        Column::RevenueGrowth,
        Column::Eps,
        Column::EpsGrowth,
        Column::PretaxIncome,
        Column::NetIncome,
        Column::InterestExpense,
        Column::Ebitda,
        Column::ResearchAndDevelopment,
        Column::SharesOutstanding,
        Column::LongTermDebt,
        Column::ShareholderEquity,
        Column::TotalAssets,
        Column::IntangibleAssets,
        Column::CurrentLiabilities,
        Column::Cash,
        Column::NetInvestingCashFlow,
        Column::FreeCashFlow,
        Column::NetProfitMargin,
        Column::CapitalEmployed,
        Column::SalesToCapital,
        Column::Roce,
    ];

    pub fn unit(self) -> Unit {
        match self {
            Column::RevenueGrowth
            | Column::EpsGrowth
            | Column::NetProfitMargin
            | Column::SalesToCapital
            | Column::Roce => Unit::Percent,
            Column::Eps => Unit::PerShare,
            Column::SharesOutstanding => Unit::Shares,
            _ => Unit::Currency,
        }
    }
}

/// One fiscal year of the normalized statement table. Cells keep the
/// formatted text ("273.43B", "(4.50%)", "-").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementYear {
    #[serde(rename = "index")]
    pub year: i32,
    #[serde(flatten)]
    pub cells: BTreeMap<Column, String>,
}

impl StatementYear {
    pub fn new(year: i32) -> Self {
        StatementYear {
            year,
            cells: BTreeMap::new(),
        }
    }

    pub fn cell(&self, column: Column) -> &str {
        self.cells
            .get(&column)
            .map(String::as_str)
            .unwrap_or(numeric::MISSING)
    }

    pub fn set(&mut self, column: Column, text: impl Into<String>) {
        self.cells.insert(column, text.into());
    }

    pub fn value(&self, column: Column) -> Option<f64> {
        numeric::parse(self.cell(column))
    }

    /// Currency cells in base units; `None` for columns of any other unit.
    pub fn dollars(&self, column: Column) -> Option<Dollars> {
        match column.unit() {
            Unit::Currency | Unit::PerShare => self.value(column).map(Dollars),
            _ => None,
        }
    }

    pub fn share_count(&self, column: Column) -> Option<f64> {
        match column.unit() {
            Unit::Shares => self.value(column),
            _ => None,
        }
    }
}

/// Six contiguous fiscal years, ascending; the last one is TTM/MRQ.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedStatementRecord {
    pub years: Vec<StatementYear>,
}

impl NormalizedStatementRecord {
    pub fn latest(&self) -> Option<&StatementYear> {
        self.years.last()
    }

    pub fn column(&self, column: Column) -> Vec<Option<f64>> {
        self.years.iter().map(|y| y.value(column)).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteMetadata {
    pub last_price: String,
    pub last_price_time: String,
    pub mrq_date: String,
    pub fiscal_year_note: String,
    pub report_date_note: String,
    pub beta: Option<f64>,
    pub next_earnings_date: String,
}

impl QuoteMetadata {
    pub fn last_price_value(&self) -> Option<f64> {
        numeric::parse(&self.last_price)
    }
}

/// What one ingestion call returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementReport {
    pub ticker: String,
    pub record: NormalizedStatementRecord,
    pub quote: QuoteMetadata,
}

/// Year-0 values typed on the form, overriding what the record says.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurrentYearOverrides {
    pub revenue: Option<Millions>,
    pub research_and_development: Option<Millions>,
    pub capex: Option<Millions>,
    pub ebit: Option<Millions>,
    pub historical_cagr: Option<Percent>,
    pub cash: Option<Millions>,
    pub debt_book_value: Option<Millions>,
    pub shares_outstanding: Option<Millions>,
    pub interest_expense: Option<Millions>,
}

/// Capital-structure inputs of the cost-of-capital worksheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapitalStructureInputs {
    pub equity_risk_premium: Percent,
    pub beta: Option<f64>,
    pub average_maturity_years: f64,
    pub pretax_cost_of_debt: Percent,
    pub convertible_debt_portion: Millions,
    pub convertible_market_value: Millions,
    pub operating_lease_debt: Millions,
    pub preferred_shares: Millions,
    pub preferred_price_per_share: f64,
    pub preferred_dividend_per_share: f64,
}

impl Default for CapitalStructureInputs {
    fn default() -> Self {
        CapitalStructureInputs {
            equity_risk_premium: Percent(5.5),
            beta: None,
            average_maturity_years: 3.0,
            pretax_cost_of_debt: Percent(4.0),
            convertible_debt_portion: Millions(0.0),
            convertible_market_value: Millions(0.0),
            operating_lease_debt: Millions(0.0),
            preferred_shares: Millions(0.0),
            preferred_price_per_share: 70.0,
            preferred_dividend_per_share: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValuationParameters {
    pub revenue_growth_next: Percent,
    pub operating_margin_next: Percent,
    pub cagr_2_5: Percent,
    pub target_operating_margin: Percent,
    pub sales_to_capital: f64,
    pub tax_rate: Percent,
    pub riskfree_rate: Percent,
    pub terminal_growth_rate: Percent,
    pub terminal_growth_eq_riskfree: bool,
    pub cost_of_capital: Percent,
    pub convergence_year: u32,
    pub marginal_tax_rate: Percent,
    pub probability_of_failure: Percent,
    pub overrides: CurrentYearOverrides,
    pub capital_structure: CapitalStructureInputs,
    pub minority_interests: Millions,
    pub nonoperating_assets: Millions,
    pub options_value: Millions,
}

impl Default for ValuationParameters {
    fn default() -> Self {
        ValuationParameters {
            revenue_growth_next: Percent(0.0),
            operating_margin_next: Percent(10.0),
            cagr_2_5: Percent(5.0),
            target_operating_margin: Percent(20.0),
            sales_to_capital: 1.2,
            tax_rate: Percent(15.0),
            riskfree_rate: Percent(3.5),
            terminal_growth_rate: Percent(3.5),
            terminal_growth_eq_riskfree: true,
            cost_of_capital: Percent(8.5),
            convergence_year: 3,
            marginal_tax_rate: Percent(29.0),
            probability_of_failure: Percent(0.0),
            overrides: CurrentYearOverrides::default(),
            capital_structure: CapitalStructureInputs::default(),
            minority_interests: Millions(0.0),
            nonoperating_assets: Millions(0.0),
            options_value: Millions(0.0),
        }
    }
}

impl ValuationParameters {
    pub fn effective_terminal_growth(&self) -> Percent {
        if self.terminal_growth_eq_riskfree {
            self.riskfree_rate
        } else {
            self.terminal_growth_rate
        }
    }
}

/// Amounts in base currency; rates as fractions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionRow {
    #[serde(rename = "Year")]
    pub year: i32,
    #[serde(rename = "Revenue($)")]
    pub revenue: f64,
    #[serde(rename = "Revenue Growth(%)")]
    pub revenue_growth: f64,
    #[serde(rename = "EBIT+R&D($)")]
    pub ebit_plus_rd: f64,
    #[serde(rename = "Operating Margin(%)")]
    pub operating_margin: f64,
    #[serde(rename = "Tax Rate(%)")]
    pub tax_rate: f64,
    #[serde(rename = "EBIT(1-T)($)")]
    pub ebit_after_tax: f64,
    #[serde(rename = "Reinvestment($)")]
    pub reinvestment: f64,
    #[serde(rename = "FCF($)")]
    pub fcf: f64,
    #[serde(rename = "CDF(%)")]
    pub discount_factor: f64,
    #[serde(rename = "PV_FCF($)")]
    pub pv_fcf: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectionTable {
    pub rows: Vec<ProjectionRow>,
}

impl ProjectionTable {
    pub const HEADERS: [&'static str; 11] = [
        "Year",
        "Revenue($)",
        "Revenue Growth(%)",
        "EBIT+R&D($)",
        "Operating Margin(%)",
        "Tax Rate(%)",
        "EBIT(1-T)($)",
        "Reinvestment($)",
        "FCF($)",
        "CDF(%)",
        "PV_FCF($)",
    ];

    /// Every numeric cell rendered through the codec, in `HEADERS` order.
    pub fn formatted(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|r| {
                let mut cells = vec![r.year.to_string()];
                cells.extend(
                    [
                        r.revenue,
                        r.revenue_growth,
                        r.ebit_plus_rd,
                        r.operating_margin,
                        r.tax_rate,
                        r.ebit_after_tax,
                        r.reinvestment,
                        r.fcf,
                        r.discount_factor,
                        r.pv_fcf,
                    ]
                    .into_iter()
                    .map(numeric::format),
                );
                cells
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationOutputSummary {
    pub terminal_fcf: f64,
    pub terminal_value: f64,
    pub pv_terminal_value: f64,
    pub pv_sum: f64,
    pub value_operating_assets: f64,
    pub book_value_debt: f64,
    pub cash: f64,
    pub equity_value: f64,
    pub common_equity_value: f64,
    pub outstanding_shares: f64,
    pub estimated_value_per_share: f64,
    pub last_price: f64,
}

impl ValuationOutputSummary {
    pub fn price_to_value_percent(&self) -> Option<f64> {
        if self.estimated_value_per_share == 0.0 {
            return None;
        }
        Some(100.0 * self.last_price / self.estimated_value_per_share)
    }
}

/// Everything a saved snapshot holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotBundle {
    pub ticker: String,
    pub snapshot_id: Uuid,
    pub saved_at: DateTime<Utc>,
    pub record: NormalizedStatementRecord,
    pub quote: QuoteMetadata,
    pub parameters: ValuationParameters,
    pub projection: ProjectionTable,
    pub summary: ValuationOutputSummary,
}
