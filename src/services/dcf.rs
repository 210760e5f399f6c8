// src/services/dcf.rs
//! Ten-year discounted cash flow projection with a Gordon-growth terminal
//! value.
//!
//! Inputs arrive in form units (millions, percentages) and are converted to
//! base currency and fractions once, in `Anchors` and `Paths`. Everything
//! after that is plain arithmetic over `f64`.
use chrono::{Datelike, NaiveDate};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::ValuationError;
use crate::models::{
    Column, CurrentYearOverrides, Dollars, Millions, NormalizedStatementRecord, Percent,
    ProjectionRow, ProjectionTable, ValuationOutputSummary, ValuationParameters,
};
use crate::services::market_today;

pub const TERMINAL_YEAR_LENGTH: usize = 10;
/// Years of flat "CAGR 2-5" growth end here; the fade to terminal growth follows.
const HIGH_GROWTH_END: usize = 5;
/// Capitalized R&D shrinks by this share of the year-0 ratio per projected year.
const RD_DECAY_PER_YEAR: f64 = 0.02;
const MAX_SUGGESTED_CAGR: f64 = 15.0;
const MAX_SUGGESTED_MARGIN: f64 = 50.0;
const MIN_SUGGESTED_SALES_TO_CAPITAL: f64 = 0.05;

/// Year-0 figures read off the record's last row, in form units. Any of them
/// may be absent when the statements lacked the cell.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrentYear {
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

fn millions(value: Option<Dollars>) -> Option<Millions> {
    value.map(Dollars::to_millions)
}

/// Compound growth from the first year to the last full fiscal year, in
/// percent rounded to two decimals.
fn historical_cagr(revenue: &[Option<f64>]) -> Option<Percent> {
    let periods = revenue.len().checked_sub(2).filter(|n| *n > 0)?;
    let first = revenue[0].filter(|v| *v > 0.0)?;
    let last = revenue[revenue.len() - 2]?;
    let rate = (last / first).powf(1.0 / periods as f64) - 1.0;
    rate.is_finite()
        .then(|| Percent((100.0 * rate * 100.0).round() / 100.0))
}

impl CurrentYear {
    pub fn from_record(record: &NormalizedStatementRecord) -> Self {
        let year0 = match record.latest() {
            Some(year) => year,
            None => return CurrentYear::default(),
        };
        // no R&D line means no R&D spend
        let rd = year0
            .dollars(Column::ResearchAndDevelopment)
            .unwrap_or_default();
        let ebit = year0
            .dollars(Column::PretaxIncome)
            .map(|pretax| Dollars(pretax.0 + rd.0));
        let capex = year0
            .dollars(Column::NetInvestingCashFlow)
            .map(|investing| Dollars(-investing.0.round()));

        CurrentYear {
            revenue: millions(year0.dollars(Column::Revenue)),
            research_and_development: Some(rd.to_millions()),
            capex: millions(capex),
            ebit: millions(ebit),
            historical_cagr: historical_cagr(&record.column(Column::Revenue)),
            cash: millions(year0.dollars(Column::Cash)),
            debt_book_value: millions(year0.dollars(Column::LongTermDebt)),
            shares_outstanding: year0
                .share_count(Column::SharesOutstanding)
                .map(|count| Millions(count / 1e6)),
            interest_expense: millions(year0.dollars(Column::InterestExpense)),
        }
    }

    /// Values typed on the form win over what the record says.
    pub fn overridden_by(&self, overrides: &CurrentYearOverrides) -> Self {
        CurrentYear {
            revenue: overrides.revenue.or(self.revenue),
            research_and_development: overrides
                .research_and_development
                .or(self.research_and_development),
            capex: overrides.capex.or(self.capex),
            ebit: overrides.ebit.or(self.ebit),
            historical_cagr: overrides.historical_cagr.or(self.historical_cagr),
            cash: overrides.cash.or(self.cash),
            debt_book_value: overrides.debt_book_value.or(self.debt_book_value),
            shares_outstanding: overrides.shares_outstanding.or(self.shares_outstanding),
            interest_expense: overrides.interest_expense.or(self.interest_expense),
        }
    }

    pub fn require(&self) -> Result<Anchors, ValuationError> {
        fn field<T>(value: Option<T>, name: &'static str) -> Result<T, ValuationError> {
            value.ok_or(ValuationError::MissingInput { field: name })
        }
        Ok(Anchors {
            revenue: field(self.revenue, "revenue")?.to_dollars(),
            research_and_development: field(
                self.research_and_development,
                "research_and_development",
            )?
            .to_dollars(),
            ebit: field(self.ebit, "ebit")?.to_dollars(),
            historical_growth: field(self.historical_cagr, "historical_cagr")?,
            cash: field(self.cash, "cash")?.to_dollars(),
            debt_book_value: field(self.debt_book_value, "debt_book_value")?.to_dollars(),
            shares_outstanding: field(self.shares_outstanding, "shares_outstanding")?
                .to_dollars()
                .0,
        })
    }
}

/// The year-0 inputs the projection needs, all present, in base units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchors {
    pub revenue: Dollars,
    pub research_and_development: Dollars,
    /// EBIT with R&D added back.
    pub ebit: Dollars,
    pub historical_growth: Percent,
    pub cash: Dollars,
    pub debt_book_value: Dollars,
    pub shares_outstanding: f64,
}

/// Defaults proposed from the record's history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SuggestedParameters {
    pub cagr_2_5: Option<Percent>,
    pub target_operating_margin: Option<Percent>,
    pub sales_to_capital: Option<f64>,
}

impl SuggestedParameters {
    pub fn apply_to(&self, parameters: &mut ValuationParameters) {
        if let Some(cagr) = self.cagr_2_5 {
            parameters.cagr_2_5 = cagr;
        }
        if let Some(margin) = self.target_operating_margin {
            parameters.target_operating_margin = margin;
        }
        if let Some(ratio) = self.sales_to_capital {
            parameters.sales_to_capital = ratio;
        }
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

pub fn suggest_parameters(record: &NormalizedStatementRecord) -> SuggestedParameters {
    let current = CurrentYear::from_record(record);

    let margins: Vec<f64> = record
        .years
        .iter()
        .filter_map(|y| {
            let revenue = y.value(Column::Revenue).filter(|r| *r != 0.0)?;
            let pretax = y.value(Column::PretaxIncome)?;
            let rd = y.value(Column::ResearchAndDevelopment).unwrap_or(0.0);
            Some((pretax + rd) / revenue)
        })
        .collect();
    let sales_to_capital: Vec<f64> = record
        .years
        .iter()
        .filter_map(|y| y.value(Column::SalesToCapital))
        .collect();

    SuggestedParameters {
        cagr_2_5: current
            .historical_cagr
            .map(|cagr| Percent(cagr.0.min(MAX_SUGGESTED_CAGR))),
        target_operating_margin: mean(&margins)
            .map(|m| Percent((100.0 * m).min(MAX_SUGGESTED_MARGIN))),
        sales_to_capital: mean(&sales_to_capital)
            .map(|ratio| ratio.max(MIN_SUGGESTED_SALES_TO_CAPITAL)),
    }
}

/// Calendar year of projection row 0: the previous year until March.
pub fn base_year(today: NaiveDate) -> i32 {
    if today.month() > 2 {
        today.year()
    } else {
        today.year() - 1
    }
}

/// Growth, margin and tax rate per row, as fractions; index 0 is year 0.
#[derive(Debug, Clone, PartialEq)]
struct Paths {
    growth: Vec<f64>,
    margin: Vec<f64>,
    tax: Vec<f64>,
}

impl Paths {
    fn build(parameters: &ValuationParameters, year0_growth: f64, year0_margin: f64) -> Self {
        let t = TERMINAL_YEAR_LENGTH;
        let cagr = parameters.cagr_2_5.fraction();
        let terminal_growth = parameters.effective_terminal_growth().fraction();
        let fade = (cagr - terminal_growth) / (t - HIGH_GROWTH_END) as f64;

        let mut growth = vec![year0_growth, parameters.revenue_growth_next.fraction()];
        growth.extend(std::iter::repeat(cagr).take(HIGH_GROWTH_END - 1));
        growth.extend((1..=t - HIGH_GROWTH_END).map(|p| cagr - fade * p as f64));
        growth.push(terminal_growth);

        let target = parameters.target_operating_margin.fraction();
        let convergence = parameters.convergence_year as f64;
        let mut margin = vec![year0_margin, parameters.operating_margin_next.fraction()];
        margin.extend((2..=t + 1).map(|p| {
            let p = p as f64;
            if p > convergence {
                target
            } else {
                target - ((target - year0_margin) / convergence) * (convergence - p)
            }
        }));

        let effective = parameters.tax_rate.fraction();
        let marginal = parameters.marginal_tax_rate.fraction();
        let fade_years = (t - HIGH_GROWTH_END) as f64;
        let mut tax = vec![effective; HIGH_GROWTH_END + 1];
        tax.extend(
            (1..=t - HIGH_GROWTH_END).map(|p| effective + (marginal - effective) * p as f64 / fade_years),
        );
        tax.push(marginal);

        Paths { growth, margin, tax }
    }
}

/// Projects the record forward under `parameters`. Year-0 anchors come from
/// the record's last row unless overridden on the form.
pub fn project(
    record: &NormalizedStatementRecord,
    parameters: &ValuationParameters,
    last_price: f64,
) -> Result<(ProjectionTable, ValuationOutputSummary), ValuationError> {
    let anchors = CurrentYear::from_record(record)
        .overridden_by(&parameters.overrides)
        .require()?;
    project_from(&anchors, parameters, last_price, base_year(market_today()))
}

pub fn project_from(
    anchors: &Anchors,
    parameters: &ValuationParameters,
    last_price: f64,
    base_year: i32,
) -> Result<(ProjectionTable, ValuationOutputSummary), ValuationError> {
    let t = TERMINAL_YEAR_LENGTH;
    let cost_of_capital = parameters.cost_of_capital.fraction();
    let terminal_growth = parameters.effective_terminal_growth().fraction();
    let sales_to_capital = parameters.sales_to_capital;
    let tax = parameters.tax_rate.fraction();

    if cost_of_capital <= terminal_growth {
        return Err(ValuationError::computation(format!(
            "cost of capital ({}%) must exceed the terminal growth rate ({}%)",
            parameters.cost_of_capital.0,
            parameters.effective_terminal_growth().0
        )));
    }
    let revenue0 = anchors.revenue.0;
    if revenue0 <= 0.0 {
        return Err(ValuationError::computation("year-0 revenue must be positive"));
    }
    if sales_to_capital <= 0.0 {
        return Err(ValuationError::InvalidInput {
            field: "sales_to_capital",
            reason: "must be positive".to_string(),
        });
    }
    if anchors.shares_outstanding <= 0.0 {
        return Err(ValuationError::computation("outstanding shares must be positive"));
    }

    let rd0 = anchors.research_and_development.0;
    let ebit0 = anchors.ebit.0;
    let growth0 = anchors.historical_growth.fraction();
    let margin0 = ebit0 / revenue0;
    let rd_ratio = rd0 / revenue0;
    let paths = Paths::build(parameters, growth0, margin0);

    let ebit_after_tax0 = (ebit0 - rd0) * (1.0 - tax) + rd0;
    let reinvestment0 = revenue0 * growth0 / sales_to_capital + rd0;
    let fcf0 = ebit_after_tax0 - reinvestment0;
    let mut rows = vec![ProjectionRow {
        year: base_year,
        revenue: revenue0,
        revenue_growth: growth0,
        ebit_plus_rd: ebit0,
        operating_margin: margin0,
        tax_rate: paths.tax[0],
        ebit_after_tax: ebit_after_tax0,
        reinvestment: reinvestment0,
        fcf: fcf0,
        discount_factor: 1.0,
        pv_fcf: fcf0,
    }];

    for p in 1..=t + 1 {
        let prev = &rows[p - 1];
        let growth = paths.growth[p];
        let revenue = prev.revenue * (1.0 + growth);
        let ebit_plus_rd = revenue * paths.margin[p];
        let ebit_after_tax = ebit_plus_rd * (1.0 - paths.tax[p]);
        let capitalized_rd = rd_ratio * revenue * (1.0 - RD_DECAY_PER_YEAR * p as f64);
        let reinvestment = if growth > 0.0 {
            (revenue - prev.revenue) / sales_to_capital + capitalized_rd
        } else {
            capitalized_rd
        };
        let fcf = ebit_after_tax - reinvestment;
        let discount_factor = prev.discount_factor / (1.0 + cost_of_capital);
        rows.push(ProjectionRow {
            year: base_year + p as i32,
            revenue,
            revenue_growth: growth,
            ebit_plus_rd,
            operating_margin: paths.margin[p],
            tax_rate: paths.tax[p],
            ebit_after_tax,
            reinvestment,
            fcf,
            discount_factor,
            pv_fcf: fcf * discount_factor,
        });
    }

    let terminal_fcf = rows[t + 1].fcf;
    let terminal_value = terminal_fcf / (cost_of_capital - terminal_growth);
    let pv_terminal_value = terminal_value * rows[t].discount_factor;
    let pv_sum = rows[1..=t].iter().map(|r| r.pv_fcf).sum::<f64>() + pv_terminal_value;
    let failure = parameters.probability_of_failure.fraction();
    // a failed firm is assumed to liquidate at half value
    let value_operating_assets = (1.0 - failure) * pv_sum + failure * (pv_sum / 2.0);
    let equity_value = value_operating_assets - anchors.debt_book_value.0
        - parameters.minority_interests.to_dollars().0
        + anchors.cash.0
        + parameters.nonoperating_assets.to_dollars().0;
    let common_equity_value = equity_value - parameters.options_value.to_dollars().0;
    let estimated_value_per_share = common_equity_value / anchors.shares_outstanding;

    let summary = ValuationOutputSummary {
        terminal_fcf,
        terminal_value,
        pv_terminal_value,
        pv_sum,
        value_operating_assets,
        book_value_debt: anchors.debt_book_value.0,
        cash: anchors.cash.0,
        equity_value,
        common_equity_value,
        outstanding_shares: anchors.shares_outstanding,
        estimated_value_per_share,
        last_price,
    };

    let all_finite = rows.iter().all(|r| {
        [r.revenue, r.ebit_plus_rd, r.ebit_after_tax, r.reinvestment, r.fcf, r.pv_fcf]
            .iter()
            .all(|v| v.is_finite())
    }) && [terminal_value, pv_sum, estimated_value_per_share]
        .iter()
        .all(|v| v.is_finite());
    if !all_finite {
        warn!("Projection produced non-finite values for {:?}", parameters);
        return Err(ValuationError::computation("projection produced non-finite values"));
    }

    debug!(
        "Projected value per share {:.2} (terminal value {:.0})",
        estimated_value_per_share, terminal_value
    );
    Ok((ProjectionTable { rows }, summary))
}
