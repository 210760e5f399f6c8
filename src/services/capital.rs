// src/services/capital.rs
//! Weighted average cost of capital from the year-0 capital structure.
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::ValuationError;
use crate::models::{CapitalStructureInputs, Percent};
use crate::services::dcf::CurrentYear;

const DEFAULT_BETA: f64 = 1.0;

/// Market values, weights and component costs behind a WACC figure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostOfCapital {
    pub equity_market_value: f64,
    pub preferred_market_value: f64,
    pub debt_market_value: f64,
    pub cost_of_equity: f64,
    pub cost_of_preferred: f64,
    pub after_tax_cost_of_debt: f64,
    pub cost_of_capital: Percent,
}

/// Book debt and its interest priced as a bond of the average maturity.
pub fn debt_market_value(interest_expense: f64, book_value: f64, rate: f64, maturity: f64) -> f64 {
    if rate == 0.0 {
        return interest_expense * maturity + book_value;
    }
    let discount = (1.0 + rate).powf(maturity);
    interest_expense * (1.0 - 1.0 / discount) / rate + book_value / discount
}

pub fn cost_of_capital(
    current: &CurrentYear,
    inputs: &CapitalStructureInputs,
    last_price: f64,
    riskfree_rate: Percent,
    tax_rate: Percent,
) -> Result<CostOfCapital, ValuationError> {
    let shares = current
        .shares_outstanding
        .ok_or(ValuationError::MissingInput {
            field: "shares_outstanding",
        })?
        .to_dollars()
        .0;
    let debt_book_value = current
        .debt_book_value
        .ok_or(ValuationError::MissingInput {
            field: "debt_book_value",
        })?
        .to_dollars()
        .0;
    let interest_expense = current.interest_expense.map_or(0.0, |m| m.to_dollars().0);
    let pretax_cost_of_debt = inputs.pretax_cost_of_debt.fraction();

    let convertible_debt = inputs.convertible_debt_portion.to_dollars().0;
    let convertible_equity = inputs.convertible_market_value.to_dollars().0 - convertible_debt;
    let equity_market_value = shares * last_price + convertible_equity;
    let preferred_market_value =
        inputs.preferred_shares.to_dollars().0 * inputs.preferred_price_per_share;
    let debt = debt_market_value(
        interest_expense,
        debt_book_value,
        pretax_cost_of_debt,
        inputs.average_maturity_years,
    ) + convertible_debt
        + inputs.operating_lease_debt.to_dollars().0;

    let total = equity_market_value + preferred_market_value + debt;
    if !(total > 0.0) {
        return Err(ValuationError::computation("total capital must be positive"));
    }
    if inputs.preferred_price_per_share <= 0.0 {
        return Err(ValuationError::InvalidInput {
            field: "preferred_price_per_share",
            reason: "must be positive".to_string(),
        });
    }

    let beta = inputs.beta.unwrap_or(DEFAULT_BETA);
    let cost_of_equity =
        riskfree_rate.fraction() + beta * inputs.equity_risk_premium.fraction();
    let cost_of_preferred = inputs.preferred_dividend_per_share / inputs.preferred_price_per_share;
    let after_tax_cost_of_debt = pretax_cost_of_debt * (1.0 - tax_rate.fraction());

    let wacc = (equity_market_value * cost_of_equity
        + preferred_market_value * cost_of_preferred
        + debt * after_tax_cost_of_debt)
        / total;
    debug!(
        "WACC {:.4} from equity {:.0}, preferred {:.0}, debt {:.0}",
        wacc, equity_market_value, preferred_market_value, debt
    );

    Ok(CostOfCapital {
        equity_market_value,
        preferred_market_value,
        debt_market_value: debt,
        cost_of_equity,
        cost_of_preferred,
        after_tax_cost_of_debt,
        cost_of_capital: Percent::from_fraction(wacc),
    })
}
