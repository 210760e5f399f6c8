// src/services/mod.rs
pub mod capital;
pub mod dcf;
pub mod fetch;
pub mod fin_report;
pub mod locator;
pub mod numeric;
pub mod quote;
pub mod reconciler;
pub mod snapshot;
pub mod store;
pub mod symbols;

use chrono::{NaiveDate, Utc};
use chrono_tz::US::Eastern;

/// Today's date on the exchange calendar.
pub fn market_today() -> NaiveDate {
    Utc::now().with_timezone(&Eastern).date_naive()
}
