//! Services Layer
//!
//! Pure business logic without the HTTP layer. Handlers translate requests
//! into service calls and map `CirculationError` onto status codes.

pub mod circulation;
pub mod profiles;
pub mod reservations;

use chrono::{Local, NaiveDate};

use crate::domain::CirculationError;

/// Dates are persisted as `%Y-%m-%d` strings; timestamps as RFC3339.
pub(crate) const DATE_FMT: &str = "%Y-%m-%d";

pub(crate) fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub(crate) fn now_ts() -> String {
    chrono::Utc::now().to_rfc3339()
}

pub(crate) fn parse_date(s: &str, field: &str) -> Result<NaiveDate, CirculationError> {
    NaiveDate::parse_from_str(s, DATE_FMT)
        .map_err(|_| CirculationError::Validation(format!("{} must be YYYY-MM-DD, got '{}'", field, s)))
}

pub(crate) fn fmt_date(d: NaiveDate) -> String {
    d.format(DATE_FMT).to_string()
}

/// Two-decimal currency rounding for fines.
pub(crate) fn round_money(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}
