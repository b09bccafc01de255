pub mod categories;
pub mod config;
pub mod export;
pub mod stats;
pub mod timer;

use chrono::NaiveDate;

/// Parse a `YYYY-MM-DD` argument.
pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("invalid date '{s}': {e}"))
}
