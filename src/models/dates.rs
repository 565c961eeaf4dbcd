//! Invoice dates travel as strings. Two input formats are accepted, ISO is
//! used on the wire and `dd/mm/yyyy` in the database.

use chrono::NaiveDate;

use super::ModelError;

pub const ISO_FORMAT: &str = "%Y-%m-%d";
pub const STORED_FORMAT: &str = "%d/%m/%Y";

/// Parse a date, trying ISO first and `dd/mm/yyyy` second.
pub fn parse_date(value: &str) -> Result<NaiveDate, ModelError> {
    let trimmed = value.trim();
    NaiveDate::parse_from_str(trimmed, ISO_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(trimmed, STORED_FORMAT))
        .map_err(|_| ModelError::InvalidDate(value.to_string()))
}

pub fn to_iso(date: NaiveDate) -> String {
    date.format(ISO_FORMAT).to_string()
}

pub fn to_stored(date: NaiveDate) -> String {
    date.format(STORED_FORMAT).to_string()
}

/// Canonical wire form of a stored date; blank dates map to `None`.
pub fn iso_or_none(value: Option<&str>) -> Result<Option<String>, ModelError> {
    match value {
        Some(v) if !v.trim().is_empty() => parse_date(v).map(|d| Some(to_iso(d))),
        _ => Ok(None),
    }
}

/// Database form of an incoming date; blank dates map to `None`.
pub fn stored_or_none(value: Option<&str>) -> Result<Option<String>, ModelError> {
    match value {
        Some(v) if !v.trim().is_empty() => parse_date(v).map(|d| Some(to_stored(d))),
        _ => Ok(None),
    }
}
