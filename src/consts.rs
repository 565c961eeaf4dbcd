/// Currencies offered by the invoice form; the first one is the default
pub const CURRENCIES: &[&str] = &["EUR", "PLN", "USD", "GBP", "CHF", "CZK", "SEK", "NOK", "DKK"];

pub const VAT_PERCENT_OPTIONS: &[i32] = &[0, 4, 5, 7, 8, 9, 21, 23];

/// Units of a product line. The empty unit is allowed.
pub const UNIT_OPTIONS: &[&str] = &["piece", "hour", "day", "kg", "m2", "m3", "m", "km", ""];

/// Days between the issue date and the due date of a new invoice
pub const DEFAULT_PAYMENT_DAYS: i64 = 14;
