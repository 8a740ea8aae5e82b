//! Regex-based invoice extraction over cleaned text.
//!
//! Each field has its own finder so it can be tested in isolation. None of
//! them ever fail; a field that cannot be found is `None`.

use regex::Regex;

use crate::models::invoice::InvoiceRecord;

use super::patterns::{CURRENCY_LABEL, INVOICE_DATE, INVOICE_NUMBER, TOTAL, TOTAL_CURRENCY, VENDOR};

/// Derive an invoice record from labelled lines in `text`.
///
/// `line_items` is always empty; tables are not reconstructed.
pub fn heuristic_extract(text: &str) -> InvoiceRecord {
    InvoiceRecord {
        vendor: find_vendor(text),
        number: find_number(text),
        date: find_date(text),
        total: find_total(text),
        currency: find_currency(text),
        line_items: Vec::new(),
    }
}

/// Rest of the line after `Vendor:`.
pub fn find_vendor(text: &str) -> Option<String> {
    capture(&VENDOR, text)
}

/// Identifier after `Invoice Number:`, `Invoice No:` or `Invoice No.:`.
pub fn find_number(text: &str) -> Option<String> {
    capture(&INVOICE_NUMBER, text)
}

/// `YYYY-MM-DD` date after `Invoice Date:` or `Date:`.
pub fn find_date(text: &str) -> Option<String> {
    capture(&INVOICE_DATE, text)
}

/// Numeric amount after `Total:`.
pub fn find_total(text: &str) -> Option<f64> {
    capture(&TOTAL, text)?.parse::<f64>().ok()
}

/// Three-letter code following the total, else after `Currency:`.
pub fn find_currency(text: &str) -> Option<String> {
    capture(&TOTAL_CURRENCY, text)
        .or_else(|| capture(&CURRENCY_LABEL, text))
        .map(|c| c.to_uppercase())
}

fn capture(pattern: &Regex, text: &str) -> Option<String> {
    pattern
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}
