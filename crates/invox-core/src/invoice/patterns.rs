//! Labelled-field patterns for English invoice text.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Rest of the line after the label
    pub static ref VENDOR: Regex = Regex::new(r"(?i)Vendor:\s*(.+)").unwrap();

    pub static ref INVOICE_NUMBER: Regex = Regex::new(
        r"(?i)(?:Invoice Number|Invoice No\.?):\s*([A-Za-z0-9\-]+)"
    ).unwrap();

    // ISO dates only
    pub static ref INVOICE_DATE: Regex = Regex::new(
        r"(?i)(?:Invoice Date|Date):\s*([0-9]{4}-[0-9]{2}-[0-9]{2})"
    ).unwrap();

    // Word boundary keeps "Subtotal:" from matching
    pub static ref TOTAL: Regex = Regex::new(
        r"(?i)\bTotal:\s*([0-9]+(?:\.[0-9]+)?)"
    ).unwrap();

    pub static ref TOTAL_CURRENCY: Regex = Regex::new(
        r"(?i)\bTotal:\s*[0-9]+(?:\.[0-9]+)?\s*([A-Za-z]{3})\b"
    ).unwrap();

    pub static ref CURRENCY_LABEL: Regex = Regex::new(
        r"(?i)Currency:\s*([A-Za-z]{3})\b"
    ).unwrap();
}
