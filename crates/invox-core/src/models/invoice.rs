//! Invoice record and validation result models.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Keys every serialized [`InvoiceRecord`] carries, in output order.
pub const RECORD_KEYS: [&str; 6] = ["vendor", "number", "date", "total", "currency", "line_items"];

/// The canonical structured invoice.
///
/// Every field is always serialized; unknown values become `null` and
/// `line_items` is always an array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvoiceRecord {
    /// Issuing vendor.
    pub vendor: Option<String>,

    /// Invoice number/identifier.
    pub number: Option<String>,

    /// Issue date, `YYYY-MM-DD` when known.
    pub date: Option<String>,

    /// Grand total.
    pub total: Option<f64>,

    /// Currency code.
    pub currency: Option<String>,

    /// Line items in document order.
    #[serde(default)]
    pub line_items: Vec<LineItem>,
}

/// A single line item on the invoice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// Product/service description.
    pub description: Option<String>,

    /// Quantity.
    pub quantity: Option<f64>,

    /// Price per unit.
    pub unit_price: Option<f64>,

    /// Line total.
    pub amount: Option<f64>,
}

/// Outcome of validating a structured invoice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// True iff `issues` is empty.
    pub valid: bool,

    /// Issues in rule order.
    pub issues: Vec<String>,
}

impl ValidationResult {
    /// Build a result from an issue list.
    pub fn from_issues(issues: Vec<String>) -> Self {
        Self {
            valid: issues.is_empty(),
            issues,
        }
    }
}

impl InvoiceRecord {
    /// Build a typed record from a loosely-typed JSON object.
    ///
    /// Values of the wrong shape become `None` instead of failing, so a
    /// record can always be produced from whatever the extraction stage
    /// returned.
    pub fn from_object(object: &Map<String, Value>) -> Self {
        let line_items = match object.get("line_items") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_object)
                .map(LineItem::from_object)
                .collect(),
            _ => Vec::new(),
        };

        Self {
            vendor: coerce_text(object.get("vendor")),
            number: coerce_text(object.get("number")),
            date: coerce_text(object.get("date")),
            total: coerce_number(object.get("total")),
            currency: coerce_text(object.get("currency")),
            line_items,
        }
    }

    /// Serialize into a JSON object with all six keys present.
    pub fn to_object(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            // Serializing a plain struct of options cannot produce anything else.
            _ => Map::new(),
        }
    }

    /// Parse `date` as an ISO calendar date.
    pub fn issue_date(&self) -> Option<NaiveDate> {
        self.date
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d").ok())
    }

    /// How many scalar fields were filled (out of five).
    pub fn coverage(&self) -> (usize, usize) {
        let filled = [
            self.vendor.is_some(),
            self.number.is_some(),
            self.date.is_some(),
            self.total.is_some(),
            self.currency.is_some(),
        ]
        .iter()
        .filter(|&&v| v)
        .count();
        (filled, 5)
    }
}

impl LineItem {
    /// Build a line item from a loosely-typed JSON object.
    pub fn from_object(object: &Map<String, Value>) -> Self {
        Self {
            description: coerce_text(object.get("description")),
            quantity: coerce_number(object.get("quantity")),
            unit_price: coerce_number(object.get("unit_price")),
            amount: coerce_number(object.get("amount")),
        }
    }
}

/// Coerce a JSON value into text. Numbers are rendered, blanks dropped.
pub(crate) fn coerce_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Coerce a JSON value into a finite number. Numeric strings are accepted.
pub(crate) fn coerce_number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}
