//! Required-field and type checks over an extracted invoice object.

use serde_json::{Map, Value};

use crate::models::invoice::{coerce_number, coerce_text, ValidationResult};

/// Fields that must be present and non-empty.
const REQUIRED_TEXT_FIELDS: [&str; 4] = ["vendor", "number", "date", "currency"];

/// Validate a parsed invoice object.
///
/// Issues are reported in a fixed order: missing text fields, then the
/// total, then the line items. A field passes only if
/// [`InvoiceRecord::from_object`](crate::InvoiceRecord::from_object) keeps
/// it, so a valid object always yields a record with every scalar filled.
pub fn validate(data: &Map<String, Value>) -> ValidationResult {
    let mut issues = Vec::new();

    for key in REQUIRED_TEXT_FIELDS {
        if coerce_text(data.get(key)).is_none() {
            issues.push(format!("missing key: {key}"));
        }
    }

    match data.get("total") {
        None | Some(Value::Null) => issues.push("total is null".to_string()),
        Some(value) if coerce_number(Some(value)).is_none() => {
            issues.push(format!("total not numeric: {}", display_value(value)))
        }
        _ => {}
    }

    if let Some(items) = data.get("line_items") {
        if !items.is_array() {
            issues.push("line_items not a list".to_string());
        }
    }

    ValidationResult::from_issues(issues)
}

/// Strings are shown bare, everything else as JSON.
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
