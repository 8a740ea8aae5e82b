//! Response normalization: plain text out of heterogeneous service
//! responses, and a JSON object out of noisy model output.

use serde_json::{Map, Value};

use crate::service::ServiceResponse;

/// Keys searched, in order, when the preferred key holds no string.
const TEXT_KEYS: [&str; 4] = ["output", "text", "CLEAN_output", "EXTRACT_output"];

/// Key holding the original text when no JSON object could be recovered.
pub const RAW_KEY: &str = "__raw__";

/// Extract plain text from a service response. Never fails.
///
/// Text is returned as-is. For a mapping, the string under `preferred_key`
/// wins, then the first string among the common output keys, and finally
/// the mapping serialized as JSON.
pub fn pick_text(response: &ServiceResponse, preferred_key: &str) -> String {
    let map = match response {
        ServiceResponse::Text(text) => return text.clone(),
        ServiceResponse::Structured(map) => map,
    };

    std::iter::once(preferred_key)
        .chain(TEXT_KEYS)
        .find_map(|key| map.get(key).and_then(Value::as_str))
        .map(str::to_string)
        .unwrap_or_else(|| Value::Object(map.clone()).to_string())
}

/// Recover the JSON object carried by `text`.
///
/// Tries, in order: the whole text, then the span from the first `{` to the
/// last `}`. Anything that does not yield an object falls through; when
/// nothing does, the text is wrapped as `{"__raw__": text}`.
pub fn extract_json_object(text: &str) -> Map<String, Value> {
    if let Some(object) = parse_object(text) {
        return object;
    }

    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if end > start {
            if let Some(object) = parse_object(&text[start..=end]) {
                return object;
            }
        }
    }

    let mut raw = Map::new();
    raw.insert(RAW_KEY.to_string(), Value::String(text.to_string()));
    raw
}

fn parse_object(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}
