//! CLEAN and EXTRACT stage runners.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::invoice::heuristic_extract;
use crate::service::{ServiceResponse, Stage, TextGenerationClient, Variables};

use super::normalize::pick_text;
use super::StageResult;

/// Instruction for the CLEAN stage.
pub const CLEAN_PROMPT: &str = "You clean noisy OCR to plain text.
- Keep facts.
- No guessing.
- Keep table rows readable.

OCR:
{ocr_text}";

/// Instruction for the EXTRACT stage.
pub const EXTRACT_PROMPT: &str = "From CLEAN_TEXT, return STRICT JSON with keys exactly:
vendor, number, date, total, currency,
line_items (list of {{description, quantity, unit_price, amount}}).

Unknown → null. Numbers numeric. Dates YYYY-MM-DD if possible.
JSON ONLY, no extra text.

CLEAN_TEXT:
{clean_text}";

/// What one stage invocation produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageOutput {
    /// Unmodified service response, or `{"fallback": true}` after a failed call.
    pub raw: ServiceResponse,

    /// Text handed to the next stage.
    pub normalized_text: String,
}

impl StageOutput {
    fn fallback(normalized_text: String) -> Self {
        Self {
            raw: ServiceResponse::fallback_marker(),
            normalized_text,
        }
    }
}

/// Runs the service-backed stages, each with its own local fallback.
#[derive(Clone)]
pub struct StageRunner {
    client: Arc<dyn TextGenerationClient>,
}

impl StageRunner {
    /// Create a runner over `client`.
    pub fn new(client: Arc<dyn TextGenerationClient>) -> Self {
        Self { client }
    }

    /// Clean noisy OCR text.
    ///
    /// Falls back to `ocr_text` unchanged when the call fails or returns
    /// blank text.
    pub fn clean(&self, ocr_text: &str) -> StageResult<StageOutput> {
        let variables = single_variable("ocr_text", ocr_text);
        let stage = Stage::Clean;

        match self.client.run(stage, CLEAN_PROMPT, &variables) {
            Ok(raw) => {
                let text = pick_text(&raw, &stage.output_key());
                if text.trim().is_empty() {
                    warn!(stage = %stage, "Service returned blank text, keeping OCR text");
                    return StageResult::Degraded {
                        output: StageOutput {
                            raw,
                            normalized_text: ocr_text.to_string(),
                        },
                        reason: "blank CLEAN output".to_string(),
                    };
                }
                debug!(stage = %stage, chars = text.len(), "Stage complete");
                StageResult::Ok(StageOutput {
                    raw,
                    normalized_text: text,
                })
            }
            Err(e) => {
                warn!(stage = %stage, error = %e, "Stage failed, keeping OCR text");
                StageResult::Degraded {
                    output: StageOutput::fallback(ocr_text.to_string()),
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Ask the service for a strict-JSON invoice.
    ///
    /// When the call fails, the heuristic extractor runs over `clean_text`
    /// and its record, serialized as JSON, becomes the stage output.
    pub fn extract_structured(&self, clean_text: &str) -> StageResult<StageOutput> {
        let variables = single_variable("clean_text", clean_text);
        let stage = Stage::Extract;

        match self.client.run(stage, EXTRACT_PROMPT, &variables) {
            Ok(raw) => {
                let text = pick_text(&raw, &stage.output_key());
                debug!(stage = %stage, chars = text.len(), "Stage complete");
                StageResult::Ok(StageOutput {
                    raw,
                    normalized_text: text,
                })
            }
            Err(e) => {
                warn!(stage = %stage, error = %e, "Stage failed, using heuristic extraction");
                let record = heuristic_extract(clean_text);
                let json = Value::Object(record.to_object()).to_string();
                StageResult::Degraded {
                    output: StageOutput::fallback(json),
                    reason: e.to_string(),
                }
            }
        }
    }
}

fn single_variable(name: &str, value: &str) -> Variables {
    let mut variables = Variables::new();
    variables.insert(name.to_string(), value.to_string());
    variables
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use crate::service::render_template;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Map};

    struct FailingClient;

    impl TextGenerationClient for FailingClient {
        fn run(&self, _: Stage, _: &str, _: &Variables) -> Result<ServiceResponse, ServiceError> {
            Err(ServiceError::Unavailable("offline".to_string()))
        }
    }

    struct CannedClient(ServiceResponse);

    impl TextGenerationClient for CannedClient {
        fn run(&self, _: Stage, _: &str, _: &Variables) -> Result<ServiceResponse, ServiceError> {
            Ok(self.0.clone())
        }
    }

    fn runner(client: impl TextGenerationClient + 'static) -> StageRunner {
        StageRunner::new(Arc::new(client))
    }

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_clean_prefers_stage_output_key() {
        let raw = ServiceResponse::Structured(object(json!({
            "ocr_text": "n0isy",
            "CLEAN_output": "noisy"
        })));
        let result = runner(CannedClient(raw.clone())).clean("n0isy");

        assert!(!result.is_degraded());
        assert_eq!(result.output().normalized_text, "noisy");
        assert_eq!(result.output().raw, raw);
    }

    #[test]
    fn test_clean_blank_output_keeps_ocr_text() {
        let raw = ServiceResponse::Text("   ".to_string());
        let result = runner(CannedClient(raw.clone())).clean("Total: 5");

        assert!(result.is_degraded());
        assert_eq!(result.output().normalized_text, "Total: 5");
        assert_eq!(result.output().raw, raw);
    }

    #[test]
    fn test_clean_failure_falls_back() {
        let result = runner(FailingClient).clean("Vendor: X");

        assert!(result.is_degraded());
        assert!(result.reason().unwrap_or_default().contains("offline"));
        assert_eq!(result.output().normalized_text, "Vendor: X");
        assert!(result.output().raw.is_fallback_marker());
    }

    #[test]
    fn test_extract_keeps_raw_response_verbatim() {
        let raw = ServiceResponse::Text("```json\n{\"vendor\": \"X\"}\n```".to_string());
        let result = runner(CannedClient(raw.clone())).extract_structured("Vendor: X");

        assert!(!result.is_degraded());
        assert_eq!(result.output().raw, raw);
        assert_eq!(result.output().normalized_text, "```json\n{\"vendor\": \"X\"}\n```");
    }

    #[test]
    fn test_extract_failure_uses_heuristics() {
        let result = runner(FailingClient).extract_structured("Vendor: Globex\nTotal: 12.5 EUR");

        assert!(result.is_degraded());
        let parsed: Value = serde_json::from_str(&result.output().normalized_text).unwrap();
        assert_eq!(
            parsed,
            json!({
                "vendor": "Globex",
                "number": null,
                "date": null,
                "total": 12.5,
                "currency": "EUR",
                "line_items": []
            })
        );
    }

    #[test]
    fn test_prompts_render() {
        let prompt = render_template(EXTRACT_PROMPT, &single_variable("clean_text", "ABC"));
        assert!(prompt.contains("list of {description, quantity, unit_price, amount}"));
        assert!(prompt.ends_with("CLEAN_TEXT:\nABC"));

        let prompt = render_template(CLEAN_PROMPT, &single_variable("ocr_text", "XYZ"));
        assert!(prompt.ends_with("OCR:\nXYZ"));
    }
}
