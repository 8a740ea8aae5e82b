//! Text-generation service seam.
//!
//! The pipeline treats the service as an unreliable capability: given a
//! stage name, a prompt template and input variables, return either plain
//! text or a loosely-typed mapping. Every failure is reported as a
//! [`ServiceError`] and handled by the calling stage.

mod chat;

pub use chat::ChatCompletionsClient;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ServiceError;
use crate::models::config::ServiceConfig;

/// Named input variables substituted into a prompt template.
pub type Variables = BTreeMap<String, String>;

/// A refinement stage that calls the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Stage {
    /// Clean noisy OCR text.
    Clean,
    /// Extract a structured invoice as JSON.
    Extract,
}

impl Stage {
    /// Upper-case stage name.
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Clean => "CLEAN",
            Stage::Extract => "EXTRACT",
        }
    }

    /// Key under which structured responses carry this stage's output.
    pub fn output_key(&self) -> String {
        format!("{}_output", self.name())
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Raw service response, either plain text or a mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServiceResponse {
    Text(String),
    Structured(Map<String, Value>),
}

impl ServiceResponse {
    /// The marker recorded as a stage's raw response when it fell back.
    pub fn fallback_marker() -> Self {
        let mut map = Map::new();
        map.insert("fallback".to_string(), Value::Bool(true));
        ServiceResponse::Structured(map)
    }

    /// True for the [`fallback_marker`](Self::fallback_marker) mapping.
    pub fn is_fallback_marker(&self) -> bool {
        matches!(self, ServiceResponse::Structured(map) if map.get("fallback") == Some(&Value::Bool(true)))
    }
}

/// Executes one inference call for a pipeline stage.
pub trait TextGenerationClient: Send + Sync {
    /// Run `template` with `variables` substituted, on behalf of `stage`.
    fn run(
        &self,
        stage: Stage,
        template: &str,
        variables: &Variables,
    ) -> Result<ServiceResponse, ServiceError>;
}

/// Client used when the service is switched off. Every call fails, so every
/// stage takes its local fallback.
#[derive(Debug, Clone, Default)]
pub struct DisabledClient;

impl TextGenerationClient for DisabledClient {
    fn run(&self, stage: Stage, _: &str, _: &Variables) -> Result<ServiceResponse, ServiceError> {
        Err(ServiceError::Unavailable(format!(
            "service disabled in configuration, skipping {stage}"
        )))
    }
}

/// Build the client described by `config`.
///
/// A disabled service yields [`DisabledClient`]. Missing credentials are not
/// an error here; they surface on the first call so that stages fall back.
pub fn client_from_config(config: &ServiceConfig) -> Result<Box<dyn TextGenerationClient>, ServiceError> {
    if !config.enabled {
        return Ok(Box::new(DisabledClient));
    }
    Ok(Box::new(ChatCompletionsClient::from_config(config)?))
}

/// Substitute `{name}` placeholders from `variables`.
///
/// `{{` and `}}` produce literal braces. A placeholder naming an unknown
/// variable is left as written.
pub fn render_template(template: &str, variables: &Variables) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find(['{', '}']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if tail.starts_with("{{") || tail.starts_with("}}") {
            out.push_str(&tail[..1]);
            rest = &tail[2..];
            continue;
        }

        if tail.starts_with('{') {
            if let Some(end) = tail.find('}') {
                let name = &tail[1..end];
                if let Some(value) = variables.get(name) {
                    out.push_str(value);
                    rest = &tail[end + 1..];
                    continue;
                }
            }
        }

        out.push_str(&tail[..1]);
        rest = &tail[1..];
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Variables {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_render_substitutes_variables() {
        let rendered = render_template("OCR:\n{ocr_text}", &vars(&[("ocr_text", "Total: 5")]));
        assert_eq!(rendered, "OCR:\nTotal: 5");
    }

    #[test]
    fn test_render_escaped_braces() {
        let rendered = render_template(
            "list of {{description, amount}} from {clean_text}",
            &vars(&[("clean_text", "X")]),
        );
        assert_eq!(rendered, "list of {description, amount} from X");
    }

    #[test]
    fn test_render_unknown_placeholder_kept() {
        let rendered = render_template("{missing} and {", &Variables::new());
        assert_eq!(rendered, "{missing} and {");
    }

    #[test]
    fn test_render_value_braces_not_reinterpreted() {
        let rendered = render_template("{a}", &vars(&[("a", "{b}"), ("b", "no")]));
        assert_eq!(rendered, "{b}");
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::Clean.to_string(), "CLEAN");
        assert_eq!(Stage::Extract.output_key(), "EXTRACT_output");
    }

    #[test]
    fn test_disabled_client_fails() {
        let result = DisabledClient.run(Stage::Clean, "{ocr_text}", &Variables::new());
        assert!(matches!(result, Err(ServiceError::Unavailable(_))));
    }

    #[test]
    fn test_fallback_marker() {
        assert!(ServiceResponse::fallback_marker().is_fallback_marker());
        assert!(!ServiceResponse::Text("fallback".to_string()).is_fallback_marker());
        assert_eq!(
            serde_json::to_string(&ServiceResponse::fallback_marker()).unwrap(),
            r#"{"fallback":true}"#
        );
    }
}
