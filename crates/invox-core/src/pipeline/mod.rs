//! Document-processing pipeline.
//!
//! OCR → CLEAN → EXTRACT → JSON-normalize → VALIDATE, strictly in order.
//! Each stage that can fail has a deterministic fallback, so [`Pipeline::run`]
//! always returns a complete [`PipelineRun`].

pub mod normalize;
pub mod stages;

pub use normalize::{extract_json_object, pick_text};
pub use stages::{StageOutput, StageRunner};

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::invoice::validate;
use crate::models::invoice::{InvoiceRecord, ValidationResult};
use crate::ocr::{OcrResult, OcrSource, TextExtractor};
use crate::service::TextGenerationClient;

/// Outcome of a stage: its output, and whether a fallback produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StageResult<T> {
    /// The stage completed normally.
    Ok(T),
    /// The stage failed and its fallback produced `output`.
    Degraded { output: T, reason: String },
}

impl<T> StageResult<T> {
    /// The stage output, regardless of how it was produced.
    pub fn output(&self) -> &T {
        match self {
            StageResult::Ok(output) | StageResult::Degraded { output, .. } => output,
        }
    }

    /// Consume the result, keeping only the output.
    pub fn into_output(self) -> T {
        match self {
            StageResult::Ok(output) | StageResult::Degraded { output, .. } => output,
        }
    }

    /// True when a fallback produced the output.
    pub fn is_degraded(&self) -> bool {
        matches!(self, StageResult::Degraded { .. })
    }

    /// Why the stage fell back, if it did.
    pub fn reason(&self) -> Option<&str> {
        match self {
            StageResult::Ok(_) => None,
            StageResult::Degraded { reason, .. } => Some(reason),
        }
    }
}

/// Every artifact produced for one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    /// Name of the processed file.
    pub file_name: String,

    /// OCR stage; degraded when the placeholder text was used.
    pub ocr: StageResult<OcrResult>,

    pub clean: StageResult<StageOutput>,

    pub extract: StageResult<StageOutput>,

    /// Normalized EXTRACT output the record was parsed from.
    pub raw_json: String,

    /// JSON object recovered from `raw_json`.
    pub parsed: Map<String, Value>,

    /// Typed view of `parsed`.
    pub record: InvoiceRecord,

    pub validation: ValidationResult,

    /// Wall-clock time for the whole run in milliseconds.
    pub processing_time_ms: u64,
}

impl PipelineRun {
    /// Stage names that fell back, in pipeline order.
    pub fn degraded_stages(&self) -> Vec<&'static str> {
        [
            ("OCR", self.ocr.is_degraded()),
            ("CLEAN", self.clean.is_degraded()),
            ("EXTRACT", self.extract.is_degraded()),
        ]
        .into_iter()
        .filter(|(_, degraded)| *degraded)
        .map(|(name, _)| name)
        .collect()
    }

    /// True when the OCR text is the placeholder rather than the document.
    pub fn used_placeholder(&self) -> bool {
        self.ocr.output().is_placeholder()
    }
}

/// Sequences the pipeline stages for one document at a time.
///
/// Holds no per-document state; share it behind an [`Arc`] to process
/// documents from several threads.
pub struct Pipeline {
    extractor: TextExtractor,
    stages: StageRunner,
}

impl Pipeline {
    /// Create a pipeline from an OCR extractor and a service client.
    pub fn new(extractor: TextExtractor, client: Arc<dyn TextGenerationClient>) -> Self {
        Self {
            extractor,
            stages: StageRunner::new(client),
        }
    }

    /// Build the production pipeline described by `config`.
    #[cfg(feature = "native")]
    pub fn from_config(config: &crate::InvoxConfig) -> crate::Result<Self> {
        let provider = crate::ocr::PureEngineProvider::new(config.models.clone());
        let extractor = TextExtractor::with_provider(provider, config.ocr.clone());
        let client = crate::service::client_from_config(&config.service)?;
        Ok(Self::new(extractor, Arc::from(client)))
    }

    /// Process the document at `path`. Never fails.
    pub fn run(&self, path: &Path) -> PipelineRun {
        let start = Instant::now();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        info!(file = %file_name, "Processing document");

        let ocr = self.extractor.extract(path);
        let ocr = match ocr.source.clone() {
            OcrSource::Recognized => StageResult::Ok(ocr),
            OcrSource::Placeholder { reason } => StageResult::Degraded { output: ocr, reason },
        };

        self.refine(file_name, ocr, start)
    }

    /// Run the refinement stages over text that was already recognized.
    pub fn run_text(&self, file_name: &str, text: &str) -> PipelineRun {
        let start = Instant::now();
        let ocr = StageResult::Ok(OcrResult::recognized(text.to_string(), 0));
        self.refine(file_name.to_string(), ocr, start)
    }

    fn refine(&self, file_name: String, ocr: StageResult<OcrResult>, start: Instant) -> PipelineRun {
        let clean = self.stages.clean(&ocr.output().text);
        let extract = self.stages.extract_structured(&clean.output().normalized_text);

        let raw_json = extract.output().normalized_text.clone();
        let parsed = extract_json_object(&raw_json);
        let validation = validate(&parsed);
        let record = InvoiceRecord::from_object(&parsed);

        let run = PipelineRun {
            file_name,
            ocr,
            clean,
            extract,
            raw_json,
            parsed,
            record,
            validation,
            processing_time_ms: start.elapsed().as_millis() as u64,
        };

        let degraded = run.degraded_stages();
        if !degraded.is_empty() {
            warn!(file = %run.file_name, stages = ?degraded, "Pipeline ran with fallbacks");
        }
        info!(
            file = %run.file_name,
            valid = run.validation.valid,
            issues = run.validation.issues.len(),
            elapsed_ms = run.processing_time_ms,
            "Document processed"
        );

        run
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_result_accessors() {
        let ok: StageResult<u8> = StageResult::Ok(1);
        let degraded = StageResult::Degraded {
            output: 2u8,
            reason: "offline".to_string(),
        };

        assert_eq!(*ok.output(), 1);
        assert!(!ok.is_degraded());
        assert_eq!(ok.reason(), None);

        assert_eq!(*degraded.output(), 2);
        assert!(degraded.is_degraded());
        assert_eq!(degraded.reason(), Some("offline"));
        assert_eq!(degraded.into_output(), 2);
    }

    #[test]
    fn test_stage_result_serialization() {
        let degraded = StageResult::Degraded {
            output: OcrResult::placeholder("no engine", 3),
            reason: "no engine".to_string(),
        };

        let value = serde_json::to_value(&degraded).unwrap();

        assert_eq!(value["status"], "degraded");
        assert_eq!(value["reason"], "no engine");
        assert_eq!(value["output"]["source"]["kind"], "placeholder");
    }
}
