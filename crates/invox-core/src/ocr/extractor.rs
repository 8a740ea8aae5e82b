//! Image-to-text extraction with placeholder fallback.

use std::path::Path;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::error::OcrError;
use crate::models::config::OcrConfig;

use super::{EngineProvider, LazyEngine, OcrResult};

/// OCR adapter used by the pipeline.
pub struct TextExtractor {
    engine: LazyEngine,
}

impl TextExtractor {
    /// Wrap an existing engine handle.
    pub fn new(engine: LazyEngine) -> Self {
        Self { engine }
    }

    /// Create an extractor whose engine is built by `provider` on first use.
    pub fn with_provider(provider: impl EngineProvider + 'static, config: OcrConfig) -> Self {
        Self::new(LazyEngine::new(provider, config))
    }

    /// Extract text from the image at `path`.
    ///
    /// Never fails: any acquisition or recognition error, and empty output,
    /// yield the placeholder text with the error recorded as the reason.
    pub fn extract(&self, path: &Path) -> OcrResult {
        let start = Instant::now();

        match self.try_extract(path) {
            Ok(text) => {
                let elapsed = start.elapsed().as_millis() as u64;
                info!(
                    path = %path.display(),
                    chars = text.len(),
                    elapsed_ms = elapsed,
                    "OCR complete"
                );
                OcrResult::recognized(text, elapsed)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "OCR failed, substituting placeholder text");
                OcrResult::placeholder(e.to_string(), start.elapsed().as_millis() as u64)
            }
        }
    }

    fn try_extract(&self, path: &Path) -> Result<String, OcrError> {
        let engine = self.engine.acquire()?;
        let fragments = engine.recognize(path)?;
        debug!("Recognized {} text fragments", fragments.len());

        let text = fragments.join("\n");
        if text.trim().is_empty() {
            return Err(OcrError::EmptyOutput);
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::{OcrSource, RecognitionEngine, PLACEHOLDER_TEXT};

    struct FixedEngine(Result<Vec<String>, OcrError>);

    impl RecognitionEngine for FixedEngine {
        fn recognize(&self, _path: &Path) -> Result<Vec<String>, OcrError> {
            self.0.clone()
        }
    }

    struct FixedProvider(Result<Vec<String>, OcrError>);

    impl EngineProvider for FixedProvider {
        fn initialize(&self, _config: &OcrConfig) -> Result<Box<dyn RecognitionEngine>, OcrError> {
            Ok(Box::new(FixedEngine(self.0.clone())))
        }
    }

    struct BrokenProvider;

    impl EngineProvider for BrokenProvider {
        fn initialize(&self, _config: &OcrConfig) -> Result<Box<dyn RecognitionEngine>, OcrError> {
            Err(OcrError::ModelLoad("models missing".to_string()))
        }
    }

    fn extractor(provider: impl EngineProvider + 'static) -> TextExtractor {
        TextExtractor::with_provider(provider, OcrConfig::default())
    }

    #[test]
    fn test_joins_fragments_with_newlines() {
        let ocr = extractor(FixedProvider(Ok(vec![
            "Vendor: Globex".to_string(),
            "Total: 12.50 EUR".to_string(),
        ])));

        let result = ocr.extract(Path::new("invoice.png"));

        assert_eq!(result.text, "Vendor: Globex\nTotal: 12.50 EUR");
        assert_eq!(result.source, OcrSource::Recognized);
    }

    #[test]
    fn test_whitespace_output_uses_placeholder() {
        let ocr = extractor(FixedProvider(Ok(vec!["  ".to_string(), "\t".to_string()])));

        let result = ocr.extract(Path::new("blank.png"));

        assert_eq!(result.text, PLACEHOLDER_TEXT);
        assert_eq!(
            result.source,
            OcrSource::Placeholder { reason: "empty OCR output".to_string() }
        );
    }

    #[test]
    fn test_recognition_error_uses_placeholder() {
        let ocr = extractor(FixedProvider(Err(OcrError::Recognition("boom".to_string()))));

        let result = ocr.extract(Path::new("broken.png"));

        assert!(result.is_placeholder());
        assert_eq!(result.text, PLACEHOLDER_TEXT);
    }

    #[test]
    fn test_acquisition_failure_uses_placeholder() {
        let ocr = extractor(BrokenProvider);

        let first = ocr.extract(Path::new("a.png"));
        let second = ocr.extract(Path::new("b.png"));

        assert!(first.is_placeholder());
        assert!(second.is_placeholder());
        assert!(!first.text.trim().is_empty());
    }
}
