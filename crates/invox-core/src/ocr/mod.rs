//! OCR text acquisition.
//!
//! [`TextExtractor`] turns an image file into text and never fails: when the
//! recognition engine cannot be acquired, errors, or reads nothing, it
//! returns [`PLACEHOLDER_TEXT`] instead. The engine itself is reached through
//! the [`EngineProvider`] / [`RecognitionEngine`] seam so tests and other
//! backends can be swapped in.

mod engine;
mod extractor;
#[cfg(feature = "native")]
mod pure_engine;

pub use engine::LazyEngine;
pub use extractor::TextExtractor;
#[cfg(feature = "native")]
pub use pure_engine::{PureEngineProvider, PureOcrEngine};

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::OcrError;
use crate::models::config::OcrConfig;

/// Text substituted whenever recognition is unavailable or fails.
///
/// It describes a minimal but complete invoice so the downstream stages
/// still have something well-formed to work on.
pub const PLACEHOLDER_TEXT: &str = "Mock OCR text for testing UI.\n\
Vendor: ACME Corp\n\
Invoice Number: 12345\n\
Date: 2025-09-24\n\
Total: 1000.00 USD";

/// A ready-to-use recognition engine.
pub trait RecognitionEngine: Send + Sync {
    /// Recognize text in the image at `path`, returning fragments in reading order.
    fn recognize(&self, path: &Path) -> Result<Vec<String>, OcrError>;
}

/// Builds a [`RecognitionEngine`]. Called at most once per [`LazyEngine`].
pub trait EngineProvider: Send + Sync {
    /// Load models and construct the engine.
    fn initialize(&self, config: &OcrConfig) -> Result<Box<dyn RecognitionEngine>, OcrError>;
}

/// Where the text of an [`OcrResult`] came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OcrSource {
    /// Read from the document by the recognition engine.
    Recognized,
    /// [`PLACEHOLDER_TEXT`] substituted after a failure.
    Placeholder { reason: String },
}

/// Result of OCR on one document. `text` is never empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrResult {
    /// Full text, fragments joined with newlines.
    pub text: String,

    /// Whether the text was recognized or substituted.
    pub source: OcrSource,

    /// Processing time in milliseconds.
    pub processing_time_ms: u64,
}

impl OcrResult {
    /// Result carrying recognized text.
    pub fn recognized(text: String, processing_time_ms: u64) -> Self {
        Self {
            text,
            source: OcrSource::Recognized,
            processing_time_ms,
        }
    }

    /// Result carrying the placeholder text.
    pub fn placeholder(reason: impl Into<String>, processing_time_ms: u64) -> Self {
        Self {
            text: PLACEHOLDER_TEXT.to_string(),
            source: OcrSource::Placeholder {
                reason: reason.into(),
            },
            processing_time_ms,
        }
    }

    /// True when the text is the placeholder.
    pub fn is_placeholder(&self) -> bool {
        matches!(self.source, OcrSource::Placeholder { .. })
    }
}

/// A recognized text fragment with its quadrilateral bounding box.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextBox {
    /// Bounding box coordinates (x1, y1, x2, y2, x3, y3, x4, y4).
    pub bbox: [f32; 8],

    /// Recognized text content.
    pub text: String,

    /// Recognition confidence score (0.0 - 1.0).
    pub confidence: f32,
}

impl TextBox {
    /// Get the axis-aligned bounding rectangle.
    pub fn rect(&self) -> (f32, f32, f32, f32) {
        let xs = [self.bbox[0], self.bbox[2], self.bbox[4], self.bbox[6]];
        let ys = [self.bbox[1], self.bbox[3], self.bbox[5], self.bbox[7]];

        let min_x = xs.iter().cloned().fold(f32::INFINITY, f32::min);
        let max_x = xs.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        let min_y = ys.iter().cloned().fold(f32::INFINITY, f32::min);
        let max_y = ys.iter().cloned().fold(f32::NEG_INFINITY, f32::max);

        (min_x, min_y, max_x, max_y)
    }
}

/// Sort boxes by reading order (top-to-bottom, left-to-right).
///
/// Boxes whose top edges fall in the same 20 px band count as one row.
pub fn sort_reading_order(boxes: &mut [TextBox]) {
    boxes.sort_by(|a, b| {
        let (ax, ay, _, _) = a.rect();
        let (bx, by, _, _) = b.rect();

        let row_a = (ay / 20.0) as i32;
        let row_b = (by / 20.0) as i32;

        if row_a != row_b {
            row_a.cmp(&row_b)
        } else {
            ax.partial_cmp(&bx).unwrap_or(std::cmp::Ordering::Equal)
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_box(text: &str, x: f32, y: f32) -> TextBox {
        TextBox {
            bbox: [x, y, x + 50.0, y, x + 50.0, y + 10.0, x, y + 10.0],
            text: text.to_string(),
            confidence: 0.9,
        }
    }

    #[test]
    fn test_sort_reading_order() {
        let mut boxes = vec![
            text_box("Total: 5", 10.0, 200.0),
            text_box("ACME", 300.0, 42.0),
            text_box("Vendor:", 10.0, 45.0),
            text_box("Invoice", 10.0, 5.0),
        ];

        sort_reading_order(&mut boxes);

        let texts: Vec<&str> = boxes.iter().map(|b| b.text.as_str()).collect();
        assert_eq!(texts, vec!["Invoice", "Vendor:", "ACME", "Total: 5"]);
    }

    #[test]
    fn test_placeholder_result() {
        let result = OcrResult::placeholder("no engine", 0);

        assert!(result.is_placeholder());
        assert_eq!(result.text, PLACEHOLDER_TEXT);
        assert!(PLACEHOLDER_TEXT.contains("Vendor: ACME Corp"));
        assert!(PLACEHOLDER_TEXT.contains("Total: 1000.00 USD"));
    }
}
