//! Recognition engine backed by `pure-onnx-ocr` (pure Rust, no external ONNX Runtime).

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;

use image::GenericImageView;
use tracing::{debug, info, warn};

use crate::error::OcrError;
use crate::models::config::{ModelConfig, OcrConfig};

use super::{sort_reading_order, EngineProvider, RecognitionEngine, TextBox};

/// Builds a [`PureOcrEngine`] from model files on disk.
#[derive(Debug, Clone)]
pub struct PureEngineProvider {
    models: ModelConfig,
}

impl PureEngineProvider {
    /// Create a provider reading models from `models.model_dir`.
    pub fn new(models: ModelConfig) -> Self {
        Self { models }
    }

    fn model_file(&self, name: &str) -> Result<PathBuf, OcrError> {
        let path = self.models.model_dir.join(name);
        if !path.is_file() {
            return Err(OcrError::ModelLoad(format!(
                "model file not found: {}",
                path.display()
            )));
        }
        Ok(path)
    }
}

impl EngineProvider for PureEngineProvider {
    fn initialize(&self, config: &OcrConfig) -> Result<Box<dyn RecognitionEngine>, OcrError> {
        let det_path = self.model_file(&self.models.detection_model)?;
        let rec_path = self.model_file(&self.models.recognition_model)?;
        let dict_path = self.model_file(&self.models.dictionary)?;

        if config.use_gpu {
            warn!("GPU inference is not supported by pure-onnx-ocr, running on CPU");
        }

        let engine = pure_onnx_ocr::engine::OcrEngineBuilder::new()
            .det_model_path(&det_path)
            .rec_model_path(&rec_path)
            .dictionary_path(&dict_path)
            .build()
            .map_err(|e| OcrError::ModelLoad(format!("pure-onnx-ocr: {}", e)))?;

        info!(
            "Loaded pure-onnx-ocr engine from {}",
            self.models.model_dir.display()
        );

        Ok(Box::new(PureOcrEngine {
            engine: Mutex::new(engine),
            keep_unk: config.keep_unk,
        }))
    }
}

/// Loaded `pure-onnx-ocr` engine. Recognition calls are serialized.
pub struct PureOcrEngine {
    engine: Mutex<pure_onnx_ocr::engine::OcrEngine>,
    keep_unk: bool,
}

impl PureOcrEngine {
    /// Run detection and recognition, returning boxes in reading order.
    pub fn detect(&self, path: &Path) -> Result<Vec<TextBox>, OcrError> {
        let start = Instant::now();
        let image = image::open(path)
            .map_err(|e| OcrError::InvalidImage(format!("{}: {}", path.display(), e)))?;
        let (width, height) = image.dimensions();
        debug!("Processing image: {}x{}", width, height);

        let engine = self
            .engine
            .lock()
            .map_err(|_| OcrError::Recognition("engine lock poisoned".to_string()))?;
        let results = engine
            .run_from_image(&image)
            .map_err(|e| OcrError::Recognition(format!("pure-onnx-ocr: {}", e)))?;
        drop(engine);

        let mut boxes: Vec<TextBox> = results
            .iter()
            .map(|r| TextBox {
                bbox: polygon_to_bbox(&r.bounding_box),
                text: if self.keep_unk {
                    r.text.clone()
                } else {
                    r.text.replace("[UNK]", " ")
                },
                confidence: r.confidence,
            })
            .collect();
        sort_reading_order(&mut boxes);

        debug!(
            "{} text regions in {}ms",
            boxes.len(),
            start.elapsed().as_millis()
        );
        Ok(boxes)
    }
}

impl RecognitionEngine for PureOcrEngine {
    fn recognize(&self, path: &Path) -> Result<Vec<String>, OcrError> {
        Ok(self
            .detect(path)?
            .into_iter()
            .map(|b| b.text)
            .filter(|t| !t.trim().is_empty())
            .collect())
    }
}

/// Convert a `Polygon<f64>` into `[x1, y1, x2, y2, x3, y3, x4, y4]`.
fn polygon_to_bbox(polygon: &pure_onnx_ocr::Polygon<f64>) -> [f32; 8] {
    let mut bbox = [0.0f32; 8];
    for (i, coord) in polygon.exterior().coords().take(4).enumerate() {
        bbox[i * 2] = coord.x as f32;
        bbox[i * 2 + 1] = coord.y as f32;
    }
    bbox
}
