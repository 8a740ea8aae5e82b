//! Core library for invoice image processing.
//!
//! This crate provides:
//! - OCR text acquisition with a placeholder fallback
//! - A CLEAN → EXTRACT → VALIDATE refinement pipeline over an unreliable
//!   text-generation service, with a local fallback for every stage
//! - Tolerant JSON recovery and a typed invoice record
//! - Intake bookkeeping, SQLite persistence and email notification

pub mod error;
pub mod intake;
pub mod invoice;
pub mod models;
pub mod notify;
pub mod ocr;
pub mod pipeline;
pub mod service;
pub mod storage;

pub use error::{InvoxError, Result};
pub use intake::{scan_new, SeenLog};
pub use invoice::{heuristic_extract, validate};
pub use models::config::InvoxConfig;
pub use models::invoice::{InvoiceRecord, LineItem, ValidationResult};
pub use notify::{Notifier, SmtpNotifier};
pub use ocr::{EngineProvider, LazyEngine, OcrResult, OcrSource, RecognitionEngine, TextExtractor};
#[cfg(feature = "native")]
pub use ocr::PureEngineProvider;
pub use pipeline::{extract_json_object, pick_text, Pipeline, PipelineRun, StageResult};
pub use service::{ServiceResponse, Stage, TextGenerationClient};
pub use storage::{InvoiceStore, StoredInvoice};
