//! Error types for the invox-core library.
//!
//! Only the outer layers (storage, intake, notification, configuration)
//! surface these to callers. Pipeline stages catch their own errors and
//! degrade to a fallback instead.

use thiserror::Error;

/// Main error type for the invox library.
#[derive(Error, Debug)]
pub enum InvoxError {
    /// OCR processing error.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// Text-generation service error.
    #[error("service error: {0}")]
    Service(#[from] ServiceError),

    /// Invoice storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Document intake error.
    #[error("intake error: {0}")]
    Intake(#[from] IntakeError),

    /// Notification error.
    #[error("notification error: {0}")]
    Notify(#[from] NotifyError),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors related to acquiring or running the recognition engine.
#[derive(Error, Debug, Clone)]
pub enum OcrError {
    /// Failed to load OCR models.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// Text recognition failed.
    #[error("text recognition failed: {0}")]
    Recognition(String),

    /// Recognition succeeded but produced no text.
    #[error("empty OCR output")]
    EmptyOutput,

    /// Image could not be opened or decoded.
    #[error("invalid image: {0}")]
    InvalidImage(String),
}

/// Errors from a text-generation call.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// API key environment variable is not set.
    #[error("missing credentials: environment variable {0} is not set")]
    MissingCredentials(String),

    /// Transport-level failure (connect, timeout, TLS).
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("service returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body could not be decoded.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// The response carried no completion.
    #[error("empty response from service")]
    EmptyResponse,

    /// No service is configured.
    #[error("text-generation service unavailable: {0}")]
    Unavailable(String),
}

/// Errors from the SQLite invoice store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Underlying SQLite error.
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Failed to create the database directory.
    #[error("failed to prepare database path: {0}")]
    Path(#[from] std::io::Error),
}

/// Errors from the document intake bookkeeping.
#[derive(Error, Debug)]
pub enum IntakeError {
    /// Reading the input directory or writing the seen log failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The seen log could not be serialized.
    #[error("failed to serialize seen log: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors from sending a notification.
#[derive(Error, Debug)]
pub enum NotifyError {
    /// SMTP password environment variable is not set.
    #[error("missing credentials: environment variable {0} is not set")]
    MissingCredentials(String),

    /// Sender or recipient is not a valid mailbox.
    #[error("invalid address {address}: {reason}")]
    Address { address: String, reason: String },

    /// Message could not be built.
    #[error("failed to build message: {0}")]
    Message(String),

    /// SMTP transport failure.
    #[error("SMTP error: {0}")]
    Transport(String),
}

/// Result type for the invox library.
pub type Result<T> = std::result::Result<T, InvoxError>;
