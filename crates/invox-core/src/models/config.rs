//! Configuration structures for the invoice pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration for invox.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InvoxConfig {
    /// OCR engine configuration.
    pub ocr: OcrConfig,

    /// Model file configuration.
    pub models: ModelConfig,

    /// Text-generation service configuration.
    pub service: ServiceConfig,

    /// Document intake configuration.
    pub intake: IntakeConfig,

    /// Invoice database configuration.
    pub storage: StorageConfig,

    /// Email notification configuration.
    pub notify: NotifyConfig,
}

/// OCR engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Languages the recognizer should read.
    pub languages: Vec<String>,

    /// Use GPU if available.
    pub use_gpu: bool,

    /// Keep `[UNK]` tokens emitted by the recognizer instead of blanking them.
    pub keep_unk: bool,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            languages: vec!["en".to_string()],
            use_gpu: false,
            keep_unk: false,
        }
    }
}

/// Model file paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Directory containing model files.
    pub model_dir: PathBuf,

    /// Text detection model file name.
    pub detection_model: String,

    /// Text recognition model file name.
    pub recognition_model: String,

    /// Character dictionary file name.
    pub dictionary: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            detection_model: "det.onnx".to_string(),
            recognition_model: "latin_rec.onnx".to_string(),
            dictionary: "latin_dict.txt".to_string(),
        }
    }
}

/// Text-generation service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// When false, every stage runs its local fallback.
    pub enabled: bool,

    /// Base URL of an OpenAI-compatible API (without `/chat/completions`).
    pub base_url: String,

    /// Model identifier sent with each request.
    pub model: String,

    /// Name of the environment variable holding the API key.
    pub api_key_env: String,

    /// Sampling temperature.
    pub temperature: f64,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,

    /// Input variables longer than this are truncated before sending.
    pub max_input_chars: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "https://api.euron.one/api/v1/euri".to_string(),
            model: "gpt-4.1-nano".to_string(),
            api_key_env: "EURI_API_KEY".to_string(),
            temperature: 0.0,
            timeout_secs: 60,
            max_input_chars: 12_000,
        }
    }
}

/// Watched-folder intake configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IntakeConfig {
    /// Directory polled for new invoice images.
    pub input_dir: PathBuf,

    /// JSON file listing already processed file names.
    pub processed_log: PathBuf,

    /// Poll interval in seconds.
    pub poll_secs: u64,

    /// Store runs whose OCR text is the placeholder.
    pub persist_placeholder_runs: bool,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("invoices"),
            processed_log: PathBuf::from("processed.json"),
            poll_secs: 5,
            persist_placeholder_runs: false,
        }
    }
}

/// Invoice database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database file.
    pub db_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("invoice.sqlite"),
        }
    }
}

/// SMTP notification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// SMTP relay host (STARTTLS).
    pub smtp_host: String,

    /// SMTP port.
    pub smtp_port: u16,

    /// Sender mailbox, also used as the SMTP login.
    pub sender: String,

    /// Name of the environment variable holding the SMTP password.
    pub password_env: String,

    /// Default subject line.
    pub subject: String,

    /// Default message body.
    pub body: String,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            smtp_host: "smtp.gmail.com".to_string(),
            smtp_port: 587,
            sender: String::new(),
            password_env: "GMAIL_APP_PASSWORD".to_string(),
            subject: "Invoice Processed".to_string(),
            body: "Your invoice has been processed successfully.".to_string(),
        }
    }
}

impl InvoxConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }

    /// Get full path to a model file.
    pub fn model_path(&self, model_name: &str) -> PathBuf {
        self.models.model_dir.join(model_name)
    }
}
