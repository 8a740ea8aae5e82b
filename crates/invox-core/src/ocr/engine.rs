//! Lazily initialized, shared recognition engine handle.

use std::sync::{Arc, OnceLock};

use tracing::{info, warn};

use crate::error::OcrError;
use crate::models::config::OcrConfig;

use super::{EngineProvider, RecognitionEngine};

/// Holds the recognition engine, building it on first use.
///
/// Initialization runs at most once. Concurrent first callers block until
/// that single attempt finishes and then all see the same outcome: the
/// complete engine, or the memoized failure. A failed initialization is
/// never retried.
pub struct LazyEngine {
    provider: Box<dyn EngineProvider>,
    config: OcrConfig,
    handle: OnceLock<Result<Arc<dyn RecognitionEngine>, OcrError>>,
}

impl LazyEngine {
    /// Create an uninitialized handle.
    pub fn new(provider: impl EngineProvider + 'static, config: OcrConfig) -> Self {
        Self {
            provider: Box::new(provider),
            config,
            handle: OnceLock::new(),
        }
    }

    /// Get the engine, initializing it on the first call.
    pub fn acquire(&self) -> Result<Arc<dyn RecognitionEngine>, OcrError> {
        self.handle
            .get_or_init(|| {
                info!(
                    languages = ?self.config.languages,
                    use_gpu = self.config.use_gpu,
                    "Initializing recognition engine"
                );
                match self.provider.initialize(&self.config) {
                    Ok(engine) => Ok(Arc::from(engine)),
                    Err(e) => {
                        warn!(error = %e, "Recognition engine unavailable, OCR will use placeholder text");
                        Err(e)
                    }
                }
            })
            .clone()
    }

    /// True once an initialization attempt has completed, successful or not.
    pub fn is_initialized(&self) -> bool {
        self.handle.get().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    struct EchoEngine;

    impl RecognitionEngine for EchoEngine {
        fn recognize(&self, _path: &Path) -> Result<Vec<String>, OcrError> {
            Ok(vec!["hello".to_string()])
        }
    }

    struct CountingProvider {
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    impl EngineProvider for CountingProvider {
        fn initialize(&self, _config: &OcrConfig) -> Result<Box<dyn RecognitionEngine>, OcrError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(20));
            if self.fail {
                Err(OcrError::ModelLoad("no models".to_string()))
            } else {
                Ok(Box::new(EchoEngine))
            }
        }
    }

    #[test]
    fn test_initializes_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let engine = LazyEngine::new(
            CountingProvider { calls: calls.clone(), fail: false },
            OcrConfig::default(),
        );

        assert!(!engine.is_initialized());
        assert!(engine.acquire().is_ok());
        assert!(engine.acquire().is_ok());
        assert!(engine.is_initialized());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failure_is_memoized() {
        let calls = Arc::new(AtomicUsize::new(0));
        let engine = LazyEngine::new(
            CountingProvider { calls: calls.clone(), fail: true },
            OcrConfig::default(),
        );

        for _ in 0..3 {
            assert!(matches!(engine.acquire(), Err(OcrError::ModelLoad(_))));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_concurrent_acquire_single_initialization() {
        let calls = Arc::new(AtomicUsize::new(0));
        let engine = Arc::new(LazyEngine::new(
            CountingProvider { calls: calls.clone(), fail: false },
            OcrConfig::default(),
        ));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let engine = engine.clone();
                thread::spawn(move || {
                    let handle = engine.acquire().unwrap();
                    handle.recognize(Path::new("unused.png")).unwrap()
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), vec!["hello".to_string()]);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
