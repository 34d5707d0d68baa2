//! Shared, read-only state handed to every request handler.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use propnlu_core::Analyzer;
use tracing::{error, info};

/// The analyzer as loaded at startup.
///
/// A failed load does not stop the process: the server keeps serving `/` and
/// `/health` and answers `/predict` with a 500.
#[derive(Clone)]
pub enum ModelState {
    Ready(Arc<dyn Analyzer>),
    Unavailable { reason: Arc<str> },
}

impl ModelState {
    /// Load the model in `model_dir` once, logging the outcome.
    pub fn load(model_dir: &Path) -> Self {
        match load_analyzer(model_dir) {
            Ok(analyzer) => {
                info!(model_dir = %model_dir.display(), "model loaded successfully");
                Self::Ready(analyzer)
            }
            Err(e) => {
                let reason = format!("{e:#}");
                error!(
                    model_dir = %model_dir.display(),
                    error = %reason,
                    "model could not be loaded, /predict will answer 500"
                );
                Self::Unavailable {
                    reason: reason.into(),
                }
            }
        }
    }

    pub fn analyzer(&self) -> Option<Arc<dyn Analyzer>> {
        match self {
            Self::Ready(analyzer) => Some(Arc::clone(analyzer)),
            Self::Unavailable { .. } => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

#[cfg(feature = "onnx")]
fn load_analyzer(model_dir: &Path) -> anyhow::Result<Arc<dyn Analyzer>> {
    let analyzer = propnlu_ai::OnnxAnalyzer::load(model_dir)?;
    Ok(Arc::new(analyzer))
}

#[cfg(not(feature = "onnx"))]
fn load_analyzer(_model_dir: &Path) -> anyhow::Result<Arc<dyn Analyzer>> {
    anyhow::bail!("built without the `onnx` feature, no analyzer backend available")
}

#[derive(Clone)]
pub struct AppState {
    pub model: ModelState,
    pub model_dir: Arc<str>,
    pub timeout: Duration,
}

impl AppState {
    pub fn new(model: ModelState, model_dir: &Path, timeout: Duration) -> Self {
        Self {
            model,
            model_dir: model_dir.display().to_string().into(),
            timeout,
        }
    }
}
