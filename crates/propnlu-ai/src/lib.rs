//! AI inference layer: ONNX Runtime model that scores intents and tags entities.

pub mod labels;
pub mod tags;

#[cfg(feature = "onnx")]
mod onnx;
#[cfg(feature = "onnx")]
pub use onnx::OnnxAnalyzer;

pub use labels::{Activation, LabelConfig, LabelConfigError};
pub use tags::{Tag, decode_tags};
