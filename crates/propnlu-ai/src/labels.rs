//! Label metadata shipped alongside the model as `labels.json`.
//!
//! The file names the intent categories in output order, the entity tag set in
//! output order, and how the category logits are turned into scores:
//!
//! ```json
//! {
//!   "cats": ["buy", "rent"],
//!   "tags": ["O", "B-LOCATION", "I-LOCATION", "U-PROPERTY_SIZE"],
//!   "cats_activation": "softmax",
//!   "max_length": 256
//! }
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::tags::Tag;

const DEFAULT_MAX_LENGTH: usize = 256;

#[derive(Debug, Error)]
pub enum LabelConfigError {
    #[error("read {}: {source}", path.display())]
    Io {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[error("parse labels: {0}")]
    Json(#[from] serde_json::Error),

    #[error("tag set is empty")]
    NoTags,

    #[error("duplicate category: {0}")]
    DuplicateCategory(String),

    #[error("max_length must be positive")]
    ZeroMaxLength,
}

/// How raw category logits become confidence scores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    /// Independent per-category probabilities (multi-label textcat).
    #[default]
    Sigmoid,
    /// Mutually exclusive categories.
    Softmax,
    /// The model already emits probabilities.
    #[serde(rename = "none")]
    Identity,
}

impl Activation {
    pub fn apply(self, logits: &[f32]) -> Vec<f32> {
        match self {
            Self::Sigmoid => logits.iter().map(|&x| 1.0 / (1.0 + (-x).exp())).collect(),
            Self::Softmax => softmax(logits),
            Self::Identity => logits.to_vec(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LabelConfig {
    pub cats: Vec<String>,
    pub tags: Vec<String>,
    #[serde(default)]
    pub cats_activation: Activation,
    #[serde(default = "default_max_length")]
    pub max_length: usize,
}

fn default_max_length() -> usize {
    DEFAULT_MAX_LENGTH
}

impl LabelConfig {
    pub fn from_path(path: &Path) -> Result<Self, LabelConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| LabelConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, LabelConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), LabelConfigError> {
        if self.tags.is_empty() {
            return Err(LabelConfigError::NoTags);
        }
        if self.max_length == 0 {
            return Err(LabelConfigError::ZeroMaxLength);
        }
        let mut seen = HashSet::new();
        for cat in &self.cats {
            if !seen.insert(cat.as_str()) {
                return Err(LabelConfigError::DuplicateCategory(cat.clone()));
            }
        }
        Ok(())
    }

    /// Parse every tag string, in output order.
    pub fn parsed_tags(&self) -> Vec<Tag> {
        self.tags.iter().map(|t| Tag::parse(t)).collect()
    }

    /// Distinct entity labels, ignoring prefixes and `O`.
    pub fn entity_labels(&self) -> Vec<&str> {
        let mut labels: Vec<&str> = Vec::new();
        for tag in &self.tags {
            if let Some(label) = Tag::label_of(tag)
                && !labels.contains(&label)
            {
                labels.push(label);
            }
        }
        labels
    }
}

fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&x| (x - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    if sum > 0.0 {
        exps.into_iter().map(|e| e / sum).collect()
    } else {
        exps
    }
}
