//! Wire types for the `/predict` endpoint.

use serde::{Deserialize, Serialize};

/// Body of a `POST /predict` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub sentence: String,
}

impl AnalysisRequest {
    /// The sentence, or `None` when it is empty.
    pub fn sentence(&self) -> Option<&str> {
        if self.sentence.is_empty() {
            None
        } else {
            Some(&self.sentence)
        }
    }
}

/// The winning category for a sentence.
///
/// `score` is pre-formatted with two decimal places; it is a display value,
/// not something to compute with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentResult {
    pub name: String,
    pub score: String,
}

/// A labelled substring of the input sentence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMention {
    pub text: String,
    pub label: String,
}

/// Response body of a successful `POST /predict`.
///
/// `intent` serializes as `null` when the analyzer produced no category scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub sentence: String,
    pub intent: Option<IntentResult>,
    pub entities: Vec<EntityMention>,
}
