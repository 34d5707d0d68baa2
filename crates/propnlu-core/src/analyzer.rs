//! The analyzer port: what a loaded model must produce for one sentence.

use thiserror::Error;

/// Per-category confidence scores, in the order the analyzer emitted them.
///
/// Order matters: it is the tie-break when two categories share the top score.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryScores(Vec<(String, f32)>);

impl CategoryScores {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, score: f32) {
        self.0.push((name.into(), score));
    }

    pub fn get(&self, name: &str) -> Option<f32> {
        self.0.iter().find(|(n, _)| n == name).map(|&(_, s)| s)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.0.iter().map(|(n, s)| (n.as_str(), *s))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, f32)> for CategoryScores {
    fn from_iter<I: IntoIterator<Item = (S, f32)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(n, s)| (n.into(), s)).collect())
    }
}

/// A tagged entity span. `start..end` are byte offsets into the analyzed text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub label: String,
    pub start: usize,
    pub end: usize,
}

/// Raw analyzer output for one sentence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Doc {
    pub cats: CategoryScores,
    pub ents: Vec<Span>,
}

#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("tokenize: {0}")]
    Tokenize(String),

    #[error("inference: {0}")]
    Inference(String),

    #[error("unexpected model output: {0}")]
    Output(String),

    #[error("analyzer lock poisoned")]
    Poisoned,
}

/// A loaded text-analysis model.
///
/// Implementations are shared across request handlers, so they must tolerate
/// concurrent calls; a model that cannot must serialize internally.
pub trait Analyzer: Send + Sync {
    fn analyze(&self, text: &str) -> Result<Doc, AnalyzerError>;
}
