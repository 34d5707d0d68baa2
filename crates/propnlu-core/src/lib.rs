pub mod analysis;
pub mod analyzer;
pub mod inference;

pub use analysis::{AnalysisRequest, AnalysisResponse, EntityMention, IntentResult};
pub use analyzer::{Analyzer, AnalyzerError, CategoryScores, Doc, Span};
pub use inference::{analyze, build_response, format_score, select_intent};
