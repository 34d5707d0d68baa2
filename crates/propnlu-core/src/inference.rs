//! Intent selection and entity projection over analyzer output.

use tracing::info;

use crate::analysis::{AnalysisResponse, EntityMention, IntentResult};
use crate::analyzer::{Analyzer, AnalyzerError, CategoryScores, Doc};

/// Run `analyzer` on `sentence` and shape its output into a response.
pub fn analyze(sentence: &str, analyzer: &dyn Analyzer) -> Result<AnalysisResponse, AnalyzerError> {
    info!(sentence, "received sentence");
    let doc = analyzer.analyze(sentence)?;
    Ok(build_response(sentence, doc))
}

/// Shape a [`Doc`] into the response for `sentence`.
pub fn build_response(sentence: &str, doc: Doc) -> AnalysisResponse {
    let intent = select_intent(&doc.cats).map(|(name, score)| IntentResult {
        name: name.to_string(),
        score: format_score(score),
    });

    let entities = doc
        .ents
        .into_iter()
        .map(|span| EntityMention {
            text: span.text,
            label: span.label,
        })
        .collect();

    AnalysisResponse {
        sentence: sentence.to_string(),
        intent,
        entities,
    }
}

/// Pick the highest-scoring category.
///
/// Ties go to the earliest category: a later one must be strictly greater to
/// replace the current best. NaN scores are never selected.
pub fn select_intent(cats: &CategoryScores) -> Option<(&str, f32)> {
    let mut best: Option<(&str, f32)> = None;

    for (name, score) in cats.iter() {
        if score.is_nan() {
            continue;
        }
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((name, score)),
        }
    }

    best
}

/// Format a score with exactly two decimal places.
pub fn format_score(score: f32) -> String {
    format!("{score:.2}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::Span;

    struct Fixed(Doc);

    impl Analyzer for Fixed {
        fn analyze(&self, _text: &str) -> Result<Doc, AnalyzerError> {
            Ok(self.0.clone())
        }
    }

    struct Broken;

    impl Analyzer for Broken {
        fn analyze(&self, _text: &str) -> Result<Doc, AnalyzerError> {
            Err(AnalyzerError::Inference("session exploded".into()))
        }
    }

    fn span(text: &str, label: &str, start: usize) -> Span {
        Span {
            text: text.into(),
            label: label.into(),
            start,
            end: start + text.len(),
        }
    }

    #[test]
    fn springfield_scenario() {
        let sentence = "3 bedroom house in Springfield";
        let doc = Doc {
            cats: [("buy", 0.91), ("rent", 0.09)].into_iter().collect(),
            ents: vec![
                span("3 bedroom", "PROPERTY_SIZE", 0),
                span("Springfield", "LOCATION", 19),
            ],
        };

        let resp = analyze(sentence, &Fixed(doc)).unwrap();
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "sentence": "3 bedroom house in Springfield",
                "intent": {"name": "buy", "score": "0.91"},
                "entities": [
                    {"text": "3 bedroom", "label": "PROPERTY_SIZE"},
                    {"text": "Springfield", "label": "LOCATION"}
                ]
            })
        );
    }

    #[test]
    fn empty_scores_give_no_intent() {
        let resp = build_response("hi", Doc::default());
        assert!(resp.intent.is_none());
        assert!(resp.entities.is_empty());
        assert_eq!(resp.sentence, "hi");
    }

    #[test]
    fn tie_goes_to_first_category() {
        let cats: CategoryScores = [("rent", 0.5), ("buy", 0.5), ("sell", 0.2)]
            .into_iter()
            .collect();
        assert_eq!(select_intent(&cats), Some(("rent", 0.5)));
    }

    #[test]
    fn later_strictly_greater_wins() {
        let cats: CategoryScores = [("rent", 0.3), ("buy", 0.31)].into_iter().collect();
        assert_eq!(select_intent(&cats).map(|(n, _)| n), Some("buy"));
    }

    #[test]
    fn nan_scores_are_skipped() {
        let cats: CategoryScores = [("rent", f32::NAN), ("buy", 0.1)].into_iter().collect();
        assert_eq!(select_intent(&cats).map(|(n, _)| n), Some("buy"));

        let all_nan: CategoryScores = [("rent", f32::NAN)].into_iter().collect();
        assert!(select_intent(&all_nan).is_none());
    }

    #[test]
    fn negative_scores_still_select() {
        let cats: CategoryScores = [("rent", -2.0), ("buy", -1.5)].into_iter().collect();
        assert_eq!(select_intent(&cats).map(|(n, _)| n), Some("buy"));
    }

    #[test]
    fn score_has_two_decimals() {
        assert_eq!(format_score(0.873), "0.87");
        assert_eq!(format_score(0.91), "0.91");
        assert_eq!(format_score(1.0), "1.00");
        assert_eq!(format_score(0.0), "0.00");
        assert_eq!(format_score(0.999), "1.00");
    }

    #[test]
    fn entity_order_is_preserved() {
        let doc = Doc {
            cats: CategoryScores::new(),
            ents: vec![
                span("Izmir", "LOCATION", 20),
                span("2+1", "PROPERTY_SIZE", 0),
                span("Izmir", "LOCATION", 40),
            ],
        };
        let resp = build_response("whatever", doc);
        let labels: Vec<&str> = resp.entities.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, ["LOCATION", "PROPERTY_SIZE", "LOCATION"]);
        assert_eq!(resp.entities[1].text, "2+1");
    }

    #[test]
    fn analyzer_error_propagates() {
        let err = analyze("anything", &Broken).unwrap_err();
        assert!(matches!(err, AnalyzerError::Inference(_)));
    }
}
