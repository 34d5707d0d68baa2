//! ONNX Runtime analyzer for joint intent classification and entity tagging.
//!
//! The model directory must contain `model.onnx`, `tokenizer.json` and
//! `labels.json`. The graph takes `input_ids` and `attention_mask` (plus
//! `token_type_ids` when declared) and emits `cats` (`[1, n_cats]`) and/or
//! `ner` (`[1, seq_len, n_tags]`).

use std::path::Path;
use std::sync::Mutex;

use ort::session::Session;
use ort::value::Tensor;
use propnlu_core::{Analyzer, AnalyzerError, CategoryScores, Doc};
use tokenizers::Tokenizer;
use tracing::{debug, info};

use crate::labels::LabelConfig;
use crate::tags::{Tag, decode_tags};

const CATS_OUTPUT: &str = "cats";
const NER_OUTPUT: &str = "ner";

/// Intent + entity analyzer backed by a single ONNX session.
///
/// `Session::run` needs exclusive access, so calls are serialized on a mutex.
/// Tokenization happens outside the lock.
pub struct OnnxAnalyzer {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    labels: LabelConfig,
    tags: Vec<Tag>,
    has_cats: bool,
    has_ner: bool,
    uses_type_ids: bool,
}

impl OnnxAnalyzer {
    /// Load a model from a directory containing `model.onnx`, `tokenizer.json`
    /// and `labels.json`.
    pub fn load(model_dir: &Path) -> anyhow::Result<Self> {
        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");
        let labels_path = model_dir.join("labels.json");

        anyhow::ensure!(model_path.exists(), "model.onnx not found in {model_dir:?}");
        anyhow::ensure!(
            tokenizer_path.exists(),
            "tokenizer.json not found in {model_dir:?}"
        );
        anyhow::ensure!(labels_path.exists(), "labels.json not found in {model_dir:?}");

        let labels = LabelConfig::from_path(&labels_path)?;
        let session = Session::builder()?.commit_from_file(&model_path)?;

        let has_cats = session.outputs().iter().any(|o| o.name() == CATS_OUTPUT);
        let has_ner = session.outputs().iter().any(|o| o.name() == NER_OUTPUT);
        anyhow::ensure!(
            has_cats || has_ner,
            "model declares neither a '{CATS_OUTPUT}' nor a '{NER_OUTPUT}' output"
        );
        let uses_type_ids = session
            .inputs()
            .iter()
            .any(|i| i.name() == "token_type_ids");

        // Static output widths, when the graph declares them, must match labels.json.
        for output in session.outputs() {
            let expected = match output.name() {
                CATS_OUTPUT => labels.cats.len(),
                NER_OUTPUT => labels.tags.len(),
                _ => continue,
            };
            if let Some(width) = infer_width(output.dtype()) {
                anyhow::ensure!(
                    width == expected,
                    "output '{}' has width {width}, labels.json lists {expected}",
                    output.name()
                );
            }
        }

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("load tokenizer: {e}"))?;
        tokenizer
            .with_truncation(Some(tokenizers::TruncationParams {
                max_length: labels.max_length,
                ..Default::default()
            }))
            .map_err(|e| anyhow::anyhow!("set truncation: {e}"))?;
        // Single-sentence inference never needs padding.
        tokenizer.with_padding(None);

        info!(
            model = %model_path.display(),
            cats = labels.cats.len(),
            entity_labels = labels.entity_labels().len(),
            has_cats,
            has_ner,
            "loaded analyzer model"
        );

        let tags = labels.parsed_tags();
        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            labels,
            tags,
            has_cats,
            has_ner,
            uses_type_ids,
        })
    }

    pub fn labels(&self) -> &LabelConfig {
        &self.labels
    }

    /// Run the session, returning raw category logits and per-token tag indices.
    fn run(
        &self,
        input_ids: Vec<i64>,
        attention_mask: Vec<i64>,
        type_ids: Vec<i64>,
    ) -> Result<(Vec<f32>, Vec<usize>), AnalyzerError> {
        let seq_len = input_ids.len();
        let shape = [1i64, seq_len as i64];

        let ids_tensor =
            Tensor::from_array((shape, input_ids.into_boxed_slice())).map_err(ort_err)?;
        let mask_tensor =
            Tensor::from_array((shape, attention_mask.into_boxed_slice())).map_err(ort_err)?;

        let mut session = self.session.lock().map_err(|_| AnalyzerError::Poisoned)?;

        let run_result = if self.uses_type_ids {
            let type_tensor =
                Tensor::from_array((shape, type_ids.into_boxed_slice())).map_err(ort_err)?;
            session.run(ort::inputs![
                "input_ids" => ids_tensor,
                "attention_mask" => mask_tensor,
                "token_type_ids" => type_tensor,
            ])
        } else {
            session.run(ort::inputs![
                "input_ids" => ids_tensor,
                "attention_mask" => mask_tensor,
            ])
        };
        let outputs = run_result.map_err(ort_err)?;

        let mut cat_logits = Vec::new();
        if self.has_cats {
            let (cats_shape, cats_data) = outputs[CATS_OUTPUT]
                .try_extract_tensor::<f32>()
                .map_err(ort_err)?;
            let dims: &[i64] = cats_shape;
            let n_cats = self.labels.cats.len();
            if dims.last().copied() != Some(n_cats as i64) || cats_data.len() != n_cats {
                return Err(AnalyzerError::Output(format!(
                    "cats shape {dims:?}, expected [1, {n_cats}]"
                )));
            }
            cat_logits.extend_from_slice(cats_data);
        }

        let mut tag_ids = Vec::new();
        if self.has_ner {
            let (ner_shape, ner_data) = outputs[NER_OUTPUT]
                .try_extract_tensor::<f32>()
                .map_err(ort_err)?;
            let dims: &[i64] = ner_shape;
            let n_tags = self.tags.len();
            if dims.len() != 3 || dims[1] as usize != seq_len || dims[2] as usize != n_tags {
                return Err(AnalyzerError::Output(format!(
                    "ner shape {dims:?}, expected [1, {seq_len}, {n_tags}]"
                )));
            }
            tag_ids = ner_data.chunks_exact(n_tags).map(argmax).collect();
        }

        Ok((cat_logits, tag_ids))
    }
}

impl Analyzer for OnnxAnalyzer {
    fn analyze(&self, text: &str) -> Result<Doc, AnalyzerError> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| AnalyzerError::Tokenize(e.to_string()))?;

        let input_ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
        let attention_mask: Vec<i64> = encoding
            .get_attention_mask()
            .iter()
            .map(|&m| m as i64)
            .collect();
        let type_ids: Vec<i64> = encoding.get_type_ids().iter().map(|&t| t as i64).collect();

        let (cat_logits, tag_ids) = self.run(input_ids, attention_mask, type_ids)?;

        let scores = self.labels.cats_activation.apply(&cat_logits);
        let cats: CategoryScores = self
            .labels
            .cats
            .iter()
            .cloned()
            .zip(scores)
            .collect();

        // Special tokens get a zero-width range so the decoder skips them.
        let offsets: Vec<(usize, usize)> = encoding
            .get_offsets()
            .iter()
            .zip(encoding.get_special_tokens_mask())
            .map(|(&offset, &special)| if special == 1 { (0, 0) } else { offset })
            .collect();
        let tags: Vec<&Tag> = tag_ids.iter().map(|&i| &self.tags[i]).collect();
        let ents = decode_tags(text, &tags, &offsets);

        debug!(
            tokens = offsets.len(),
            cats = cats.len(),
            ents = ents.len(),
            "analyzed sentence"
        );
        Ok(Doc { cats, ents })
    }
}

fn ort_err(e: ort::Error) -> AnalyzerError {
    AnalyzerError::Inference(e.to_string())
}

/// Index of the largest value; the first one wins ties.
fn argmax(row: &[f32]) -> usize {
    let mut best = 0;
    for (i, &v) in row.iter().enumerate() {
        if v > row[best] {
            best = i;
        }
    }
    best
}

/// Try to read a static last dimension from an ONNX output type.
fn infer_width(output_type: &ort::value::ValueType) -> Option<usize> {
    match output_type {
        ort::value::ValueType::Tensor { shape, .. } => shape
            .last()
            .and_then(|&d| if d > 0 { Some(d as usize) } else { None }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn model_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("models")
            .join("real_estate_model")
    }

    fn require_model() -> PathBuf {
        let dir = model_dir();
        if !dir.join("model.onnx").exists() {
            panic!(
                "Model not found. Export the trained model to:\n  \
                 models/real_estate_model/{{model.onnx,tokenizer.json,labels.json}}"
            );
        }
        dir
    }

    #[test]
    fn argmax_first_wins_ties() {
        assert_eq!(argmax(&[0.1, 0.7, 0.7]), 1);
        assert_eq!(argmax(&[2.0]), 0);
        assert_eq!(argmax(&[-1.0, -0.5, -3.0]), 1);
    }

    #[test]
    fn load_reports_missing_files() {
        let dir = std::env::temp_dir().join("propnlu-missing-model");
        let err = OnnxAnalyzer::load(&dir).err().unwrap();
        assert!(err.to_string().contains("model.onnx not found"));
    }

    #[test]
    #[ignore] // requires models/real_estate_model
    fn load_model() {
        let dir = require_model();
        let analyzer = OnnxAnalyzer::load(&dir).unwrap();
        assert!(!analyzer.labels().tags.is_empty());
    }

    #[test]
    #[ignore] // requires models/real_estate_model
    fn analyze_scores_every_category() {
        let dir = require_model();
        let analyzer = OnnxAnalyzer::load(&dir).unwrap();
        let doc = analyzer.analyze("3 bedroom house in Springfield").unwrap();
        assert_eq!(doc.cats.len(), analyzer.labels().cats.len());
        for span in &doc.ents {
            assert_eq!(
                &"3 bedroom house in Springfield"[span.start..span.end],
                span.text
            );
        }
    }

    #[test]
    #[ignore] // requires models/real_estate_model
    fn analyze_is_deterministic() {
        let dir = require_model();
        let analyzer = OnnxAnalyzer::load(&dir).unwrap();
        let a = analyzer.analyze("2+1 flat for rent in Izmir").unwrap();
        let b = analyzer.analyze("2+1 flat for rent in Izmir").unwrap();
        assert_eq!(a, b);
    }
}
