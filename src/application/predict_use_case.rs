// ============================================================
// Layer 2: Predict Use Case
// ============================================================
// The full prediction workflow for a list of utterances:
//
//   1. Align      words → subword ids + slot label mask
//   2. Run        ordered batches through the joint model
//   3. Rebuild    intent + one slot label per retained word
//
// Any failure aborts the whole run; no partial predictions are
// returned.
//
// The model directory is read once by ModelAssets (manifest,
// labels, tokenizer); the weights are loaded only for `predict`.

use std::path::PathBuf;

use anyhow::{bail, Result};
use burn::prelude::*;

use crate::data::aligner::{AlignmentConfig, WordAligner};
use crate::data::assembler::BatchAssembler;
use crate::data::example::AlignedExample;
use crate::data::reconstructor::LabelReconstructor;
use crate::domain::error::PipelineResult;
use crate::domain::labels::LabelVocab;
use crate::domain::traits::SubwordTokenizer;
use crate::domain::utterance::{Prediction, Utterance};
use crate::infra::checkpoint::{ModelCheckpoint, ModelManifest};
use crate::infra::tokenizer_store::{HfSubwordTokenizer, SpecialTokenNames, TokenizerStore};
use crate::ml::inferencer::Inferencer;
use crate::ml::joint::JointModel;
use crate::ml::model::JointTransformer;

/// Backend used by the command line.
pub type InferBackend = burn::backend::Wgpu;

/// Everything one prediction run needs, passed explicitly.
#[derive(Debug, Clone)]
pub struct PredictConfig {
    /// Utterances to label, in output order
    pub utterances:     Vec<Utterance>,
    pub model_dir:      PathBuf,
    pub batch_size:     usize,
    /// Overrides the manifest's max_seq_len; may only shrink it
    pub max_seq_len:    Option<usize>,
    pub special_tokens: SpecialTokenNames,
}

impl Default for PredictConfig {
    fn default() -> Self {
        Self {
            utterances:     Vec::new(),
            model_dir:      PathBuf::from("model"),
            batch_size:     32,
            max_seq_len:    None,
            special_tokens: SpecialTokenNames::default(),
        }
    }
}

// ─── ModelAssets ──────────────────────────────────────────────────────────────

/// Everything in the model directory except the weights.
pub struct ModelAssets {
    pub manifest:  ModelManifest,
    pub labels:    LabelVocab,
    pub tokenizer: HfSubwordTokenizer,
    pub alignment: AlignmentConfig,
}

impl ModelAssets {
    pub fn load(config: &PredictConfig) -> Result<Self> {
        let checkpoint = ModelCheckpoint::new(&config.model_dir);
        let manifest   = checkpoint.load_manifest()?;
        let labels     = checkpoint.load_labels(&manifest)?;
        let tokenizer  = TokenizerStore::new(&config.model_dir).load(&config.special_tokens)?;

        let max_seq_len = match config.max_seq_len {
            Some(len) if len > manifest.max_seq_len => bail!(
                "max_seq_len {} exceeds the model's position limit {}",
                len, manifest.max_seq_len
            ),
            Some(len) => len,
            None      => manifest.max_seq_len,
        };
        let alignment = AlignmentConfig {
            max_seq_len,
            ignore_index: manifest.ignore_index,
            ..AlignmentConfig::default()
        };

        Ok(Self { manifest, labels, tokenizer, alignment })
    }

    /// Word aligner for this model's tokenizer and settings.
    pub fn aligner(&self) -> PipelineResult<WordAligner> {
        WordAligner::new(self.alignment.clone(), self.tokenizer.special_tokens().clone())
    }

    /// Align without running the model (the `align` command).
    pub fn align(&self, utterances: &[Utterance]) -> Result<Vec<AlignedExample>> {
        Ok(self.aligner()?.align_all(utterances, &self.tokenizer)?)
    }
}

// ─── PredictUseCase ───────────────────────────────────────────────────────────

pub struct PredictUseCase<B: Backend, M: JointModel<B>, T: SubwordTokenizer> {
    tokenizer:  T,
    labels:     LabelVocab,
    aligner:    WordAligner,
    inferencer: Inferencer<B, M>,
}

impl<B: Backend, M: JointModel<B>, T: SubwordTokenizer> PredictUseCase<B, M, T> {
    pub fn new(
        model:      M,
        tokenizer:  T,
        labels:     LabelVocab,
        alignment:  AlignmentConfig,
        batch_size: usize,
        device:     B::Device,
    ) -> PipelineResult<Self> {
        let assembler = BatchAssembler::new(batch_size, alignment.max_seq_len)?;
        let aligner   = WordAligner::new(alignment, tokenizer.special_tokens().clone())?;
        let inferencer = Inferencer::new(model, device, assembler);
        Ok(Self { tokenizer, labels, aligner, inferencer })
    }

    /// One Prediction per utterance, in input order.
    pub fn predict(&self, utterances: &[Utterance]) -> PipelineResult<Vec<Prediction>> {
        // ── Step 1: Align ────────────────────────────────────────────────────
        let examples = self.aligner.align_all(utterances, &self.tokenizer)?;
        let retained: Vec<usize> = examples.iter().map(|e| e.retained_words).collect();
        let truncated = utterances
            .iter()
            .zip(&retained)
            .filter(|(u, &kept)| kept < u.len())
            .count();

        // ── Step 2: Run ──────────────────────────────────────────────────────
        let result = self.inferencer.run(&examples)?;

        // ── Step 3: Rebuild ──────────────────────────────────────────────────
        let predictions = LabelReconstructor::new(&self.labels, self.aligner.ignore_index())
            .reconstruct(&result, utterances, &retained)?;

        tracing::info!(
            "Predicted {} utterances ({} truncated)",
            predictions.len(), truncated
        );
        Ok(predictions)
    }

    /// `<intent> -> w [w:label]` lines for the given predictions.
    pub fn render(&self, predictions: &[Prediction]) -> Vec<String> {
        predictions
            .iter()
            .map(|p| p.render(self.labels.outside_label()))
            .collect()
    }
}

impl PredictUseCase<InferBackend, JointTransformer<InferBackend>, HfSubwordTokenizer> {
    /// Load tokenizer, labels and weights from `config.model_dir`.
    pub fn from_model_dir(config: &PredictConfig) -> Result<Self> {
        let assets = ModelAssets::load(config)?;
        let device = burn::backend::wgpu::WgpuDevice::default();
        let model  = ModelCheckpoint::new(&config.model_dir)
            .load_model::<InferBackend>(&assets.manifest, &assets.labels, &device)?;

        Ok(Self::new(
            model,
            assets.tokenizer,
            assets.labels,
            assets.alignment,
            config.batch_size,
            device,
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures::{one_hot, slot_rows, ScriptedModel, ScriptedSlots, TestBackend, VocabTokenizer};
    use crate::domain::error::{PipelineError, Site};
    use crate::domain::labels::DEFAULT_OUTSIDE_LABEL;

    const SEQ_LEN: usize = 16;

    fn labels() -> LabelVocab {
        LabelVocab::new(
            ["UNK", "greet", "book_flight", "pay_bill"].map(String::from).to_vec(),
            ["PAD", "UNK", "O", "B-city"].map(String::from).to_vec(),
            DEFAULT_OUTSIDE_LABEL,
        )
    }

    fn tokenizer() -> VocabTokenizer {
        VocabTokenizer::new(&["si", "pag", "##are", "book", "flight", "to", "par", "##is", "a", "##a"])
    }

    fn alignment(max_seq_len: usize) -> AlignmentConfig {
        AlignmentConfig { max_seq_len, ..AlignmentConfig::default() }
    }

    fn use_case(
        model:       ScriptedModel,
        max_seq_len: usize,
        batch_size:  usize,
    ) -> PredictUseCase<TestBackend, ScriptedModel, VocabTokenizer> {
        PredictUseCase::new(
            model,
            tokenizer(),
            labels(),
            alignment(max_seq_len),
            batch_size,
            Default::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_all_outside_renders_bare_words() {
        // [CLS] si pag ##are [SEP] ...
        let model = ScriptedModel::new(
            vec![one_hot(4, 3)],
            ScriptedSlots::Scores(vec![slot_rows(SEQ_LEN, 4, &[0, 2, 2, 0])]),
        );
        let uc = use_case(model, SEQ_LEN, 32);

        let preds = uc.predict(&[Utterance::new(["si", "pagare"])]).unwrap();
        assert_eq!(uc.render(&preds), vec!["<pay_bill> -> si pagare"]);
    }

    #[test]
    fn test_decoded_tags_bracket_slot_words() {
        // [CLS] book flight to par ##is [SEP]
        let mut tags = vec![0, 2, 2, 2, 3, 0, 0];
        tags.resize(SEQ_LEN, 0);
        let model = ScriptedModel::new(vec![one_hot(4, 2)], ScriptedSlots::Decoded(vec![tags]));
        let uc = use_case(model, SEQ_LEN, 32);

        let preds = uc.predict(&[Utterance::new(["book", "flight", "to", "paris"])]).unwrap();
        assert_eq!(uc.render(&preds), vec!["<book_flight> -> book flight to [paris:B-city]"]);
    }

    #[test]
    fn test_order_preserved_across_batches() {
        let model = ScriptedModel::new(
            vec![one_hot(4, 1), one_hot(4, 3), one_hot(4, 2)],
            ScriptedSlots::Scores(vec![
                slot_rows(SEQ_LEN, 4, &[0, 2]),
                slot_rows(SEQ_LEN, 4, &[0]),
                slot_rows(SEQ_LEN, 4, &[0, 3]),
            ]),
        );
        let uc = use_case(model, SEQ_LEN, 2);
        let utterances = vec![
            Utterance::new(["book"]),
            Utterance::new(Vec::<String>::new()),
            Utterance::new(["paris"]),
        ];

        let preds = uc.predict(&utterances).unwrap();
        assert_eq!(
            uc.render(&preds),
            vec!["<greet> -> book", "<pay_bill> -> ", "<book_flight> -> [paris:B-city]"]
        );
    }

    #[test]
    fn test_truncated_words_are_dropped() {
        // L = 4 leaves room for two subwords: [CLS] book flight [SEP]
        let model = ScriptedModel::new(
            vec![one_hot(4, 1)],
            ScriptedSlots::Scores(vec![slot_rows(4, 4, &[0, 2, 3, 0])]),
        );
        let uc = use_case(model, 4, 32);

        let preds = uc.predict(&[Utterance::new(["book", "flight", "to"])]).unwrap();
        assert_eq!(uc.render(&preds), vec!["<greet> -> book [flight:B-city]"]);
    }

    #[test]
    fn test_long_single_word_keeps_first_pieces() {
        // L = 4: [CLS] a ##a [SEP], four more ##a pieces cut
        let model = ScriptedModel::new(
            vec![one_hot(4, 1)],
            ScriptedSlots::Scores(vec![slot_rows(4, 4, &[0, 3, 0, 0])]),
        );
        let uc = use_case(model, 4, 32);

        let preds = uc.predict(&[Utterance::new(["aaaaaa"])]).unwrap();
        assert_eq!(uc.render(&preds), vec!["<greet> -> [aaaaaa:B-city]"]);
    }

    #[test]
    fn test_words_filling_exact_budget_are_all_kept() {
        // L = 6: [CLS] book flight to si [SEP], no padding left
        let model = ScriptedModel::new(
            vec![one_hot(4, 2)],
            ScriptedSlots::Decoded(vec![vec![0, 2, 2, 2, 3, 0]]),
        );
        let uc = use_case(model, 6, 32);

        let preds = uc.predict(&[Utterance::new(["book", "flight", "to", "si"])]).unwrap();
        assert_eq!(uc.render(&preds), vec!["<book_flight> -> book flight to [si:B-city]"]);
    }

    #[test]
    fn test_empty_input_yields_no_predictions() {
        let model = ScriptedModel::new(Vec::new(), ScriptedSlots::Decoded(Vec::new()));
        let uc = use_case(model, SEQ_LEN, 32);

        assert!(uc.predict(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_alignment_error_stops_before_model() {
        let model = ScriptedModel::new(Vec::new(), ScriptedSlots::Decoded(Vec::new()));
        let uc = use_case(model, SEQ_LEN, 32);

        let err = uc
            .predict(&[Utterance::new(["book"]), Utterance::new(["new york"])])
            .unwrap_err();
        assert!(matches!(err, PipelineError::Alignment { site: Site::Utterance(1), .. }));
        assert!(uc.inferencer.model().seen_batches.borrow().is_empty());
    }

    #[test]
    fn test_model_failure_aborts_run() {
        let model = ScriptedModel::new(
            vec![one_hot(4, 1), one_hot(4, 1)],
            ScriptedSlots::Scores(vec![slot_rows(SEQ_LEN, 4, &[0, 2]); 2]),
        )
        .failing_on_call(1);
        let uc = use_case(model, SEQ_LEN, 1);

        let err = uc
            .predict(&[Utterance::new(["book"]), Utterance::new(["to"])])
            .unwrap_err();
        assert!(matches!(err, PipelineError::ModelInvocation { site: Site::Batch(1), .. }));
    }

    fn write_model_dir(dir: &std::path::Path) {
        std::fs::write(
            dir.join("model_config.json"),
            r#"{"vocab_size": 8, "max_seq_len": 12, "d_model": 8, "num_heads": 2,
                "num_layers": 1, "d_ff": 16, "ignore_index": -100}"#,
        )
        .unwrap();
        std::fs::write(dir.join("intent_label.txt"), "UNK\ngreet\n").unwrap();
        std::fs::write(dir.join("slot_label.txt"), "PAD\nO\nB-city\n").unwrap();
        let tokenizer_json = serde_json::json!({
            "version": "1.0", "truncation": null, "padding": null, "added_tokens": [],
            "normalizer": null, "pre_tokenizer": { "type": "BertPreTokenizer" },
            "post_processor": null, "decoder": null,
            "model": {
                "type": "WordPiece", "unk_token": "[UNK]",
                "continuing_subword_prefix": "##", "max_input_chars_per_word": 100,
                "vocab": { "[PAD]": 0, "[UNK]": 1, "[CLS]": 2, "[SEP]": 3, "par": 4, "##is": 5 }
            }
        });
        std::fs::write(dir.join("tokenizer.json"), tokenizer_json.to_string()).unwrap();
    }

    #[test]
    fn test_assets_align_with_manifest_settings() {
        let dir = tempfile::tempdir().unwrap();
        write_model_dir(dir.path());
        let config = PredictConfig { model_dir: dir.path().to_path_buf(), ..PredictConfig::default() };

        let assets   = ModelAssets::load(&config).unwrap();
        let examples = assets.align(&[Utterance::new(["paris"])]).unwrap();
        assert_eq!(examples[0].token_ids.len(), 12);
        assert_eq!(&examples[0].token_ids[..4], &[2, 4, 5, 3]);
        assert_eq!(&examples[0].slot_label_mask[..4], &[-100, -99, -100, -100]);
    }

    #[test]
    fn test_sequence_length_override_may_only_shrink() {
        let dir = tempfile::tempdir().unwrap();
        write_model_dir(dir.path());

        let shorter = PredictConfig {
            model_dir:   dir.path().to_path_buf(),
            max_seq_len: Some(6),
            ..PredictConfig::default()
        };
        assert_eq!(ModelAssets::load(&shorter).unwrap().alignment.max_seq_len, 6);

        let longer = PredictConfig { max_seq_len: Some(13), ..shorter };
        assert!(ModelAssets::load(&longer).is_err());
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let model = ScriptedModel::new(Vec::new(), ScriptedSlots::Decoded(Vec::new()));
        let err = PredictUseCase::<TestBackend, _, _>::new(
            model,
            tokenizer(),
            labels(),
            alignment(SEQ_LEN),
            0,
            Default::default(),
        )
        .err()
        .unwrap();
        assert!(matches!(err, PipelineError::Shape { site: Site::Run, .. }));
    }
}
