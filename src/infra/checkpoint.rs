// ============================================================
// Layer 6: Model Checkpoint
// ============================================================
// Restores a trained joint model from its directory.
//
// Layout of a model directory:
//
//   model_dir/
//     model_config.json   ← architecture + alignment settings
//     model.mpk.gz        ← weights (Burn CompactRecorder)
//     intent_label.txt    ← one intent label per line, line i = id i
//     slot_label.txt      ← one slot label per line, line i = id i
//     tokenizer.json      ← read by TokenizerStore
//
// The head sizes are not stored in the manifest: they are the
// lengths of the two label files, so the heads always match the
// vocabularies that decode them.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use std::{fs, path::PathBuf};

use anyhow::{bail, Context, Result};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};
use serde::{Deserialize, Serialize};

use crate::domain::labels::{LabelVocab, DEFAULT_OUTSIDE_LABEL};
use crate::ml::model::{JointTransformer, JointTransformerConfig};

pub const MANIFEST_FILE: &str = "model_config.json";
/// Without extension; the recorder appends `.mpk.gz`.
pub const WEIGHTS_FILE: &str = "model";

fn default_type_vocab_size() -> usize { 2 }
fn default_true() -> bool { true }
fn default_intent_label_file() -> String { "intent_label.txt".to_string() }
fn default_slot_label_file() -> String { "slot_label.txt".to_string() }
fn default_outside_label() -> String { DEFAULT_OUTSIDE_LABEL.to_string() }

/// Contents of `model_config.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelManifest {
    pub vocab_size:  usize,
    pub max_seq_len: usize,
    pub d_model:     usize,
    pub num_heads:   usize,
    pub num_layers:  usize,
    pub d_ff:        usize,
    #[serde(default = "default_type_vocab_size")]
    pub type_vocab_size: usize,
    #[serde(default)]
    pub use_crf: bool,
    #[serde(default = "default_true")]
    pub use_segment_ids: bool,
    /// Sentinel the model was trained with for non-first subwords
    #[serde(default)]
    pub ignore_index: i64,
    #[serde(default = "default_intent_label_file")]
    pub intent_label_file: String,
    #[serde(default = "default_slot_label_file")]
    pub slot_label_file: String,
    #[serde(default = "default_outside_label")]
    pub outside_label: String,
}

impl ModelManifest {
    /// Architecture config with head sizes taken from the label vocabulary.
    pub fn model_config(&self, labels: &LabelVocab) -> JointTransformerConfig {
        JointTransformerConfig::new(
            self.vocab_size,
            self.max_seq_len,
            self.d_model,
            self.num_heads,
            self.num_layers,
            self.d_ff,
            labels.intent_count(),
            labels.slot_count(),
        )
        .with_type_vocab_size(self.type_vocab_size)
        .with_use_crf(self.use_crf)
        .with_use_segment_ids(self.use_segment_ids)
    }
}

pub struct ModelCheckpoint {
    dir: PathBuf,
}

impl ModelCheckpoint {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn load_manifest(&self) -> Result<ModelManifest> {
        let path = self.dir.join(MANIFEST_FILE);
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read model manifest '{}'", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Malformed model manifest '{}'", path.display()))
    }

    /// Intent and slot vocabularies named by the manifest.
    pub fn load_labels(&self, manifest: &ModelManifest) -> Result<LabelVocab> {
        let intents = self.read_labels(&manifest.intent_label_file)?;
        let slots   = self.read_labels(&manifest.slot_label_file)?;
        tracing::info!("Loaded {} intent labels, {} slot labels", intents.len(), slots.len());
        Ok(LabelVocab::new(intents, slots, manifest.outside_label.clone()))
    }

    /// Build the architecture from the manifest and restore its weights.
    pub fn load_model<B: Backend>(
        &self,
        manifest: &ModelManifest,
        labels:   &LabelVocab,
        device:   &B::Device,
    ) -> Result<JointTransformer<B>> {
        let model = manifest.model_config(labels).init::<B>(device);
        let path  = self.dir.join(WEIGHTS_FILE);

        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| {
                format!("Cannot load model weights '{}.mpk.gz'", path.display())
            })?;

        tracing::info!(
            "Loaded model from '{}' (crf={}, segment_ids={})",
            self.dir.display(), manifest.use_crf, manifest.use_segment_ids
        );
        Ok(model.load_record(record))
    }

    fn read_labels(&self, file: &str) -> Result<Vec<String>> {
        let path = self.dir.join(file);
        let text = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read label file '{}'", path.display()))?;
        let labels: Vec<String> = text.lines().map(|l| l.trim().to_string()).collect();
        if labels.is_empty() {
            bail!("Label file '{}' is empty", path.display());
        }
        Ok(labels)
    }
}
