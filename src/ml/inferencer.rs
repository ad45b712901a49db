// ============================================================
// Layer 5: Inferencer (Inference Runner)
// ============================================================
// Drives a JointModel over the assembled batches, one blocking call
// per batch, strictly in order, and appends every output to a
// single BatchResult:
//
//   batch 0 → rows 0..n0
//   batch 1 → rows n0..n0+n1
//   ...
//
// The slot variant (raw scores vs. decoded tags) is read from the
// model once, before the first batch. Any failure (model error,
// wrong output shape, wrong variant) aborts the run; the partially
// filled result is dropped with the error.

use anyhow::Error;
use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::assembler::BatchAssembler;
use crate::data::batcher::SlotBatcher;
use crate::data::example::AlignedExample;
use crate::domain::error::{PipelineError, PipelineResult, Site};
use crate::ml::joint::{JointInput, JointModel, SlotDecoding, SlotOutput};

/// Index of the largest score; ties go to the lowest index.
/// The runner rejects NaN scores before they get here.
pub fn argmax(scores: &[f32]) -> Option<usize> {
    scores
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (i, &s)| match best {
            Some((_, b)) if s <= b => best,
            _ => Some((i, s)),
        })
        .map(|(i, _)| i)
}

// ─── BatchResult ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum SlotPredictions {
    /// `[example][position][tag]` scores
    Raw(Vec<Vec<Vec<f32>>>),
    /// `[example][position]` tag ids
    Decoded(Vec<Vec<usize>>),
}

/// Everything the model said about a run, row i = utterance i.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResult {
    pub intent_scores:   Vec<Vec<f32>>,
    pub slots:           SlotPredictions,
    /// Copied through from the batches, unchanged
    pub slot_label_mask: Vec<Vec<i64>>,
}

impl BatchResult {
    fn with_capacity(decoding: SlotDecoding, examples: usize) -> Self {
        let slots = match decoding {
            SlotDecoding::Raw     => SlotPredictions::Raw(Vec::with_capacity(examples)),
            SlotDecoding::Viterbi => SlotPredictions::Decoded(Vec::with_capacity(examples)),
        };
        Self {
            intent_scores:   Vec::with_capacity(examples),
            slots,
            slot_label_mask: Vec::with_capacity(examples),
        }
    }

    pub fn len(&self) -> usize {
        self.intent_scores.len()
    }

    /// Predicted intent id per example.
    pub fn intent_ids(&self) -> Vec<usize> {
        self.intent_scores
            .iter()
            .map(|scores| argmax(scores).unwrap_or(0))
            .collect()
    }

    /// Predicted tag id per example and position. Raw scores are reduced
    /// by argmax; decoded tags pass through.
    pub fn slot_tag_ids(&self) -> Vec<Vec<usize>> {
        match &self.slots {
            SlotPredictions::Raw(rows) => rows
                .iter()
                .map(|positions| {
                    positions.iter().map(|s| argmax(s).unwrap_or(0)).collect()
                })
                .collect(),
            SlotPredictions::Decoded(rows) => rows.clone(),
        }
    }
}

// ─── Inferencer ───────────────────────────────────────────────────────────────

pub struct Inferencer<B: Backend, M: JointModel<B>> {
    model:     M,
    batcher:   SlotBatcher<B>,
    assembler: BatchAssembler,
}

impl<B: Backend, M: JointModel<B>> Inferencer<B, M> {
    pub fn new(model: M, device: B::Device, assembler: BatchAssembler) -> Self {
        Self { model, batcher: SlotBatcher::new(device), assembler }
    }

    #[cfg(test)]
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Score every example, preserving input order.
    pub fn run(&self, examples: &[AlignedExample]) -> PipelineResult<BatchResult> {
        let decoding = self.model.slot_decoding();
        let batches  = self.assembler.assemble(examples)?;
        tracing::info!(
            "Running inference: {} examples in {} batches (decoding={:?})",
            examples.len(), batches.len(), decoding
        );

        let mut result       = BatchResult::with_capacity(decoding, examples.len());
        let mut intent_width = None;

        for batch in &batches {
            let site  = Site::Batch(batch.index);
            let slot_batch = self.batcher.batch(batch.examples.to_vec());
            let n       = slot_batch.len();
            let seq_len = slot_batch.seq_len();

            // ── Model call ───────────────────────────────────────────────────
            let input = JointInput {
                input_ids:      slot_batch.input_ids,
                attention_mask: slot_batch.attention_mask,
                segment_ids:    self.model.expects_segment_ids().then_some(slot_batch.segment_ids),
            };
            let output = self
                .model
                .forward(input)
                .map_err(|e| invocation(site, e))?;

            // ── Intent scores [n, num_intents] ───────────────────────────────
            let [rows, width] = output.intent_logits.dims();
            if rows != n {
                return Err(shape_mismatch(site, "intent logits rows", n, rows));
            }
            if width == 0 || intent_width.is_some_and(|w| w != width) {
                return Err(shape_mismatch(
                    site,
                    "intent logits width",
                    intent_width.unwrap_or(1),
                    width,
                ));
            }
            intent_width = Some(width);
            let intents = float_values(output.intent_logits, site)?;
            reject_nan(&intents, "intent logits", site)?;

            // ── Slot output ──────────────────────────────────────────────────
            match (&mut result.slots, output.slots) {
                (SlotPredictions::Raw(acc), SlotOutput::Scores(scores)) => {
                    let [rows, len, tags] = scores.dims();
                    if rows != n || len != seq_len || tags == 0 {
                        return Err(PipelineError::model_invocation(
                            site,
                            format!("slot logits shape [{rows}, {len}, {tags}], expected [{n}, {seq_len}, _]"),
                        ));
                    }
                    let flat = float_values(scores, site)?;
                    reject_nan(&flat, "slot logits", site)?;
                    acc.extend(flat.chunks(seq_len * tags).map(|example| {
                        example.chunks(tags).map(<[f32]>::to_vec).collect::<Vec<_>>()
                    }));
                }
                (SlotPredictions::Decoded(acc), SlotOutput::Decoded(tags)) => {
                    if tags.len() != n {
                        return Err(shape_mismatch(site, "decoded tag sequences", n, tags.len()));
                    }
                    if let Some(row) = tags.iter().find(|row| row.len() != seq_len) {
                        return Err(shape_mismatch(site, "decoded tag sequence length", seq_len, row.len()));
                    }
                    acc.extend(tags);
                }
                _ => {
                    return Err(PipelineError::model_invocation(
                        site,
                        format!("slot output variant does not match decoding mode {decoding:?}"),
                    ));
                }
            }

            result.intent_scores.extend(intents.chunks(width).map(<[f32]>::to_vec));
            result.slot_label_mask.extend(slot_batch.slot_label_mask);

            tracing::debug!(
                "Batch {} done: examples {}..{}",
                batch.index, batch.offset, batch.offset + batch.len()
            );
        }

        Ok(result)
    }
}

fn invocation(site: Site, e: Error) -> PipelineError {
    PipelineError::model_invocation(site, format!("{e:#}"))
}

fn shape_mismatch(site: Site, what: &str, expected: usize, found: usize) -> PipelineError {
    PipelineError::model_invocation(
        site,
        format!("{what}: expected {expected}, found {found}"),
    )
}

/// NaN scores are a model failure, never an argmax candidate.
fn reject_nan(values: &[f32], what: &str, site: Site) -> PipelineResult<()> {
    match values.iter().position(|v| v.is_nan()) {
        Some(at) => Err(PipelineError::model_invocation(
            site,
            format!("{what} contain NaN at flat index {at}"),
        )),
        None => Ok(()),
    }
}

fn float_values<const D: usize, B: Backend>(t: Tensor<B, D>, site: Site) -> PipelineResult<Vec<f32>> {
    t.into_data()
        .convert::<f32>()
        .to_vec()
        .map_err(|e| PipelineError::model_invocation(site, format!("cannot read scores: {e:?}")))
}
