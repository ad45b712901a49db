// ============================================================
// Layer 5: Joint Model Boundary
// ============================================================
// The inference runner only sees this trait. Whatever sits behind
// it (the burn transformer in model.rs, or a scripted stand-in in
// tests) receives one batch of aligned tensors and answers with:
//
//   intent_logits  [batch, num_intents]
//   slots          Scores  -> [batch, seq_len, num_slots]
//                  Decoded -> batch x seq_len tag ids (CRF / Viterbi)
//
// Which slot variant a model produces is fixed for its lifetime and
// reported by slot_decoding(), so the runner picks its accumulation
// buffer once per run.

use anyhow::Result;
use burn::prelude::*;

/// How a model turns per-position slot emissions into tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotDecoding {
    /// Model returns raw scores; the runner takes the argmax per position
    Raw,
    /// Model decodes the best tag sequence itself (CRF + Viterbi)
    Viterbi,
}

/// One batch of model input, all `[batch, seq_len]`.
#[derive(Debug, Clone)]
pub struct JointInput<B: Backend> {
    pub input_ids:      Tensor<B, 2, Int>,
    pub attention_mask: Tensor<B, 2, Int>,
    /// Present only when the model expects segment ids
    pub segment_ids:    Option<Tensor<B, 2, Int>>,
}

#[derive(Debug)]
pub enum SlotOutput<B: Backend> {
    /// `[batch, seq_len, num_slots]`
    Scores(Tensor<B, 3>),
    /// One best tag-id sequence of length `seq_len` per example
    Decoded(Vec<Vec<usize>>),
}

#[derive(Debug)]
pub struct JointOutput<B: Backend> {
    /// `[batch, num_intents]`
    pub intent_logits: Tensor<B, 2>,
    pub slots:         SlotOutput<B>,
}

/// Black-box scoring function for joint intent + slot prediction.
pub trait JointModel<B: Backend> {
    /// Whether `JointInput::segment_ids` should be filled in.
    fn expects_segment_ids(&self) -> bool;

    /// Fixed decoding mode of this model.
    fn slot_decoding(&self) -> SlotDecoding;

    fn forward(&self, input: JointInput<B>) -> Result<JointOutput<B>>;
}
