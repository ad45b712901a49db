// ============================================================
// Layer 4: Slot Batcher
// ============================================================
// Implements Burn's Batcher trait to turn a Vec<AlignedExample>
// into integer tensors on the target device. The slot label mask
// never goes to the model; it is stacked as plain i64 rows so any
// sentinel value survives exactly.
//
// How batching works here:
//   Input:  Vec of N AlignedExamples, each with sequences of length L
//   Output: SlotBatch with three tensors of shape [N, L] + N mask rows
//
//   Each sequence kind is flattened row by row, then reshaped:
//   [e1_t1, e1_t2, ..., e1_tL, e2_t1, ..., eN_tL] → [N, L]
//
// All examples are already padded to L and checked by the
// BatchAssembler, so no dynamic padding happens here.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::example::AlignedExample;

// ─── SlotBatch ────────────────────────────────────────────────────────────────
/// Structure-of-arrays view of one batch. Row i is example i of the batch.
#[derive(Debug, Clone)]
pub struct SlotBatch<B: Backend> {
    /// Subword ids, `[batch, seq_len]`
    pub input_ids: Tensor<B, 2, Int>,

    /// 1 = real token, 0 = padding
    pub attention_mask: Tensor<B, 2, Int>,

    /// Segment (token type) ids
    pub segment_ids: Tensor<B, 2, Int>,

    /// Active marker at each word's first subword, ignore sentinel elsewhere
    pub slot_label_mask: Vec<Vec<i64>>,
}

impl<B: Backend> SlotBatch<B> {
    /// Number of examples in the batch.
    pub fn len(&self) -> usize {
        self.input_ids.dims()[0]
    }

    pub fn seq_len(&self) -> usize {
        self.input_ids.dims()[1]
    }
}

// ─── SlotBatcher ──────────────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct SlotBatcher<B: Backend> {
    /// The device to create tensors on
    pub device: B::Device,
}

impl<B: Backend> SlotBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }

    fn stack<F>(&self, items: &[AlignedExample], seq_len: usize, row: F) -> Tensor<B, 2, Int>
    where
        F: Fn(&AlignedExample) -> Vec<i32>,
    {
        let flat: Vec<i32> = items.iter().flat_map(|ex| row(ex)).collect();
        Tensor::<B, 1, Int>::from_ints(flat.as_slice(), &self.device)
            .reshape([items.len(), seq_len])
    }
}

impl<B: Backend> Batcher<AlignedExample, SlotBatch<B>> for SlotBatcher<B> {
    fn batch(&self, mut items: Vec<AlignedExample>) -> SlotBatch<B> {
        let seq_len = items.first().map_or(0, AlignedExample::seq_len);

        let input_ids = self.stack(&items, seq_len, |ex| {
            ex.token_ids.iter().map(|&x| x as i32).collect()
        });
        let attention_mask = self.stack(&items, seq_len, |ex| {
            ex.attention_mask.iter().map(|&x| x as i32).collect()
        });
        let segment_ids = self.stack(&items, seq_len, |ex| {
            ex.segment_ids.iter().map(|&x| x as i32).collect()
        });
        let slot_label_mask = items
            .iter_mut()
            .map(|ex| std::mem::take(&mut ex.slot_label_mask))
            .collect();

        SlotBatch { input_ids, attention_mask, segment_ids, slot_label_mask }
    }
}
