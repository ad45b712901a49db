use serde::{Deserialize, Serialize};

/// One aligned, padded utterance.
/// Sequence format: [CLS] w1 w1## w2 ... [SEP] [PAD]...
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignedExample {
    pub token_ids:       Vec<u32>,
    pub attention_mask:  Vec<u32>,
    pub segment_ids:     Vec<u32>,
    pub slot_label_mask: Vec<i64>,
    /// Words whose first subword survived truncation
    pub retained_words:  usize,
}

impl AlignedExample {
    /// Padded sequence length (`max_seq_len`).
    pub fn seq_len(&self) -> usize {
        self.token_ids.len()
    }
}

#[cfg(test)]
impl AlignedExample {
    /// Number of real (non-padding) positions, special tokens included.
    pub fn real_len(&self) -> usize {
        self.attention_mask.iter().filter(|&&m| m == 1).count()
    }

    /// Number of positions whose mask entry is not `ignore_index`.
    pub fn active_positions(&self, ignore_index: i64) -> usize {
        self.slot_label_mask.iter().filter(|&&m| m != ignore_index).count()
    }
}
