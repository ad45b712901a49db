// ============================================================
// Layer 4: Data Pipeline
// ============================================================
// Everything between raw input lines and model-ready tensors,
// and back from model output to labelled words:
//
//   input lines
//       │
//       ▼
//   Preprocessor         → cleans lines, splits into Utterances
//       │
//       ▼
//   WordAligner          → subword ids + masks, one AlignedExample each
//       │
//       ▼
//   BatchAssembler       → ordered, validated batches
//       │
//       ▼
//   SlotBatcher          → [batch, seq_len] tensors   (model runs here)
//       │
//       ▼
//   LabelReconstructor   → Prediction per utterance
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Cleans input lines and splits them into words
pub mod preprocessor;

/// One aligned, padded utterance
pub mod example;

/// Word → subword alignment with slot label mask
pub mod aligner;

/// Ordered batch planning and length validation
pub mod assembler;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Maps predicted ids back to words and labels
pub mod reconstructor;

#[cfg(test)]
pub(crate) mod fixtures;
