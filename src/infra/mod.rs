// ============================================================
// Layer 6: Infrastructure Layer
// ============================================================
// Everything that touches the model directory on disk:
//
//   checkpoint.rs      model_config.json, label files, and the
//                      CompactRecorder weights file. Rebuilds the
//                      JointTransformer exactly as it was trained.
//
//   tokenizer_store.rs tokenizer.json, wrapped so the aligner only
//                      sees the SubwordTokenizer trait.
//
// Reference: Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Model manifest, label vocabularies and weights
pub mod checkpoint;

/// HuggingFace tokenizer loading
pub mod tokenizer_store;
