// ============================================================
// Layer 5: ML / Model Layer (Burn)
// ============================================================
// All Burn model code lives here. The data layer only builds
// tensors from AlignedExamples; everything that runs a network
// or reads its output sits in this layer.
//
//   joint.rs      JointModel trait: the seam between the batch
//                 runner and any network (real or scripted)
//
//   model.rs      Transformer encoder with two heads
//                 • Token, position, segment embeddings
//                 • Post-norm self-attention blocks
//                 • Intent head on [CLS]
//                 • Slot head on every position
//                 • Optional CRF on top of the slot head
//
//   crf.rs        Linear-chain CRF transitions + Viterbi decode
//
//   inferencer.rs Batch runner: feeds batches through a
//                 JointModel and collects raw outputs in order
//
// Reference: Burn Book §3 (Building Blocks)
//            Devlin et al. (2019) BERT
//            Chen et al. (2019) BERT for Joint Intent Classification
//            and Slot Filling

/// Joint intent + slot model interface
pub mod joint;

/// Linear-chain CRF decoding
pub mod crf;

/// Transformer encoder with intent and slot heads
pub mod model;

/// Batch runner: model outputs for every example, in order
pub mod inferencer;
