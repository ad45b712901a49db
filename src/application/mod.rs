// ============================================================
// Layer 2: Application / Use Cases
// ============================================================
// Orchestrates the other layers for one goal: turning utterances
// into intent + slot predictions.
//
// Rules for this layer:
//   - No model math here (that's Layer 5)
//   - No printing or file writing (that's Layer 1)
//   - Only workflow coordination
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// Align → run → reconstruct
pub mod predict_use_case;
