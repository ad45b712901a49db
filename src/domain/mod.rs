// ============================================================
// Layer 3: Domain Layer
// ============================================================
// Plain Rust structs, enums and traits that describe the problem:
// utterances, predictions, label vocabularies, pipeline errors and
// the tokenizer seam.
//
// Rules for this layer:
//   - NO Burn framework types
//   - NO file I/O
//   - Only plain structs, enums and traits
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// Words in, labels out
pub mod utterance;

// Intent and slot label lists
pub mod labels;

// Alignment / shape / model-invocation errors
pub mod error;

// Tokenizer abstraction implemented by infra and test fixtures
pub mod traits;
