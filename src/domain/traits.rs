// ============================================================
// Layer 3: Core Traits (Abstractions)
// ============================================================
// The pipeline never talks to a concrete tokenizer. It only sees
// SubwordTokenizer, so tests can plug in a tiny vocabulary and the
// binary can plug in a HuggingFace tokenizer.json.
//
// Implementations:
//   - HfSubwordTokenizer (infra::tokenizer_store) -> tokenizers crate
//   - VocabTokenizer (data::fixtures, tests only)  -> greedy WordPiece
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;

// ─── SpecialToken ─────────────────────────────────────────────────────────────
/// A reserved token: its surface string and its vocabulary id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecialToken {
    pub text: String,
    pub id:   u32,
}

impl SpecialToken {
    pub fn new(text: impl Into<String>, id: u32) -> Self {
        Self { text: text.into(), id }
    }
}

/// Begin, end, unknown and pad tokens of one vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecialTokens {
    /// Begin-of-sequence, `[CLS]` for BERT-style vocabularies
    pub cls: SpecialToken,
    /// End-of-sequence, `[SEP]`
    pub sep: SpecialToken,
    /// Substitute for words the tokenizer cannot split, `[UNK]`
    pub unk: SpecialToken,
    /// Right padding, `[PAD]`
    pub pad: SpecialToken,
}

// ─── SubwordTokenizer ─────────────────────────────────────────────────────────
/// Splits one word into subword tokens and maps tokens to ids.
pub trait SubwordTokenizer {
    /// Subword decomposition of a single word. May be empty.
    fn tokenize(&self, word: &str) -> Result<Vec<String>>;

    /// Vocabulary ids for a token sequence, one id per token.
    /// Tokens missing from the vocabulary map to the unknown id.
    fn convert_tokens_to_ids(&self, tokens: &[String]) -> Vec<u32>;

    /// The reserved tokens of this vocabulary.
    fn special_tokens(&self) -> &SpecialTokens;
}
