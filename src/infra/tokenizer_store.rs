// ============================================================
// Layer 6: Tokenizer Store
// ============================================================
// Loads a HuggingFace tokenizer.json from the model directory and
// adapts it to the SubwordTokenizer seam:
//
//   tokenize("paris")          → ["par", "##is"]   (no [CLS]/[SEP])
//   convert_tokens_to_ids(..)  → vocabulary ids, [UNK] id if missing
//
// The four special tokens are looked up by name once at load time.
// A vocabulary without them cannot produce valid model input, so
// loading fails early instead.
//
// Padding and truncation stored in tokenizer.json are switched off:
// the aligner owns the sequence budget and pads with [PAD] itself.

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use tokenizers::Tokenizer;

use crate::domain::traits::{SpecialToken, SpecialTokens, SubwordTokenizer};

const TOKENIZER_FILE: &str = "tokenizer.json";

/// Surface strings of the special tokens in the vocabulary.
#[derive(Debug, Clone)]
pub struct SpecialTokenNames {
    pub cls: String,
    pub sep: String,
    pub unk: String,
    pub pad: String,
}

impl Default for SpecialTokenNames {
    fn default() -> Self {
        Self {
            cls: "[CLS]".to_string(),
            sep: "[SEP]".to_string(),
            unk: "[UNK]".to_string(),
            pad: "[PAD]".to_string(),
        }
    }
}

pub struct TokenizerStore {
    dir: PathBuf,
}

impl TokenizerStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Load `tokenizer.json` from the store directory.
    pub fn load(&self, names: &SpecialTokenNames) -> Result<HfSubwordTokenizer> {
        let path = self.dir.join(TOKENIZER_FILE);
        let inner = Tokenizer::from_file(&path)
            .map_err(|e| anyhow!(
                "Cannot load tokenizer from '{}': {}", path.display(), e
            ))?;
        tracing::info!("Loaded tokenizer from '{}'", path.display());
        HfSubwordTokenizer::new(inner, names)
            .with_context(|| format!("Tokenizer '{}' is unusable", path.display()))
    }
}

/// `tokenizers::Tokenizer` behind the SubwordTokenizer trait.
pub struct HfSubwordTokenizer {
    inner:   Tokenizer,
    special: SpecialTokens,
}

impl HfSubwordTokenizer {
    pub fn new(mut inner: Tokenizer, names: &SpecialTokenNames) -> Result<Self> {
        inner.with_padding(None);
        inner
            .with_truncation(None)
            .map_err(|e| anyhow!("disable truncation: {e}"))?;

        let lookup = |name: &str| -> Result<SpecialToken> {
            let id = inner
                .token_to_id(name)
                .ok_or_else(|| anyhow!("special token {name:?} missing from vocabulary"))?;
            Ok(SpecialToken::new(name, id))
        };
        let special = SpecialTokens {
            cls: lookup(&names.cls)?,
            sep: lookup(&names.sep)?,
            unk: lookup(&names.unk)?,
            pad: lookup(&names.pad)?,
        };
        Ok(Self { inner, special })
    }
}

impl SubwordTokenizer for HfSubwordTokenizer {
    fn tokenize(&self, word: &str) -> Result<Vec<String>> {
        let encoding = self
            .inner
            .encode(word, false)
            .map_err(|e| anyhow!("tokenise {word:?}: {e}"))?;
        Ok(encoding.get_tokens().to_vec())
    }

    fn convert_tokens_to_ids(&self, tokens: &[String]) -> Vec<u32> {
        tokens
            .iter()
            .map(|t| self.inner.token_to_id(t).unwrap_or(self.special.unk.id))
            .collect()
    }

    fn special_tokens(&self) -> &SpecialTokens {
        &self.special
    }
}
