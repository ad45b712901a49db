// ============================================================
// Layer 4: Word Aligner
// ============================================================
// Converts a list of words into fixed-length model input while
// remembering where every word starts.
//
// A word may split into several subword tokens:
//
//   words:    book        paris
//   subwords: book        par  ##is
//   mask:     ACTIVE      ACTIVE IGNORE
//
// Only the first subword of a word is ACTIVE. Special tokens,
// continuation subwords and padding are IGNORE. Counting the ACTIVE
// entries later gives back exactly one slot prediction per word.
//
// Layout of one example (max_seq_len = L):
//
//   [CLS] sub_1 ... sub_k [SEP] [PAD] ... [PAD]
//   |<------------ k <= L - 2 ---------->|
//
// Truncation removes trailing subwords. A word cut in the middle
// keeps its first subword (and so its ACTIVE marker); a word cut
// entirely is simply not retained.

use crate::data::example::AlignedExample;
use crate::domain::error::{PipelineError, PipelineResult, Site};
use crate::domain::traits::{SpecialTokens, SubwordTokenizer};
use crate::domain::utterance::Utterance;

/// [CLS] + [SEP]
const SPECIAL_TOKENS_COUNT: usize = 2;

/// Knobs of the alignment. The defaults match a BERT-style joint model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignmentConfig {
    /// Fixed sequence length L of every example
    pub max_seq_len:         usize,
    /// Mask sentinel for positions that carry no slot prediction.
    /// The ACTIVE marker is `ignore_index + 1`.
    pub ignore_index:        i64,
    pub cls_segment_id:      u32,
    pub sequence_segment_id: u32,
    pub pad_segment_id:      u32,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            max_seq_len:         50,
            ignore_index:        0,
            cls_segment_id:      0,
            sequence_segment_id: 0,
            pad_segment_id:      0,
        }
    }
}

pub struct WordAligner {
    config:  AlignmentConfig,
    special: SpecialTokens,
}

impl WordAligner {
    /// Fails when `max_seq_len` cannot hold the two special tokens, or
    /// when `ignore_index` leaves no room for the active marker.
    pub fn new(config: AlignmentConfig, special: SpecialTokens) -> PipelineResult<Self> {
        if config.max_seq_len < SPECIAL_TOKENS_COUNT {
            return Err(PipelineError::alignment(
                Site::Run,
                format!(
                    "max_seq_len {} leaves no room for [CLS] and [SEP]",
                    config.max_seq_len
                ),
            ));
        }
        if config.ignore_index.checked_add(1).is_none() {
            return Err(PipelineError::alignment(
                Site::Run,
                format!("ignore_index {} leaves no room for the active marker", config.ignore_index),
            ));
        }
        Ok(Self { config, special })
    }

    pub fn ignore_index(&self) -> i64 {
        self.config.ignore_index
    }

    pub fn active_marker(&self) -> i64 {
        self.config.ignore_index + 1
    }

    /// Align every utterance in order. Stops at the first failure.
    pub fn align_all<T: SubwordTokenizer + ?Sized>(
        &self,
        utterances: &[Utterance],
        tokenizer:  &T,
    ) -> PipelineResult<Vec<AlignedExample>> {
        utterances
            .iter()
            .enumerate()
            .map(|(i, u)| self.align(i, u.words(), tokenizer))
            .collect()
    }

    /// Align one utterance. `index` is only used to label errors.
    pub fn align<T: SubwordTokenizer + ?Sized>(
        &self,
        index:     usize,
        words:     &[String],
        tokenizer: &T,
    ) -> PipelineResult<AlignedExample> {
        let site    = Site::Utterance(index);
        let max_len = self.config.max_seq_len;
        let ignore  = self.ignore_index();
        let active  = self.active_marker();

        // ── Step 1+2: Subwords and mask in lockstep ──────────────────────────
        let mut tokens: Vec<String> = Vec::new();
        let mut mask:   Vec<i64>    = Vec::new();

        for (pos, word) in words.iter().enumerate() {
            check_word(word).map_err(|reason| {
                PipelineError::alignment(site, format!("word {pos}: {reason}"))
            })?;

            let mut pieces = tokenizer.tokenize(word).map_err(|e| {
                PipelineError::alignment(site, format!("cannot tokenize {word:?}: {e}"))
            })?;
            if pieces.is_empty() {
                pieces.push(self.special.unk.text.clone());
            }

            mask.push(active);
            mask.extend(std::iter::repeat(ignore).take(pieces.len() - 1));
            tokens.extend(pieces);
        }

        // ── Step 3: Truncate to leave room for [CLS] and [SEP] ───────────────
        let budget = max_len - SPECIAL_TOKENS_COUNT;
        if tokens.len() > budget {
            tokens.truncate(budget);
            mask.truncate(budget);
        }
        let retained_words = mask.iter().filter(|&&m| m == active).count();
        if retained_words < words.len() {
            tracing::warn!(
                "Utterance {} truncated: {} of {} words kept (max_seq_len={})",
                index, retained_words, words.len(), max_len
            );
        }

        // ── Step 4: [CLS] content [SEP] ──────────────────────────────────────
        let content_len = tokens.len();
        let mut sequence = Vec::with_capacity(content_len + SPECIAL_TOKENS_COUNT);
        sequence.push(self.special.cls.text.clone());
        sequence.extend(tokens);
        sequence.push(self.special.sep.text.clone());

        let mut segment_ids = Vec::with_capacity(max_len);
        segment_ids.push(self.config.cls_segment_id);
        segment_ids.extend(std::iter::repeat(self.config.sequence_segment_id).take(content_len + 1));

        let mut slot_label_mask = Vec::with_capacity(max_len);
        slot_label_mask.push(ignore);
        slot_label_mask.extend(mask);
        slot_label_mask.push(ignore);

        // ── Step 5: Ids and attention over real tokens ───────────────────────
        let mut token_ids = tokenizer.convert_tokens_to_ids(&sequence);
        if token_ids.len() != sequence.len() {
            return Err(PipelineError::alignment(
                site,
                format!(
                    "tokenizer returned {} ids for {} tokens",
                    token_ids.len(),
                    sequence.len()
                ),
            ));
        }
        let mut attention_mask = vec![1u32; token_ids.len()];

        // ── Step 6: Right-pad everything to max_seq_len ──────────────────────
        let padding = max_len - token_ids.len();
        token_ids.extend(std::iter::repeat(self.special.pad.id).take(padding));
        attention_mask.extend(std::iter::repeat(0).take(padding));
        segment_ids.extend(std::iter::repeat(self.config.pad_segment_id).take(padding));
        slot_label_mask.extend(std::iter::repeat(ignore).take(padding));

        Ok(AlignedExample {
            token_ids,
            attention_mask,
            segment_ids,
            slot_label_mask,
            retained_words,
        })
    }
}

/// A word must be a single non-empty run of printable characters.
fn check_word(word: &str) -> Result<(), String> {
    if word.is_empty() {
        return Err("empty word".to_string());
    }
    if let Some(c) = word.chars().find(|c| c.is_whitespace() || c.is_control()) {
        return Err(format!("{word:?} contains separator or control character {c:?}"));
    }
    Ok(())
}
