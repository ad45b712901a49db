//! Test doubles shared by the pipeline tests: a greedy WordPiece
//! tokenizer over a fixed vocabulary and a model that replays
//! scripted scores.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use anyhow::{bail, Result};
use burn::prelude::*;

use crate::domain::traits::{SpecialToken, SpecialTokens, SubwordTokenizer};
use crate::ml::joint::{JointInput, JointModel, JointOutput, SlotDecoding, SlotOutput};

pub type TestBackend = burn::backend::NdArray;

// ─── VocabTokenizer ───────────────────────────────────────────────────────────

/// Ids: [PAD]=0, [UNK]=1, [CLS]=2, [SEP]=3, vocabulary words from 4.
/// Continuation pieces are written with a `##` prefix. A word that
/// cannot be fully covered by the vocabulary yields no pieces.
pub struct VocabTokenizer {
    vocab:   HashMap<String, u32>,
    special: SpecialTokens,
}

impl VocabTokenizer {
    pub fn new(pieces: &[&str]) -> Self {
        let special = SpecialTokens {
            pad: SpecialToken::new("[PAD]", 0),
            unk: SpecialToken::new("[UNK]", 1),
            cls: SpecialToken::new("[CLS]", 2),
            sep: SpecialToken::new("[SEP]", 3),
        };
        let mut vocab: HashMap<String, u32> = [&special.pad, &special.unk, &special.cls, &special.sep]
            .iter()
            .map(|t| (t.text.clone(), t.id))
            .collect();
        for piece in pieces {
            let next = vocab.len() as u32;
            vocab.entry(piece.to_string()).or_insert(next);
        }
        Self { vocab, special }
    }

    pub fn id_of(&self, piece: &str) -> u32 {
        self.vocab[piece]
    }

    pub fn pad_id(&self) -> u32 { self.special.pad.id }
    pub fn unk_id(&self) -> u32 { self.special.unk.id }
    pub fn cls_id(&self) -> u32 { self.special.cls.id }
    pub fn sep_id(&self) -> u32 { self.special.sep.id }
}

impl SubwordTokenizer for VocabTokenizer {
    fn tokenize(&self, word: &str) -> Result<Vec<String>> {
        let chars: Vec<char> = word.chars().collect();
        let mut pieces = Vec::new();
        let mut start  = 0;

        while start < chars.len() {
            let mut end   = chars.len();
            let mut found = None;
            while end > start {
                let body: String = chars[start..end].iter().collect();
                let piece = if start > 0 { format!("##{body}") } else { body };
                if self.vocab.contains_key(&piece) {
                    found = Some(piece);
                    break;
                }
                end -= 1;
            }
            match found {
                Some(piece) => {
                    pieces.push(piece);
                    start = end;
                }
                None => return Ok(Vec::new()),
            }
        }
        Ok(pieces)
    }

    fn convert_tokens_to_ids(&self, tokens: &[String]) -> Vec<u32> {
        tokens
            .iter()
            .map(|t| self.vocab.get(t).copied().unwrap_or(self.special.unk.id))
            .collect()
    }

    fn special_tokens(&self) -> &SpecialTokens {
        &self.special
    }
}

// ─── ScriptedModel ────────────────────────────────────────────────────────────

pub enum ScriptedSlots {
    /// Per example: seq_len rows of num_slots scores
    Scores(Vec<Vec<Vec<f32>>>),
    /// Per example: seq_len tag ids
    Decoded(Vec<Vec<usize>>),
}

/// Replays per-example scores in call order: the first forward call
/// gets rows `0..n`, the next `n..n+m`, and so on.
pub struct ScriptedModel {
    intents:      Vec<Vec<f32>>,
    slots:        ScriptedSlots,
    segment_ids:  bool,
    fail_on_call: Option<usize>,
    cursor:       Cell<usize>,
    calls:        Cell<usize>,
    /// Whether each call received segment ids
    pub seen_segments: RefCell<Vec<bool>>,
    /// Batch sizes in call order
    pub seen_batches:  RefCell<Vec<usize>>,
}

impl ScriptedModel {
    pub fn new(intents: Vec<Vec<f32>>, slots: ScriptedSlots) -> Self {
        Self {
            intents,
            slots,
            segment_ids:   true,
            fail_on_call:  None,
            cursor:        Cell::new(0),
            calls:         Cell::new(0),
            seen_segments: RefCell::new(Vec::new()),
            seen_batches:  RefCell::new(Vec::new()),
        }
    }

    pub fn without_segment_ids(mut self) -> Self {
        self.segment_ids = false;
        self
    }

    pub fn failing_on_call(mut self, call: usize) -> Self {
        self.fail_on_call = Some(call);
        self
    }
}

impl<B: Backend> JointModel<B> for ScriptedModel {
    fn expects_segment_ids(&self) -> bool {
        self.segment_ids
    }

    fn slot_decoding(&self) -> SlotDecoding {
        match self.slots {
            ScriptedSlots::Scores(_)  => SlotDecoding::Raw,
            ScriptedSlots::Decoded(_) => SlotDecoding::Viterbi,
        }
    }

    fn forward(&self, input: JointInput<B>) -> Result<JointOutput<B>> {
        let call = self.calls.get();
        self.calls.set(call + 1);
        if self.fail_on_call == Some(call) {
            bail!("scripted failure on call {call}");
        }

        let device = input.input_ids.device();
        let [n, _seq_len] = input.input_ids.dims();
        self.seen_segments.borrow_mut().push(input.segment_ids.is_some());
        self.seen_batches.borrow_mut().push(n);

        let start = self.cursor.get();
        let end   = start + n;
        self.cursor.set(end);

        let intents = &self.intents[start..end];
        let width   = intents[0].len();
        let flat: Vec<f32> = intents.iter().flatten().copied().collect();
        let intent_logits = Tensor::<B, 2>::from_data(TensorData::new(flat, [n, width]), &device);

        let slots = match &self.slots {
            ScriptedSlots::Scores(rows) => {
                let rows  = &rows[start..end];
                let len   = rows[0].len();
                let tags  = rows[0][0].len();
                let flat: Vec<f32> = rows.iter().flatten().flatten().copied().collect();
                SlotOutput::Scores(Tensor::<B, 3>::from_data(
                    TensorData::new(flat, [n, len, tags]),
                    &device,
                ))
            }
            ScriptedSlots::Decoded(rows) => SlotOutput::Decoded(rows[start..end].to_vec()),
        };

        Ok(JointOutput { intent_logits, slots })
    }
}

// ─── Score helpers ────────────────────────────────────────────────────────────

/// Score vector of `width` with a single high entry at `hot`.
pub fn one_hot(width: usize, hot: usize) -> Vec<f32> {
    let mut v = vec![0.0; width];
    v[hot] = 5.0;
    v
}

/// `seq_len` rows of slot scores; row `i` peaks at `tags[i]`, rows past
/// the end of `tags` peak at tag 0.
pub fn slot_rows(seq_len: usize, num_slots: usize, tags: &[usize]) -> Vec<Vec<f32>> {
    (0..seq_len)
        .map(|i| one_hot(num_slots, tags.get(i).copied().unwrap_or(0)))
        .collect()
}
