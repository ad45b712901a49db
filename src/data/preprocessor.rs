// ============================================================
// Layer 4: Utterance Preprocessor
// ============================================================
// Turns raw input lines into Utterances (lists of words).
//
// Two line formats are accepted:
//   1. Plain text:  "book a flight to paris"
//      → cleaned, then split on whitespace
//   2. JSON array:  ["book", "a", "flight", "to", "paris"]
//      → taken word for word; every entry must be a string
//
// Cleaning (plain text only), applied in order:
//   1. Unicode space variants, tabs, BOM → plain space
//   2. Remaining control characters → space
//   3. Split on whitespace (collapses runs, trims edges)
//
// Blank lines produce no utterance.
//
// Reference: Rust Book §8 (Strings in Rust), §13 (Iterators)

use serde_json::Value;

use crate::domain::error::{PipelineError, PipelineResult, Site};
use crate::domain::utterance::Utterance;

pub struct Preprocessor;

impl Preprocessor {
    pub fn new() -> Self {
        Self
    }

    /// Normalise whitespace and control characters in one line.
    pub fn clean(&self, text: &str) -> String {
        let normalised: String = text
            .chars()
            .map(|c| match c {
                '\t' | '\r' | '\n' => ' ',
                // Non-breaking, zero-width, BOM
                '\u{00A0}' | '\u{200B}' | '\u{FEFF}' => ' ',
                c if c.is_control() => ' ',
                c => c,
            })
            .collect();

        normalised.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Parse one input line. `index` is the utterance index used in errors.
    pub fn utterance(&self, index: usize, line: &str) -> PipelineResult<Option<Utterance>> {
        let trimmed = line.trim();
        if trimmed.starts_with('[') {
            return self.json_utterance(index, trimmed).map(Some);
        }

        let cleaned = self.clean(trimmed);
        if cleaned.is_empty() {
            return Ok(None);
        }
        Ok(Some(Utterance::new(cleaned.split(' '))))
    }

    /// Parse every non-blank line of `text`, in order.
    pub fn utterances(&self, text: &str) -> PipelineResult<Vec<Utterance>> {
        let mut out = Vec::new();
        for line in text.lines() {
            if let Some(u) = self.utterance(out.len(), line)? {
                out.push(u);
            }
        }
        Ok(out)
    }

    fn json_utterance(&self, index: usize, line: &str) -> PipelineResult<Utterance> {
        let site = Site::Utterance(index);
        let values: Vec<Value> = serde_json::from_str(line).map_err(|e| {
            PipelineError::alignment(site, format!("invalid JSON word list: {e}"))
        })?;

        let words = values
            .into_iter()
            .enumerate()
            .map(|(pos, v)| match v {
                Value::String(s) => Ok(s),
                other => Err(PipelineError::alignment(
                    site,
                    format!("word {pos} is not a string: {other}"),
                )),
            })
            .collect::<PipelineResult<Vec<String>>>()?;

        Ok(Utterance::new(words))
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}
