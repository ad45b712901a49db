// ============================================================
// Layer 3: Utterance and Prediction
// ============================================================
// Utterance is what the user typed, already split into words.
// Prediction is what comes back: one intent label and one slot
// label per retained word.
//
// Example:
//   words:   ["book", "flight", "to", "paris"]
//   intent:  "book_flight"
//   slots:   [O, O, O, B-city]
//   render:  "<book_flight> -> book flight to [paris:B-city]"

use serde::{Deserialize, Serialize};

/// An ordered list of words. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utterance {
    words: Vec<String>,
}

impl Utterance {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { words: words.into_iter().map(Into::into).collect() }
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }
}

/// Final per-utterance output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prediction {
    /// Intent vocabulary entry at the predicted index
    pub intent: String,

    /// (word, slot label) in word order. Words dropped by truncation
    /// are absent.
    pub slots: Vec<(String, String)>,
}

impl Prediction {
    /// Render as `<intent> -> w1 w2 [w3:label]`.
    /// Words tagged with `outside_label` are written bare.
    pub fn render(&self, outside_label: &str) -> String {
        let annotated: Vec<String> = self
            .slots
            .iter()
            .map(|(word, label)| {
                if label == outside_label {
                    word.clone()
                } else {
                    format!("[{word}:{label}]")
                }
            })
            .collect();

        format!("<{}> -> {}", self.intent, annotated.join(" "))
    }
}
