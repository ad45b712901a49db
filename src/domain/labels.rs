// ============================================================
// Layer 3: Label Vocabularies
// ============================================================
// Two flat ordered lists: intent labels indexed by predicted intent
// id, slot labels indexed by predicted / decoded tag id.

/// Label used for "no slot" in the slot vocabulary unless the model
/// manifest says otherwise.
pub const DEFAULT_OUTSIDE_LABEL: &str = "O";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelVocab {
    intents: Vec<String>,
    slots:   Vec<String>,
    outside: String,
}

impl LabelVocab {
    pub fn new(intents: Vec<String>, slots: Vec<String>, outside: impl Into<String>) -> Self {
        Self { intents, slots, outside: outside.into() }
    }

    pub fn intent(&self, id: usize) -> Option<&str> {
        self.intents.get(id).map(String::as_str)
    }

    pub fn slot(&self, id: usize) -> Option<&str> {
        self.slots.get(id).map(String::as_str)
    }

    pub fn intent_count(&self) -> usize {
        self.intents.len()
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// The background label whose words render unannotated.
    pub fn outside_label(&self) -> &str {
        &self.outside
    }
}
