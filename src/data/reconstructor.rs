// ============================================================
// Layer 4: Label Reconstructor
// ============================================================
// Turns model numbers back into words and labels.
//
// For each utterance, walk the positions of its row:
//
//   mask:  IGN  ACT  ACT  IGN  ACT  IGN  IGN ...
//   tags:   0    3    3    7    1    0    0  ...
//                │    │         │
//   words:      book flight    to
//
// Positions marked IGNORE ([CLS], [SEP], continuation subwords,
// padding) are skipped. The number of ACTIVE positions must equal
// the number of words the aligner kept; anything else means the
// row no longer lines up with its words and the run is aborted.

use crate::domain::error::{PipelineError, PipelineResult, Site};
use crate::domain::labels::LabelVocab;
use crate::domain::utterance::{Prediction, Utterance};
use crate::ml::inferencer::BatchResult;

pub struct LabelReconstructor<'a> {
    vocab:        &'a LabelVocab,
    ignore_index: i64,
}

impl<'a> LabelReconstructor<'a> {
    pub fn new(vocab: &'a LabelVocab, ignore_index: i64) -> Self {
        Self { vocab, ignore_index }
    }

    /// One Prediction per utterance, in order.
    ///
    /// `retained[i]` is the number of words of utterance i that survived
    /// truncation (see `AlignedExample::retained_words`).
    pub fn reconstruct(
        &self,
        result:     &BatchResult,
        utterances: &[Utterance],
        retained:   &[usize],
    ) -> PipelineResult<Vec<Prediction>> {
        if result.len() != utterances.len() || retained.len() != utterances.len() {
            return Err(PipelineError::shape(
                Site::Run,
                "predicted rows (retained word counts)",
                utterances.len(),
                result.len().min(retained.len()),
            ));
        }

        let intent_ids = result.intent_ids();
        let tag_ids    = result.slot_tag_ids();

        utterances
            .iter()
            .enumerate()
            .map(|(i, utterance)| {
                self.reconstruct_one(
                    i,
                    utterance,
                    retained[i],
                    intent_ids[i],
                    &tag_ids[i],
                    &result.slot_label_mask[i],
                )
            })
            .collect()
    }

    fn reconstruct_one(
        &self,
        index:     usize,
        utterance: &Utterance,
        retained:  usize,
        intent_id: usize,
        tags:      &[usize],
        mask:      &[i64],
    ) -> PipelineResult<Prediction> {
        let site = Site::Utterance(index);

        if tags.len() != mask.len() {
            return Err(PipelineError::shape(site, "slot tags per position", mask.len(), tags.len()));
        }
        if retained > utterance.len() {
            return Err(PipelineError::shape(site, "retained words", utterance.len(), retained));
        }

        let intent = self
            .vocab
            .intent(intent_id)
            .ok_or_else(|| {
                PipelineError::shape(site, "intent id within vocabulary", self.vocab.intent_count(), intent_id)
            })?
            .to_string();

        let active_tags: Vec<usize> = mask
            .iter()
            .zip(tags)
            .filter(|(&m, _)| m != self.ignore_index)
            .map(|(_, &t)| t)
            .collect();

        if active_tags.len() != retained {
            return Err(PipelineError::shape(site, "active label positions", retained, active_tags.len()));
        }

        let slots = utterance
            .words()
            .iter()
            .zip(active_tags)
            .map(|(word, tag)| {
                let label = self.vocab.slot(tag).ok_or_else(|| {
                    PipelineError::shape(site, "slot tag id within vocabulary", self.vocab.slot_count(), tag)
                })?;
                Ok((word.clone(), label.to_string()))
            })
            .collect::<PipelineResult<Vec<_>>>()?;

        Ok(Prediction { intent, slots })
    }
}
