// ============================================================
// Layer 4: Batch Assembler
// ============================================================
// Groups aligned examples into batches of at most `batch_size`,
// strictly in input order:
//
//   examples: e0 e1 e2 e3 e4      batch_size = 2
//   batches:  [e0 e1] [e2 e3] [e4]
//             offset 0 offset 2 offset 4
//
// Batch k always starts at example k * batch_size, so prediction
// row i maps back to utterance i with no extra index.
//
// Every example is checked against max_seq_len here, before any
// tensor is built: a length mismatch means the aligner and the
// model disagree and the run must stop.

use crate::data::example::AlignedExample;
use crate::domain::error::{PipelineError, PipelineResult, Site};

/// A contiguous, ordered slice of examples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExampleBatch<'a> {
    /// Position of this batch in processing order
    pub index:    usize,
    /// Index of the first example of this batch in the full input
    pub offset:   usize,
    pub examples: &'a [AlignedExample],
}

impl ExampleBatch<'_> {
    pub fn len(&self) -> usize {
        self.examples.len()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BatchAssembler {
    batch_size:  usize,
    max_seq_len: usize,
}

impl BatchAssembler {
    pub fn new(batch_size: usize, max_seq_len: usize) -> PipelineResult<Self> {
        if batch_size == 0 {
            return Err(PipelineError::shape(Site::Run, "batch size", 1, 0));
        }
        Ok(Self { batch_size, max_seq_len })
    }

    /// Split `examples` into ordered batches, validating every sequence
    /// length on the way.
    pub fn assemble<'a>(&self, examples: &'a [AlignedExample]) -> PipelineResult<Vec<ExampleBatch<'a>>> {
        examples
            .chunks(self.batch_size)
            .enumerate()
            .map(|(index, chunk)| {
                let offset = index * self.batch_size;
                for (i, ex) in chunk.iter().enumerate() {
                    self.check_lengths(index, offset + i, ex)?;
                }
                Ok(ExampleBatch { index, offset, examples: chunk })
            })
            .collect()
    }

    fn check_lengths(&self, batch: usize, example: usize, ex: &AlignedExample) -> PipelineResult<()> {
        let lengths = [
            ("token_ids",       ex.token_ids.len()),
            ("attention_mask",  ex.attention_mask.len()),
            ("segment_ids",     ex.segment_ids.len()),
            ("slot_label_mask", ex.slot_label_mask.len()),
        ];
        for (name, len) in lengths {
            if len != self.max_seq_len {
                return Err(PipelineError::shape(
                    Site::Batch(batch),
                    format!("{name} length of example {example}"),
                    self.max_seq_len,
                    len,
                ));
            }
        }
        Ok(())
    }
}
