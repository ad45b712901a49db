// ============================================================
// Layer 3: Pipeline Errors
// ============================================================
// The three ways a prediction run can abort. Every variant names
// the site that failed (an utterance index or a batch index) so the
// caller can trace the problem back to its input line.
//
// There is no partial output: any of these stops the whole run.

use std::fmt;
use thiserror::Error;

/// Result type for the alignment / inference / reconstruction pipeline.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

/// Where in the run an error was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Site {
    /// Zero-based index of the utterance in the input order
    Utterance(usize),
    /// Zero-based index of the batch in processing order
    Batch(usize),
    /// Not tied to a single utterance or batch (e.g. configuration)
    Run,
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Site::Utterance(i) => write!(f, "utterance {i}"),
            Site::Batch(i)     => write!(f, "batch {i}"),
            Site::Run          => write!(f, "run"),
        }
    }
}

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum PipelineError {
    /// The word list cannot be aligned (malformed words, bad config,
    /// tokenizer failure).
    #[error("alignment error at {site}: {reason}")]
    Alignment { site: Site, reason: String },

    /// A sequence length or position count does not match what the
    /// alignment promised.
    #[error("shape error at {site}: {what}: expected {expected}, found {found}")]
    Shape {
        site:     Site,
        what:     String,
        expected: usize,
        found:    usize,
    },

    /// The model call failed or returned output of the wrong rank/shape.
    #[error("model invocation failed at {site}: {reason}")]
    ModelInvocation { site: Site, reason: String },
}

impl PipelineError {
    pub fn alignment(site: Site, reason: impl Into<String>) -> Self {
        PipelineError::Alignment { site, reason: reason.into() }
    }

    pub fn shape(site: Site, what: impl Into<String>, expected: usize, found: usize) -> Self {
        PipelineError::Shape { site, what: what.into(), expected, found }
    }

    pub fn model_invocation(site: Site, reason: impl Into<String>) -> Self {
        PipelineError::ModelInvocation { site, reason: reason.into() }
    }

    /// The utterance or batch that triggered this error.
    pub fn site(&self) -> Site {
        match self {
            PipelineError::Alignment { site, .. }
            | PipelineError::Shape { site, .. }
            | PipelineError::ModelInvocation { site, .. } => *site,
        }
    }
}
