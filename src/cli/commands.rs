// ============================================================
// Layer 1: CLI Commands and Arguments
// ============================================================
// Two subcommands:
//   predict  align, run the model, write `<intent> -> ...` lines
//   align    align only, print each example as a JSON line
//
// Reference: Rust Book §12 (Building a CLI Program)

use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::application::predict_use_case::PredictConfig;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Predict intent and slot labels for every input utterance
    Predict(PredictArgs),

    /// Show the aligned model input for every utterance
    Align(AlignArgs),
}

/// Where utterances come from.
#[derive(Args, Debug)]
pub struct InputArgs {
    /// One utterance per line; a line starting with `[` is a JSON word list
    #[arg(long, default_value = "sample_pred_in.txt")]
    pub input_file: String,

    /// Predict a single utterance instead of reading --input-file
    #[arg(long, conflicts_with = "input_file")]
    pub text: Option<String>,
}

/// Where the trained model lives.
#[derive(Args, Debug)]
pub struct ModelArgs {
    /// Directory with model_config.json, weights, label files and tokenizer.json
    #[arg(long, default_value = "model")]
    pub model_dir: String,

    /// Shorter sequence length than the model was trained with
    #[arg(long)]
    pub max_seq_len: Option<usize>,
}

#[derive(Args, Debug)]
pub struct PredictArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[command(flatten)]
    pub model: ModelArgs,

    /// Rendered predictions are written here, one line per utterance
    #[arg(long, default_value = "sample_pred_out.txt")]
    pub output_file: String,

    /// Utterances per forward pass
    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,
}

#[derive(Args, Debug)]
pub struct AlignArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[command(flatten)]
    pub model: ModelArgs,
}

impl From<&ModelArgs> for PredictConfig {
    fn from(a: &ModelArgs) -> Self {
        PredictConfig {
            model_dir:   PathBuf::from(&a.model_dir),
            max_seq_len: a.max_seq_len,
            ..PredictConfig::default()
        }
    }
}

/// The application layer never sees clap types.
impl From<&PredictArgs> for PredictConfig {
    fn from(a: &PredictArgs) -> Self {
        PredictConfig {
            batch_size: a.batch_size,
            ..PredictConfig::from(&a.model)
        }
    }
}
