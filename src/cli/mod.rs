// ============================================================
// Layer 1: CLI / Presentation Layer
// ============================================================
// Parses arguments with clap, reads utterances, hands them to
// Layer 2 and writes the results. No pipeline logic lives here.
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use std::fs;

use anyhow::{Context, Result};
use clap::Parser;
use commands::{AlignArgs, Commands, InputArgs, PredictArgs};

use crate::application::predict_use_case::{ModelAssets, PredictConfig, PredictUseCase};
use crate::data::preprocessor::Preprocessor;
use crate::domain::utterance::Utterance;

#[derive(Parser, Debug)]
#[command(
    name = "intent-slot",
    version = "0.1.0",
    about = "Predict intent and slot labels with a joint BERT-style model."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Predict(args) => run_predict(args),
            Commands::Align(args)   => run_align(args),
        }
    }
}

fn run_predict(args: PredictArgs) -> Result<()> {
    let config = PredictConfig {
        utterances: read_utterances(&args.input)?,
        ..PredictConfig::from(&args)
    };
    tracing::info!("Read {} utterances", config.utterances.len());

    let use_case    = PredictUseCase::from_model_dir(&config)?;
    let predictions = use_case
        .predict(&config.utterances)
        .inspect_err(|e| tracing::error!("Prediction aborted at {}", e.site()))?;
    let lines       = use_case.render(&predictions);

    let mut out = lines.join("\n");
    if !out.is_empty() {
        out.push('\n');
    }
    fs::write(&args.output_file, out)
        .with_context(|| format!("Cannot write predictions to '{}'", args.output_file))?;

    for line in &lines {
        println!("{line}");
    }
    tracing::info!("Predictions written to '{}'", args.output_file);
    Ok(())
}

fn run_align(args: AlignArgs) -> Result<()> {
    let config = PredictConfig {
        utterances: read_utterances(&args.input)?,
        ..PredictConfig::from(&args.model)
    };
    let assets = ModelAssets::load(&config)?;

    for example in assets.align(&config.utterances)? {
        println!("{}", serde_json::to_string(&example)?);
    }
    Ok(())
}

fn read_utterances(input: &InputArgs) -> Result<Vec<Utterance>> {
    let prep = Preprocessor::new();
    match &input.text {
        Some(text) => Ok(prep.utterance(0, text)?.into_iter().collect()),
        None => {
            let text = fs::read_to_string(&input.input_file)
                .with_context(|| format!("Cannot read input file '{}'", input.input_file))?;
            Ok(prep.utterances(&text)?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_file_skipping_blank_lines() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("in.txt");
        fs::write(&path, "si pagare\n\n[\"book\", \"paris\"]\n").unwrap();

        let input = InputArgs { input_file: path.display().to_string(), text: None };
        let utterances = read_utterances(&input).unwrap();
        assert_eq!(utterances.len(), 2);
        assert_eq!(utterances[1].words(), &["book", "paris"]);
    }

    #[test]
    fn test_inline_text_wins() {
        let input = InputArgs { input_file: "missing.txt".into(), text: Some("  hi  there ".into()) };
        let utterances = read_utterances(&input).unwrap();
        assert_eq!(utterances, vec![Utterance::new(["hi", "there"])]);
    }

    #[test]
    fn test_missing_input_file_names_path() {
        let input = InputArgs { input_file: "/nonexistent/in.txt".into(), text: None };
        let err = read_utterances(&input).unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/in.txt"));
    }
}
