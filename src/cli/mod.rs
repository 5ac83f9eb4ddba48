// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All work is delegated to Layer 2 (application); this layer
// only routes and prints.
//
// Four commands are supported:
//   1. `init`        — build an encoder and save a checkpoint
//   2. `encode`      — run texts through a saved encoder
//   3. `show-config` — print a bert_config.json normalised
//   4. `lookup`      — print a recorded run
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, EncodeArgs, InitArgs, LookupArgs, ShowConfigArgs};

use crate::infra::logger::LoggerRegistry;
use crate::ml::inferencer::InferBackend;

/// Number of pooled values printed per input
const POOLED_PREVIEW: usize = 8;

#[derive(Parser, Debug)]
#[command(
    name = "bert-encoder",
    version = "0.1.0",
    about = "Build BERT encoders from bert_config.json files and encode text with them."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self, loggers: &LoggerRegistry) -> Result<()> {
        match self.command {
            Commands::Init(args)       => run_init(args, loggers),
            Commands::Encode(args)     => run_encode(args, loggers),
            Commands::ShowConfig(args) => run_show_config(args),
            Commands::Lookup(args)     => run_lookup(args),
        }
    }
}

fn run_init(args: InitArgs, loggers: &LoggerRegistry) -> Result<()> {
    use crate::application::init_use_case::InitUseCase;

    tracing::info!("Initialising encoder in '{}'", args.checkpoint_dir.display());
    let dir = args.checkpoint_dir.clone();
    let bert = InitUseCase::new(args.into(), loggers).execute::<InferBackend>(&Default::default())?;

    println!(
        "Saved {}-layer encoder (hidden {}, vocab {}) to '{}'",
        bert.num_hidden_layers,
        bert.hidden_size,
        bert.vocab_size,
        dir.display()
    );
    Ok(())
}

fn run_encode(args: EncodeArgs, loggers: &LoggerRegistry) -> Result<()> {
    use crate::application::encode_use_case::EncodeUseCase;

    tracing::info!("Encoding {} input(s)", args.texts.len());
    let report = EncodeUseCase::new(args.into(), loggers).execute::<InferBackend>(Default::default())?;

    for result in &report.results {
        println!("\n{}", result.text);

        let out = &result.output;
        if !out.pooled.is_empty() {
            let preview: Vec<String> = out
                .pooled
                .iter()
                .take(POOLED_PREVIEW)
                .map(|v| format!("{v:.4}"))
                .collect();
            let more = if out.pooled.len() > POOLED_PREVIEW { ", ..." } else { "" };
            println!("  pooled ({}): [{}{}]", out.pooled.len(), preview.join(", "), more);
        }
        if let &[is_next, not_next] = out.nsp.as_slice() {
            println!("  nsp: is_next={is_next:.4} not_next={not_next:.4}");
        }
        if !result.mlm_tokens.is_empty() {
            println!("  mlm: {}", result.mlm_tokens.join(" "));
        }
    }

    println!("\n{}", report.summary);
    Ok(())
}

fn run_show_config(args: ShowConfigArgs) -> Result<()> {
    use crate::application::config_use_case::show_config;

    println!("{}", show_config(&args.path)?);
    Ok(())
}

fn run_lookup(args: LookupArgs) -> Result<()> {
    use crate::application::config_use_case::lookup_record;

    let record = lookup_record(&args.store, &args.key)?;
    if record.is_empty() {
        println!("No record named '{}' in '{}'", args.key, args.store.display());
    } else {
        println!("{}", serde_json::to_string_pretty(&record)?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_encode_with_repeated_text() {
        let cli = Cli::try_parse_from([
            "bert-encoder", "encode", "--text", "a b", "--text", "c",
            "--pair", "d", "--nsp", "--record", "run1",
        ])
        .unwrap();

        match cli.command {
            Commands::Encode(args) => {
                assert_eq!(args.texts, vec!["a b", "c"]);
                assert_eq!(args.pair.as_deref(), Some("d"));
                assert!(args.nsp && !args.mlm);
                assert_eq!(args.max_seq_len, 128);
                assert_eq!(args.record.record.as_deref(), Some("run1"));
                assert_eq!(args.record.store, std::path::PathBuf::from("model_configs.json"));
            }
            other => panic!("expected encode, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_init_and_show_config() {
        let cli = Cli::try_parse_from([
            "bert-encoder", "init", "--hierarchical", "0.4", "--gated-ffn", "--mlm",
        ])
        .unwrap();
        let Commands::Init(args) = cli.command else { panic!("expected init") };
        assert_eq!(args.hierarchical, Some(0.4));
        assert!(args.gated_ffn);
        assert!(args.mlm && !args.nsp);
        assert_eq!(args.vocab_size, 30522);

        let cli = Cli::try_parse_from(["bert-encoder", "show-config", "cfg.json"]).unwrap();
        assert!(matches!(cli.command, Commands::ShowConfig(_)));
    }

    #[test]
    fn test_encode_requires_text() {
        assert!(Cli::try_parse_from(["bert-encoder", "encode"]).is_err());
    }
}
