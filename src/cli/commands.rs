// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the subcommands `init`, `encode`, `show-config` and
// `lookup` with all their configurable flags.
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for missing args
//   - type conversion (string → usize, f64, PathBuf, etc.)
//
// Reference: Rust Book §12 (Building a CLI Program)

use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::application::{encode_use_case::EncodeConfig, init_use_case::InitConfig};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a randomly initialised encoder and save it as a checkpoint
    Init(InitArgs),

    /// Encode texts with a saved encoder and print the head outputs
    Encode(EncodeArgs),

    /// Print a bert_config.json with sorted keys
    ShowConfig(ShowConfigArgs),

    /// Print a run recorded in the model config store
    Lookup(LookupArgs),
}

/// Where recorded runs go; shared by init, encode and lookup.
#[derive(Args, Debug, Clone)]
pub struct RecordArgs {
    /// Record this run in the model config store under KEY
    #[arg(long, value_name = "KEY")]
    pub record: Option<String>,

    /// Free-text description stored with the record
    #[arg(long, default_value = "")]
    pub description: String,

    /// JSON file holding recorded runs
    #[arg(long, default_value = "model_configs.json")]
    pub store: PathBuf,
}

#[derive(Args, Debug)]
pub struct InitArgs {
    /// bert_config.json to build from (BERT-base defaults if omitted)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory for weights, config, tokenizer and logs
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: PathBuf,

    /// Text file (one passage per line) to build a word-level tokenizer from
    #[arg(long)]
    pub corpus: Option<PathBuf>,

    /// Vocabulary size when no --config is given
    #[arg(long, default_value_t = 30522)]
    pub vocab_size: usize,

    /// Enable hierarchical position embeddings with this alpha
    /// (0.4 is the usual choice)
    #[arg(long, value_name = "ALPHA")]
    pub hierarchical: Option<f64>,

    /// Use a gated (GLU) feed-forward block
    #[arg(long)]
    pub gated_ffn: bool,

    /// Build and save the next-sentence-prediction head
    #[arg(long)]
    pub nsp: bool,

    /// Build and save the masked-language-model head
    #[arg(long)]
    pub mlm: bool,

    #[command(flatten)]
    pub record: RecordArgs,
}

impl From<InitArgs> for InitConfig {
    fn from(a: InitArgs) -> Self {
        InitConfig {
            config_path:    a.config,
            checkpoint_dir: a.checkpoint_dir,
            corpus_path:    a.corpus,
            vocab_size:     a.vocab_size,
            hierarchical:   a.hierarchical,
            gated_ffn:      a.gated_ffn,
            nsp:            a.nsp,
            mlm:            a.mlm,
            record_key:     a.record.record,
            description:    a.record.description,
            store_path:     a.record.store,
        }
    }
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Text to encode; repeat the flag for several inputs
    #[arg(long = "text", required = true)]
    pub texts: Vec<String>,

    /// Second segment, paired with every --text
    #[arg(long)]
    pub pair: Option<String>,

    /// Directory written by `init`
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: PathBuf,

    /// Tokens per sequence including [CLS]/[SEP] and padding
    #[arg(long, default_value_t = 128)]
    pub max_seq_len: usize,

    /// Sequences per forward pass
    #[arg(long, default_value_t = 8)]
    pub batch_size: usize,

    /// Report the next-sentence-prediction head (saved by `init --nsp`)
    #[arg(long)]
    pub nsp: bool,

    /// Report the masked-language-model head (saved by `init --mlm`)
    #[arg(long)]
    pub mlm: bool,

    #[command(flatten)]
    pub record: RecordArgs,
}

impl From<EncodeArgs> for EncodeConfig {
    fn from(a: EncodeArgs) -> Self {
        EncodeConfig {
            checkpoint_dir: a.checkpoint_dir,
            texts:          a.texts,
            pair:           a.pair,
            max_seq_len:    a.max_seq_len,
            batch_size:     a.batch_size,
            nsp:            a.nsp,
            mlm:            a.mlm,
            record_key:     a.record.record,
            description:    a.record.description,
            store_path:     a.record.store,
        }
    }
}

#[derive(Args, Debug)]
pub struct ShowConfigArgs {
    /// bert_config.json to print
    pub path: PathBuf,
}

#[derive(Args, Debug)]
pub struct LookupArgs {
    /// Record key
    pub key: String,

    /// JSON file holding recorded runs
    #[arg(long, default_value = "model_configs.json")]
    pub store: PathBuf,
}
