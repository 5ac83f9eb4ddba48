// ============================================================
// Layer 2 — InitUseCase
// ============================================================
// Creates a fresh checkpoint directory that `encode` can load:
//
//   Step 1: Load or default the BertConfig     (Layer 3 - domain)
//   Step 2: Build tokenizer from a corpus       (Layer 6 - infra)
//           (optional; widens vocab_size to fit)
//   Step 3: Apply architecture options          (Layer 3 - domain)
//   Step 4: Build the randomly initialised model (Layer 5 - ml)
//   Step 5: Save config + weights               (Layer 6 - infra)
//   Step 6: Record the run                      (Layer 6 - infra)
//
// Reference: Burn Book §5 (Records and Checkpointing)

use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use burn::tensor::backend::Backend;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::Level;

use crate::domain::{bert_config::BertConfig, traits::ModelConfigStore};
use crate::infra::{
    checkpoint::CheckpointManager,
    config_store::JsonConfigStore,
    logger::LoggerRegistry,
    tokenizer_store::TokenizerStore,
};
use crate::ml::model::BertModelConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitConfig {
    /// bert_config.json to start from; BERT-base defaults when None
    pub config_path:    Option<PathBuf>,
    pub checkpoint_dir: PathBuf,
    /// Plain-text corpus, one passage per line, for a word-level tokenizer
    pub corpus_path:    Option<PathBuf>,
    /// Used when no config file is given
    pub vocab_size:     usize,
    pub hierarchical:   Option<f64>,
    pub gated_ffn:      bool,
    /// Build the next-sentence-prediction head
    pub nsp:            bool,
    /// Build the masked-language-model head
    pub mlm:            bool,
    /// Key under which the run is recorded in the config store
    pub record_key:     Option<String>,
    pub description:    String,
    pub store_path:     PathBuf,
}

pub struct InitUseCase<'a> {
    config:  InitConfig,
    loggers: &'a LoggerRegistry,
}

impl<'a> InitUseCase<'a> {
    pub fn new(config: InitConfig, loggers: &'a LoggerRegistry) -> Self {
        Self { config, loggers }
    }

    /// Build and save a model; returns the config that was written.
    pub fn execute<B: Backend>(&self, device: &B::Device) -> Result<BertConfig> {
        let cfg = &self.config;
        let logger = self.loggers.get_logger(
            "init",
            cfg.checkpoint_dir.join("logs").join("init.log"),
            Level::INFO,
        )?;

        // ── Step 1: Base config ───────────────────────────────────────────────
        let mut bert = match &cfg.config_path {
            Some(path) => BertConfig::from_json_file(path)?,
            None => BertConfig::new(cfg.vocab_size),
        };

        // ── Step 2: Tokenizer ─────────────────────────────────────────────────
        if let Some(corpus) = &cfg.corpus_path {
            let text = fs::read_to_string(corpus)
                .with_context(|| format!("Cannot read corpus '{}'", corpus.display()))?;
            let lines: Vec<String> = text
                .lines()
                .filter(|l| !l.trim().is_empty())
                .map(str::to_string)
                .collect();

            let tokenizer = TokenizerStore::build_and_save(&cfg.checkpoint_dir, &lines, bert.vocab_size)?;
            let needed = tokenizer.required_vocab_size();
            if bert.vocab_size < needed {
                logger.in_scope(|| {
                    tracing::warn!(
                        "vocab_size {} is too small for the tokenizer; using {}",
                        bert.vocab_size,
                        needed
                    )
                });
                bert.vocab_size = needed;
            }
        }

        // ── Step 3: Architecture options ──────────────────────────────────────
        if let Some(alpha) = cfg.hierarchical {
            bert.extra.insert("hierarchical_position".into(), json!(alpha));
        }
        if cfg.gated_ffn {
            bert.extra.insert("gated_ffn".into(), json!(true));
        }

        // ── Step 4: Model ─────────────────────────────────────────────────────
        let model_cfg = BertModelConfig::from_bert_config(&bert)?
            .with_with_nsp(cfg.nsp)
            .with_with_mlm(cfg.mlm);
        model_cfg.store_heads(&mut bert);
        let model = model_cfg.init::<B>(device)?;

        // ── Step 5: Checkpoint ────────────────────────────────────────────────
        let ckpt = CheckpointManager::new(&cfg.checkpoint_dir);
        ckpt.save_config(&bert)?;
        ckpt.save_model(&model)?;
        logger.in_scope(|| {
            tracing::info!(
                "Initialised {}-layer encoder (hidden {}, vocab {}) in '{}'",
                bert.num_hidden_layers,
                bert.hidden_size,
                bert.vocab_size,
                cfg.checkpoint_dir.display()
            )
        });

        // ── Step 6: Record ────────────────────────────────────────────────────
        if let Some(key) = &cfg.record_key {
            let mut record = bert.to_dict();
            record.insert(
                "checkpoint_dir".into(),
                Value::String(cfg.checkpoint_dir.display().to_string()),
            );
            JsonConfigStore::new(&cfg.store_path).save(key, &cfg.description, record)?;
            logger.in_scope(|| tracing::info!("Recorded run as '{key}'"));
        }

        Ok(bert)
    }
}
