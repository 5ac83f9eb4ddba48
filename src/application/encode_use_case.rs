// ============================================================
// Layer 2 — EncodeUseCase
// ============================================================
// Runs texts through a saved encoder:
//
//   Step 1: Load tokenizer + model from the checkpoint (Layer 6 / 5)
//   Step 2: Tokenise every text (optionally as a pair)  (Layer 6)
//   Step 3: Batch and encode, drawing a progress bar    (Layer 4 / 5)
//   Step 4: Record the run (optional)                   (Layer 6)
//
// Results stay as plain data; printing is Layer 1's job.

use std::{path::PathBuf, time::Instant};

use anyhow::{ensure, Result};
use burn::tensor::backend::Backend;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::Level;

use crate::data::batcher::BertBatcher;
use crate::domain::traits::{ModelConfigStore, TextEncoder};
use crate::infra::{
    checkpoint::CheckpointManager,
    config_store::JsonConfigStore,
    logger::LoggerRegistry,
    progress::{metrics_string, ProgressBar},
    tokenizer_store::TokenizerStore,
};
use crate::ml::inferencer::{EncodedOutput, HeadSelection, Inferencer};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodeConfig {
    pub checkpoint_dir: PathBuf,
    pub texts:          Vec<String>,
    /// Second segment paired with every text
    pub pair:           Option<String>,
    pub max_seq_len:    usize,
    pub batch_size:     usize,
    pub nsp:            bool,
    pub mlm:            bool,
    pub record_key:     Option<String>,
    pub description:    String,
    pub store_path:     PathBuf,
}

/// One encoded text with its MLM ids decoded back to tokens.
#[derive(Debug, Clone)]
pub struct EncodedText {
    pub text:       String,
    pub output:     EncodedOutput,
    pub mlm_tokens: Vec<String>,
}

pub struct EncodeReport {
    pub results: Vec<EncodedText>,
    /// Final progress bar line
    pub summary: String,
}

pub struct EncodeUseCase<'a> {
    config:  EncodeConfig,
    loggers: &'a LoggerRegistry,
}

impl<'a> EncodeUseCase<'a> {
    pub fn new(config: EncodeConfig, loggers: &'a LoggerRegistry) -> Self {
        Self { config, loggers }
    }

    pub fn execute<B: Backend>(&self, device: B::Device) -> Result<EncodeReport> {
        let cfg = &self.config;
        ensure!(!cfg.texts.is_empty(), "Nothing to encode");
        ensure!(cfg.batch_size > 0, "batch_size must be positive");

        let logger = self.loggers.get_logger(
            "encode",
            cfg.checkpoint_dir.join("logs").join("encode.log"),
            Level::INFO,
        )?;

        // ── Step 1: Tokenizer and model ───────────────────────────────────────
        let tokenizer  = TokenizerStore::load(&cfg.checkpoint_dir)?;
        let ckpt       = CheckpointManager::new(&cfg.checkpoint_dir);
        let heads      = HeadSelection { nsp: cfg.nsp, mlm: cfg.mlm };
        let inferencer = Inferencer::<B>::from_checkpoint(&ckpt, heads, device.clone())?;
        let batcher    = BertBatcher::<B>::new(device);

        // ── Step 2: Tokenise ──────────────────────────────────────────────────
        let encoded = cfg
            .texts
            .iter()
            .map(|t| tokenizer.encode(t, cfg.pair.as_deref(), cfg.max_seq_len))
            .collect::<Result<Vec<_>>>()?;

        // ── Step 3: Encode in batches ─────────────────────────────────────────
        let num_batches = encoded.len().div_ceil(cfg.batch_size);
        let mut progress = ProgressBar::new(num_batches, 1, 30)?;
        let mut outputs: Vec<EncodedOutput> = Vec::with_capacity(encoded.len());
        let mut tokens_seen = 0usize;
        let started = Instant::now();

        for (i, chunk) in encoded.chunks(cfg.batch_size).enumerate() {
            tokens_seen += chunk.iter().map(|e| e.real_len()).sum::<usize>();
            let batch = batcher.batch(chunk.to_vec())?;
            outputs.extend(inferencer.encode(batch));

            let metrics = metrics_string([("tokens", tokens_seen as f64)], "- ", 0);
            progress.update(i + 1, &metrics)?;
        }
        eprintln!();

        let step_time = started.elapsed().as_secs_f64() / num_batches as f64;
        let summary = progress.done(step_time);
        logger.in_scope(|| tracing::info!("Encoded {} inputs: {}", outputs.len(), summary));

        // ── Step 4: Record ────────────────────────────────────────────────────
        if let Some(key) = &cfg.record_key {
            let mut record = ckpt.load_config()?.to_dict();
            record.insert("max_seq_len".into(), Value::from(cfg.max_seq_len));
            record.insert("batch_size".into(), Value::from(cfg.batch_size));
            record.insert("num_inputs".into(), Value::from(cfg.texts.len()));
            JsonConfigStore::new(&cfg.store_path).save(key, &cfg.description, record)?;
            logger.in_scope(|| tracing::info!("Recorded run as '{key}'"));
        }

        let results = cfg
            .texts
            .iter()
            .zip(outputs)
            .map(|(text, output)| {
                let mlm_tokens = output
                    .mlm_ids
                    .iter()
                    .map(|&id| tokenizer.id_to_token(id).unwrap_or_else(|| "[UNK]".into()))
                    .collect();
                EncodedText { text: text.clone(), output, mlm_tokens }
            })
            .collect();

        Ok(EncodeReport { results, summary })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::init_use_case::{InitConfig, InitUseCase};
    use burn::backend::NdArray;
    use std::fs;

    type TestBackend = NdArray<f32>;

    fn setup(dir: &std::path::Path, heads: bool) -> PathBuf {
        let config_path = dir.join("bert_config.json");
        fs::write(
            &config_path,
            r#"{"vocab_size": 120, "hidden_size": 8, "num_hidden_layers": 1,
                "num_attention_heads": 2, "intermediate_size": 16,
                "max_position_embeddings": 16}"#,
        )
        .unwrap();
        let corpus = dir.join("corpus.txt");
        fs::write(&corpus, "the cat sat on the mat\nthe dog ran\n").unwrap();

        let ckpt_dir = dir.join("ckpt");
        let init = InitConfig {
            config_path:    Some(config_path),
            checkpoint_dir: ckpt_dir.clone(),
            corpus_path:    Some(corpus),
            vocab_size:     0,
            hierarchical:   None,
            gated_ffn:      false,
            nsp:            heads,
            mlm:            heads,
            record_key:     None,
            description:    String::new(),
            store_path:     dir.join("model_configs.json"),
        };
        InitUseCase::new(init, &LoggerRegistry::new())
            .execute::<TestBackend>(&Default::default())
            .unwrap();
        ckpt_dir
    }

    fn encode_config(dir: &std::path::Path, ckpt_dir: PathBuf) -> EncodeConfig {
        EncodeConfig {
            checkpoint_dir: ckpt_dir,
            texts:          vec!["the cat".into(), "the dog ran".into(), "sat".into()],
            pair:           Some("on the mat".into()),
            max_seq_len:    10,
            batch_size:     2,
            nsp:            true,
            mlm:            true,
            record_key:     Some("encode-run".into()),
            description:    "three short texts".into(),
            store_path:     dir.join("model_configs.json"),
        }
    }

    #[test]
    fn test_encode_all_texts_and_record() {
        let dir      = tempfile::tempdir().unwrap();
        let ckpt_dir = setup(dir.path(), true);
        let cfg      = encode_config(dir.path(), ckpt_dir.clone());
        let loggers  = LoggerRegistry::new();

        let report = EncodeUseCase::new(cfg.clone(), &loggers)
            .execute::<TestBackend>(Default::default())
            .unwrap();

        assert_eq!(report.results.len(), 3);
        assert_eq!(report.results[1].text, "the dog ran");
        for r in &report.results {
            assert_eq!(r.output.nsp.len(), 2);
            assert_eq!(r.mlm_tokens.len(), 10);
        }
        assert!(report.summary.starts_with("2/2 ["));

        let record = JsonConfigStore::new(&cfg.store_path).get("encode-run").unwrap();
        assert_eq!(record["num_inputs"], serde_json::json!(3));
        let log = fs::read_to_string(ckpt_dir.join("logs").join("encode.log")).unwrap();
        assert!(log.contains("Encoded 3 inputs"));
        assert!(log.contains("bert_encoder::application::encode_use_case"));
    }

    #[test]
    fn test_saved_heads_give_same_output_on_every_load() {
        let dir      = tempfile::tempdir().unwrap();
        let ckpt_dir = setup(dir.path(), true);
        let mut cfg  = encode_config(dir.path(), ckpt_dir);
        cfg.record_key = None;

        let run = || {
            EncodeUseCase::new(cfg.clone(), &LoggerRegistry::new())
                .execute::<TestBackend>(Default::default())
                .unwrap()
        };
        let (first, second) = (run(), run());

        for (a, b) in first.results.iter().zip(&second.results) {
            assert_eq!(a.output.nsp.len(), 2);
            assert_eq!(a.output.mlm_ids.len(), 10);
            assert_eq!(a.output, b.output);
        }
    }

    #[test]
    fn test_missing_head_is_an_error() {
        let dir      = tempfile::tempdir().unwrap();
        let ckpt_dir = setup(dir.path(), false);
        let loggers  = LoggerRegistry::new();

        let mut cfg = encode_config(dir.path(), ckpt_dir);
        cfg.record_key = None;
        let err = EncodeUseCase::new(cfg.clone(), &loggers)
            .execute::<TestBackend>(Default::default())
            .err()
            .unwrap();
        assert!(err.to_string().contains("--nsp"));

        cfg.nsp = false;
        cfg.mlm = false;
        let report = EncodeUseCase::new(cfg, &loggers)
            .execute::<TestBackend>(Default::default())
            .unwrap();
        assert_eq!(report.results[0].output.pooled.len(), 8);
    }

    #[test]
    fn test_rejects_empty_input_and_missing_checkpoint() {
        let dir     = tempfile::tempdir().unwrap();
        let loggers = LoggerRegistry::new();

        let mut cfg = encode_config(dir.path(), dir.path().join("nothing"));
        assert!(EncodeUseCase::new(cfg.clone(), &loggers)
            .execute::<TestBackend>(Default::default())
            .is_err());

        cfg.texts.clear();
        assert!(EncodeUseCase::new(cfg, &loggers)
            .execute::<TestBackend>(Default::default())
            .is_err());
    }
}
