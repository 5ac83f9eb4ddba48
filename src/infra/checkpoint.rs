// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores encoder weights using Burn's CompactRecorder.
//
// What a checkpoint directory holds:
//   1. model.mpk.gz       — all learned parameters
//   2. bert_config.json   — the architecture the weights belong to
//
// The config is saved next to the weights because loading needs
// the exact architecture (hidden size, layer count, ...) to build
// an empty model before the weights can be poured into it.
//
// Burn's CompactRecorder:
//   - Serialises model parameters to MessagePack format
//   - Stores floats at half precision, so loaded weights match the
//     saved ones to about 1e-3, not bit for bit
//   - Compresses with gzip
//   - Type-safe: loading fails if the architecture doesn't match
//
// Layout:
//   checkpoints/
//     model.mpk.gz
//     bert_config.json
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use std::{fs, path::{Path, PathBuf}};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};

use crate::domain::bert_config::BertConfig;
use crate::ml::model::BertModel;

const MODEL_FILE:  &str = "model";
const CONFIG_FILE: &str = "bert_config.json";

/// Manages the weights and config stored in one directory.
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write the model weights to `{dir}/model.mpk.gz`.
    /// The recorder appends the extension itself.
    pub fn save_model<B: Backend>(&self, model: &BertModel<B>) -> Result<()> {
        self.ensure_dir()?;
        let path = self.dir.join(MODEL_FILE);

        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

        tracing::debug!("Saved model weights to '{}'", path.display());
        Ok(())
    }

    /// Load saved weights into `model`, which must have the saved architecture.
    pub fn load_model<B: Backend>(
        &self,
        model:  BertModel<B>,
        device: &B::Device,
    ) -> Result<BertModel<B>> {
        let path = self.dir.join(MODEL_FILE);

        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| {
                format!(
                    "Cannot load checkpoint '{}'. Have you run 'init' first?",
                    path.display()
                )
            })?;

        Ok(model.load_record(record))
    }

    pub fn save_config(&self, cfg: &BertConfig) -> Result<()> {
        self.ensure_dir()?;
        let path = self.dir.join(CONFIG_FILE);

        fs::write(&path, cfg.to_json_string())
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

        tracing::debug!("Saved BERT config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<BertConfig> {
        BertConfig::from_json_file(self.dir.join(CONFIG_FILE))
    }

    fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", self.dir.display()))
    }
}
