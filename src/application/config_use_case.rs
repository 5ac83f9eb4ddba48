// ============================================================
// Layer 2 — Config Use Cases
// ============================================================
// Read-only views over stored configuration:
//
//   show_config   — parse a bert_config.json and print it back
//                   normalised (sorted keys, 2-space indent)
//   lookup_record — fetch one run from the model config store

use std::path::Path;

use anyhow::Result;
use serde_json::{Map, Value};

use crate::domain::{bert_config::BertConfig, traits::ModelConfigStore};
use crate::infra::config_store::JsonConfigStore;

/// Normalised JSON of the config at `path`.
pub fn show_config(path: impl AsRef<Path>) -> Result<String> {
    let cfg = BertConfig::from_json_file(path)?;
    tracing::debug!(
        "Config: {} layers, {} heads of size {}",
        cfg.num_hidden_layers,
        cfg.num_attention_heads,
        cfg.head_size()
    );
    Ok(cfg.to_json_string())
}

/// The entry stored under `key`; empty when the key was never saved.
pub fn lookup_record(store_path: impl AsRef<Path>, key: &str) -> Result<Map<String, Value>> {
    JsonConfigStore::new(store_path.as_ref()).get(key)
}
