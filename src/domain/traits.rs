// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer talks to persistence and tokenisation
// through these traits only. The concrete implementations live
// in Layer 6 (infra):
//
//   ModelConfigStore → JsonConfigStore (one JSON file of entries)
//   TextEncoder      → TokenizerStore  (HuggingFace tokenizer.json)
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;
use serde_json::{Map, Value};

use crate::domain::encoded_input::EncodedInput;

// ─── ModelConfigStore ─────────────────────────────────────────────────────────
/// A keyed store of model configurations, one entry per run.
pub trait ModelConfigStore {
    /// Insert or overwrite the entry under `key`.
    /// The stored entry carries `model_desc` and an `execute_time` stamp.
    fn save(&self, key: &str, model_desc: &str, config: Map<String, Value>) -> Result<()>;

    /// Fetch the entry under `key`.
    /// An absent key yields an empty map, not an error.
    fn get(&self, key: &str) -> Result<Map<String, Value>>;
}

// ─── TextEncoder ──────────────────────────────────────────────────────────────
/// Anything that can turn text into padded BERT inputs.
pub trait TextEncoder {
    /// Encode one sentence, or a sentence pair when `pair` is given.
    fn encode(&self, text: &str, pair: Option<&str>, max_seq_len: usize) -> Result<EncodedInput>;

    /// Map a token id back to its string form
    fn id_to_token(&self, id: u32) -> Option<String>;
}
