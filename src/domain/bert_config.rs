// ============================================================
// Layer 3 — BertConfig Domain Type
// ============================================================
// The hyperparameters of a BERT encoder, as found in the
// `bert_config.json` files shipped with pretrained checkpoints.
//
// Field names match those files exactly so a config can be read,
// written back, and diffed without renaming anything.
//
// Keys this struct does not know about are NOT dropped. They are
// kept in `extra` and written back out, so a round trip through
// BertConfig never loses information.
//
// Reference: Devlin et al. (2019) BERT, Appendix A
//            serde docs, #[serde(flatten)]

use std::{collections::BTreeMap, fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Configuration of a BERT encoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BertConfig {
    /// Size of the token vocabulary
    pub vocab_size: usize,

    /// Width of every encoder layer and of the pooler
    pub hidden_size: usize,

    /// Number of stacked encoder layers
    pub num_hidden_layers: usize,

    /// Attention heads per encoder layer
    pub num_attention_heads: usize,

    /// Inner width of the feed-forward block
    pub intermediate_size: usize,

    /// Activation name used in the encoder and pooler ("gelu", "relu", ...)
    pub hidden_act: String,

    /// Dropout on embeddings, encoder and pooler dense outputs
    pub hidden_dropout_prob: f64,

    /// Dropout on the attention weights
    pub attention_prob_dropout_prob: f64,

    /// Rows of the trainable position table
    pub max_position_embeddings: usize,

    /// Size of the token_type_ids vocabulary (segment A / B)
    pub type_vocab_size: usize,

    /// Std-dev of the normal weight initializer
    pub initializer_range: f64,

    /// Unrecognised keys, kept verbatim for round trips
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Default for BertConfig {
    /// BERT-base defaults with an empty vocabulary.
    /// `from_dict` starts from here and overwrites what it is given.
    fn default() -> Self {
        Self {
            vocab_size:                  0,
            hidden_size:                 768,
            num_hidden_layers:           12,
            num_attention_heads:         12,
            intermediate_size:           3072,
            hidden_act:                  "gelu".to_string(),
            hidden_dropout_prob:         0.1,
            attention_prob_dropout_prob: 0.1,
            max_position_embeddings:     512,
            type_vocab_size:             2,
            initializer_range:           0.02,
            extra:                       BTreeMap::new(),
        }
    }
}

impl BertConfig {
    /// BERT-base config for the given vocabulary size.
    pub fn new(vocab_size: usize) -> Self {
        Self { vocab_size, ..Self::default() }
    }

    /// Build a config from a JSON object.
    ///
    /// Known fields are type checked; unknown keys land in `extra`.
    /// Missing fields keep their BERT-base default.
    pub fn from_dict(dict: Map<String, Value>) -> Result<Self> {
        serde_json::from_value(Value::Object(dict))
            .context("Invalid BertConfig field")
    }

    /// Read a config from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("Cannot read BertConfig from '{}'", path.display()))?;

        let value: Value = serde_json::from_str(&json)
            .with_context(|| format!("'{}' is not valid JSON", path.display()))?;

        match value {
            Value::Object(dict) => Self::from_dict(dict),
            other => anyhow::bail!(
                "'{}' must contain a JSON object, found {}",
                path.display(),
                other
            ),
        }
    }

    /// Serialise every field (including `extra`) into a JSON object.
    pub fn to_dict(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(dict)) => dict,
            // A struct with named fields always serialises to an object
            _ => Map::new(),
        }
    }

    /// Pretty JSON with sorted keys and a 2-space indent.
    pub fn to_json_string(&self) -> String {
        serde_json::to_string_pretty(&sort_keys(Value::Object(self.to_dict())))
            .unwrap_or_default()
    }

    /// Per-head width implied by hidden_size / num_attention_heads.
    pub fn head_size(&self) -> usize {
        self.hidden_size / self.num_attention_heads.max(1)
    }
}

/// Rebuild every object in `value` with its keys in sorted order.
/// Holds whether or not serde_json's `preserve_order` is enabled.
fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, sort_keys(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}
