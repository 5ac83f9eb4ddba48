use anyhow::{ensure, Result};
use burn::{
    nn::{
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        Initializer,
        LayerNorm, LayerNormConfig,
    },
    prelude::*,
};
use serde_json::Value;

use crate::domain::bert_config::BertConfig;
use crate::ml::{
    activation::Activation,
    attention::{padding_mask, BertSelfAttention, BertSelfAttentionConfig},
    feed_forward::{FeedForward, FeedForwardConfig},
    output::{BertOutput, BertOutputConfig, HeadOutput},
    position::{PositionEmbedding, PositionEmbeddingConfig},
};

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally — do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct BertModelConfig {
    pub vocab_size:              usize,
    pub hidden_size:             usize,
    pub num_hidden_layers:       usize,
    pub num_attention_heads:     usize,
    pub intermediate_size:       usize,
    pub hidden_act:              Activation,
    pub hidden_dropout_prob:     f64,
    pub attention_dropout_prob:  f64,
    pub max_position_embeddings: usize,
    pub type_vocab_size:         usize,
    pub initializer_range:       f64,
    #[config(default = 1e-12)]
    pub layer_norm_eps:          f64,
    /// α of the hierarchical position decomposition, None disables it
    pub hierarchical_position:   Option<f64>,
    /// Use a GLU feed-forward: act(x W_0) ⊙ (x W_1)
    #[config(default = false)]
    pub gated_ffn:               bool,
    #[config(default = true)]
    pub with_pool:               bool,
    #[config(default = false)]
    pub with_nsp:                bool,
    #[config(default = false)]
    pub with_mlm:                bool,
}

impl BertModelConfig {
    /// Translate a bert_config.json into a model config.
    ///
    /// Besides the standard fields, these optional keys are honoured:
    /// `layer_norm_eps`, `hierarchical_position` (the α of the position
    /// decomposition), `gated_ffn`, and `with_nsp`/`with_mlm` for the
    /// heads a checkpoint was saved with.
    pub fn from_bert_config(cfg: &BertConfig) -> Result<Self> {
        ensure!(cfg.num_attention_heads > 0, "num_attention_heads must be positive");
        ensure!(
            cfg.hidden_size % cfg.num_attention_heads == 0,
            "hidden_size {} is not a multiple of num_attention_heads {}",
            cfg.hidden_size,
            cfg.num_attention_heads
        );

        Ok(Self::new(
            cfg.vocab_size,
            cfg.hidden_size,
            cfg.num_hidden_layers,
            cfg.num_attention_heads,
            cfg.intermediate_size,
            cfg.hidden_act.parse()?,
            cfg.hidden_dropout_prob,
            cfg.attention_prob_dropout_prob,
            cfg.max_position_embeddings,
            cfg.type_vocab_size,
            cfg.initializer_range,
        )
        .with_layer_norm_eps(cfg.extra.get("layer_norm_eps").and_then(Value::as_f64).unwrap_or(1e-12))
        .with_hierarchical_position(cfg.extra.get("hierarchical_position").and_then(Value::as_f64))
        .with_gated_ffn(flag(cfg, "gated_ffn"))
        .with_with_nsp(flag(cfg, "with_nsp"))
        .with_with_mlm(flag(cfg, "with_mlm")))
    }

    /// Record the optional heads in `cfg` so `from_bert_config` rebuilds them.
    pub fn store_heads(&self, cfg: &mut BertConfig) {
        for (key, on) in [("with_nsp", self.with_nsp), ("with_mlm", self.with_mlm)] {
            if on {
                cfg.extra.insert(key.into(), Value::Bool(true));
            } else {
                cfg.extra.remove(key);
            }
        }
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<BertModel<B>> {
        let init = Initializer::Normal { mean: 0.0, std: self.initializer_range };

        let token_embedding = EmbeddingConfig::new(self.vocab_size, self.hidden_size)
            .with_initializer(init.clone())
            .init(device);
        let segment_embedding = EmbeddingConfig::new(self.type_vocab_size, self.hidden_size)
            .with_initializer(init.clone())
            .init(device);
        let position_embedding =
            PositionEmbeddingConfig::new(self.max_position_embeddings, self.hidden_size)
                .with_hierarchical(self.hierarchical_position)
                .with_initializer(init)
                .init(device);

        let layers: Vec<BertLayer<B>> = (0..self.num_hidden_layers)
            .map(|_| self.build_layer(device))
            .collect();

        let heads = BertOutputConfig::new()
            .with_with_pool(self.with_pool)
            .with_with_nsp(self.with_nsp)
            .with_with_mlm(self.with_mlm)
            .with_hidden_size(Some(self.hidden_size))
            .with_embedding_size(Some(self.hidden_size))
            .with_vocab_size(Some(self.vocab_size))
            .with_hidden_act(Some(self.hidden_act.clone()))
            .with_layer_norm_eps(Some(self.layer_norm_eps))
            .with_initializer_range(self.initializer_range)
            .init(device)?;

        Ok(BertModel {
            token_embedding,
            segment_embedding,
            position_embedding,
            embedding_norm: LayerNormConfig::new(self.hidden_size)
                .with_epsilon(self.layer_norm_eps)
                .init(device),
            dropout: DropoutConfig::new(self.hidden_dropout_prob).init(),
            layers,
            heads,
        })
    }

    fn build_layer<B: Backend>(&self, device: &B::Device) -> BertLayer<B> {
        let head_size = self.hidden_size / self.num_attention_heads;
        let attention = BertSelfAttentionConfig::new(
            self.num_attention_heads,
            head_size,
            self.attention_dropout_prob,
        )
        .with_hidden_size(Some(self.hidden_size))
        .with_initializer_range(self.initializer_range)
        .init(device);

        let activations = if self.gated_ffn {
            vec![self.hidden_act.clone(), Activation::Linear]
        } else {
            vec![self.hidden_act.clone()]
        };
        let feed_forward = FeedForwardConfig::new(self.hidden_size, self.intermediate_size, activations)
            .with_initializer_range(self.initializer_range)
            .init(device);

        let norm = || {
            LayerNormConfig::new(self.hidden_size)
                .with_epsilon(self.layer_norm_eps)
                .init(device)
        };

        BertLayer {
            attention,
            attention_norm: norm(),
            feed_forward,
            output_norm: norm(),
            dropout: DropoutConfig::new(self.hidden_dropout_prob).init(),
        }
    }
}

fn flag(cfg: &BertConfig, key: &str) -> bool {
    cfg.extra.get(key).and_then(Value::as_bool).unwrap_or(false)
}

/// One post-norm encoder layer.
#[derive(Module, Debug)]
pub struct BertLayer<B: Backend> {
    pub attention:      BertSelfAttention<B>,
    pub attention_norm: LayerNorm<B>,
    pub feed_forward:   FeedForward<B>,
    pub output_norm:    LayerNorm<B>,
    pub dropout:        Dropout,
}

impl<B: Backend> BertLayer<B> {
    /// Returns the layer output and its attention weights.
    pub fn forward(&self, x: Tensor<B, 3>, mask: Option<Tensor<B, 4>>) -> (Tensor<B, 3>, Tensor<B, 4>) {
        let attn = self.attention.forward(x.clone(), x.clone(), x.clone(), mask);
        let x = self.attention_norm.forward(x + self.dropout.forward(attn.context));

        let ffn_out = self.feed_forward.forward(x.clone());
        let x = self.output_norm.forward(x + self.dropout.forward(ffn_out));

        (x, attn.weights)
    }
}

#[derive(Module, Debug)]
pub struct BertModel<B: Backend> {
    pub token_embedding:    Embedding<B>,
    pub segment_embedding:  Embedding<B>,
    pub position_embedding: PositionEmbedding<B>,
    pub embedding_norm:     LayerNorm<B>,
    pub dropout:            Dropout,
    pub layers:             Vec<BertLayer<B>>,
    pub heads:              BertOutput<B>,
}

pub struct BertModelOutput<B: Backend> {
    /// [batch, seq_len, hidden_size]
    pub sequence_output:   Tensor<B, 3>,
    /// One [batch, heads, seq_len, seq_len] tensor per layer
    pub attention_weights: Vec<Tensor<B, 4>>,
    pub heads:             Vec<HeadOutput<B>>,
}

impl<B: Backend> BertModel<B> {
    /// input_ids, token_type_ids, attention_mask: [batch, seq_len].
    ///
    /// Missing token_type_ids mean segment 0 everywhere; a missing
    /// attention_mask means no padding.
    pub fn forward(
        &self,
        input_ids:      Tensor<B, 2, Int>,
        token_type_ids: Option<Tensor<B, 2, Int>>,
        attention_mask: Option<Tensor<B, 2, Int>>,
    ) -> BertModelOutput<B> {
        let [batch, seq_len] = input_ids.dims();
        let device = input_ids.device();

        let token_type_ids =
            token_type_ids.unwrap_or_else(|| Tensor::zeros([batch, seq_len], &device));

        let x = self.token_embedding.forward(input_ids)
            + self.segment_embedding.forward(token_type_ids);
        let x = self.position_embedding.forward(x, None);
        let mut x = self.dropout.forward(self.embedding_norm.forward(x));

        let mask = attention_mask.map(padding_mask);
        let mut attention_weights = Vec::with_capacity(self.layers.len());
        for layer in &self.layers {
            let (out, weights) = layer.forward(x, mask.clone());
            x = out;
            attention_weights.push(weights);
        }

        let heads = self.heads.forward(x.clone(), &self.token_embedding);

        BertModelOutput { sequence_output: x, attention_weights, heads }
    }
}
