// ============================================================
// Layer 5 — Multi-Head Self-Attention
// ============================================================
// Scaled dot-product attention split across several heads:
//
//   Q = X_q W_q,  K = X_k W_k,  V = X_v W_v         (projections)
//   split each into [batch, heads, seq, head_dim]
//   A = softmax(Q Kᵀ / √key_size + mask)           (weights)
//   O = merge_heads(dropout(A) V) W_o               (output)
//
// The mask is additive: 0 where attention is allowed and
// MASK_VALUE (a large negative number) where it is not, so
// masked scores vanish after the softmax.
//
// Both the output and the attention weights are returned; the
// weights are the undropped softmax distribution so callers can
// inspect or plot them.
//
// Reference: Vaswani et al. (2017) Attention Is All You Need §3.2
//            Burn Book §3 (Building Blocks)

use burn::{
    nn::{Dropout, DropoutConfig, Initializer, Linear, LinearConfig},
    prelude::*,
    tensor::{activation::softmax, TensorData},
};

/// Additive bias placed on disallowed (query, key) pairs.
///
/// A row where every key is masked ends up with equal scores and
/// softmaxes to a uniform distribution, never NaN.
pub const MASK_VALUE: f32 = -1e9;

#[derive(Config, Debug)]
pub struct BertSelfAttentionConfig {
    pub num_heads: usize,
    /// Per-head width of the value projection
    pub head_size: usize,
    /// Dropout on the attention weights
    pub attention_dropout: f64,
    /// Per-head width of the query/key projections, defaults to `head_size`
    pub key_size: Option<usize>,
    /// Model width in and out, defaults to `num_heads * head_size`
    pub hidden_size: Option<usize>,
    /// When set, inputs with any other batch size are rejected
    pub batch_size: Option<usize>,
    #[config(default = true)]
    pub use_bias: bool,
    #[config(default = 0.02)]
    pub initializer_range: f64,
    /// Ask the training engine to recompute this block on the backward pass
    #[config(default = false)]
    pub recompute_grad: bool,
}

impl BertSelfAttentionConfig {
    pub fn key_size(&self) -> usize {
        self.key_size.unwrap_or(self.head_size)
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size.unwrap_or(self.num_heads * self.head_size)
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> BertSelfAttention<B> {
        let hidden = self.hidden_size();
        let key_width   = self.key_size() * self.num_heads;
        let value_width = self.head_size * self.num_heads;

        let dense = |d_in: usize, d_out: usize| {
            LinearConfig::new(d_in, d_out)
                .with_bias(self.use_bias)
                .with_initializer(Initializer::Normal { mean: 0.0, std: self.initializer_range })
                .init(device)
        };

        BertSelfAttention {
            query:       dense(hidden, key_width),
            key:         dense(hidden, key_width),
            value:       dense(hidden, value_width),
            output:      dense(value_width, hidden),
            dropout:     DropoutConfig::new(self.attention_dropout).init(),
            num_heads:   self.num_heads,
            head_size:   self.head_size,
            key_size:    self.key_size(),
            hidden_size: hidden,
            batch_size:  self.batch_size.unwrap_or(0),
        }
    }
}

#[derive(Module, Debug)]
pub struct BertSelfAttention<B: Backend> {
    pub query:   Linear<B>,
    pub key:     Linear<B>,
    pub value:   Linear<B>,
    pub output:  Linear<B>,
    pub dropout: Dropout,
    num_heads:   usize,
    head_size:   usize,
    key_size:    usize,
    hidden_size: usize,
    // 0 = any batch size
    batch_size:  usize,
}

pub struct AttentionOutput<B: Backend> {
    /// [batch, query_len, hidden_size]
    pub context: Tensor<B, 3>,
    /// [batch, num_heads, query_len, key_len]
    pub weights: Tensor<B, 4>,
}

impl<B: Backend> BertSelfAttention<B> {
    /// Attend from `query` over `key`/`value`.
    ///
    /// # Panics
    /// If the three inputs disagree on batch size, if key and value
    /// lengths differ, or if any last dimension is not `hidden_size`.
    pub fn forward(
        &self,
        query: Tensor<B, 3>,
        key:   Tensor<B, 3>,
        value: Tensor<B, 3>,
        mask:  Option<Tensor<B, 4>>,
    ) -> AttentionOutput<B> {
        let [batch, q_len, q_dim] = query.dims();
        let [k_batch, k_len, k_dim] = key.dims();
        let [v_batch, v_len, v_dim] = value.dims();

        assert!(
            batch == k_batch && batch == v_batch,
            "query/key/value batch sizes differ: {batch}, {k_batch}, {v_batch}"
        );
        assert_eq!(k_len, v_len, "key and value lengths differ");
        for dim in [q_dim, k_dim, v_dim] {
            assert_eq!(dim, self.hidden_size, "input width must equal hidden_size");
        }
        if self.batch_size != 0 {
            assert_eq!(batch, self.batch_size, "batch size does not match the configured one");
        }

        let q = split_heads(self.query.forward(query), self.num_heads, self.key_size);
        let k = split_heads(self.key.forward(key), self.num_heads, self.key_size);
        let v = split_heads(self.value.forward(value), self.num_heads, self.head_size);

        let (context, weights) =
            scaled_dot_product_attention(q, k, v, mask, &self.dropout, self.key_size);

        let context = self.output.forward(merge_heads(context));
        debug_assert_eq!(context.dims(), [batch, q_len, self.hidden_size]);

        AttentionOutput { context, weights }
    }
}

/// [batch, seq, heads * head_dim] → [batch, heads, seq, head_dim]
pub fn split_heads<B: Backend>(x: Tensor<B, 3>, num_heads: usize, head_dim: usize) -> Tensor<B, 4> {
    let [batch, seq, width] = x.dims();
    assert_eq!(width, num_heads * head_dim, "cannot split {width} into {num_heads} heads of {head_dim}");
    x.reshape([batch, seq, num_heads, head_dim]).swap_dims(1, 2)
}

/// [batch, heads, seq, head_dim] → [batch, seq, heads * head_dim]
pub fn merge_heads<B: Backend>(x: Tensor<B, 4>) -> Tensor<B, 3> {
    let [batch, heads, seq, head_dim] = x.dims();
    x.swap_dims(1, 2).reshape([batch, seq, heads * head_dim])
}

/// softmax(q kᵀ / √key_size + mask) · v, per head.
///
/// Returns `(context, weights)`; dropout only touches the copy of the
/// weights that multiplies `v`, and is a no-op outside autodiff backends.
pub fn scaled_dot_product_attention<B: Backend>(
    q:        Tensor<B, 4>,
    k:        Tensor<B, 4>,
    v:        Tensor<B, 4>,
    mask:     Option<Tensor<B, 4>>,
    dropout:  &Dropout,
    key_size: usize,
) -> (Tensor<B, 4>, Tensor<B, 4>) {
    let scores = q.matmul(k.swap_dims(2, 3)) / (key_size as f64).sqrt();

    let scores = match mask {
        Some(mask) => {
            let shape = scores.dims();
            scores + mask.expand(shape)
        }
        None => scores,
    };

    let weights = softmax(scores, 3);
    let context = dropout.forward(weights.clone()).matmul(v);

    (context, weights)
}

/// Additive mask from a 0/1 attention mask of shape [batch, key_len].
/// Result: [batch, 1, 1, key_len], broadcast over heads and queries.
pub fn padding_mask<B: Backend>(attention_mask: Tensor<B, 2, Int>) -> Tensor<B, 4> {
    let [batch, key_len] = attention_mask.dims();
    attention_mask
        .float()
        .neg()
        .add_scalar(1.0)
        .mul_scalar(MASK_VALUE)
        .reshape([batch, 1, 1, key_len])
}

/// Additive mask hiding future positions: [1, 1, seq, seq].
pub fn causal_mask<B: Backend>(seq_len: usize, device: &B::Device) -> Tensor<B, 4> {
    let values: Vec<f32> = (0..seq_len)
        .flat_map(|q| (0..seq_len).map(move |k| if k > q { MASK_VALUE } else { 0.0 }))
        .collect();
    Tensor::from_data(TensorData::new(values, [1, 1, seq_len, seq_len]), device)
}
