// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// This layer contains ALL Burn framework specific model code.
// Upper layers only see plain Vecs coming out of the Inferencer.
//
// What's in this layer:
//
//   activation.rs   — Activation functions selectable by name
//                     ("gelu", "relu", "tanh", ...)
//
//   attention.rs    — Multi-head scaled dot-product attention
//                     plus padding / causal mask builders
//
//   position.rs     — Trainable position embeddings, with an
//                     optional hierarchical decomposition that
//                     reaches n² positions from an n-row table
//
//   feed_forward.rs — Position-wise feed-forward block; with
//                     several activations it becomes a GLU
//
//   output.rs       — Pooler, next-sentence and masked-LM heads
//
//   model.rs        — The full encoder: embeddings → N layers
//                     → heads
//
//   inferencer.rs   — Loads a checkpoint and summarises outputs
//
// Reference: Burn Book §3 (Building Blocks)
//            Vaswani et al. (2017) Attention Is All You Need
//            Devlin et al. (2019) BERT

pub mod activation;

/// Multi-head self-attention and masks
pub mod attention;

/// Position embeddings (plain and hierarchical)
pub mod position;

/// Plain and gated feed-forward blocks
pub mod feed_forward;

/// Pooler / NSP / MLM output heads
pub mod output;

/// BERT encoder architecture
pub mod model;

/// Inference engine — loads a checkpoint and runs batches
pub mod inferencer;
