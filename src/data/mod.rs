// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// From text to device tensors:
//
//   text / text pair
//       │
//       ▼
//   TokenizerStore    → [CLS] a [SEP] b [SEP], padded (infra)
//       │
//       ▼
//   EncodedInput      → ids, segment ids, mask (domain)
//       │
//       ▼
//   BertBatcher       → stacks inputs into [batch, seq] tensors
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Stacks encoded inputs into tensor batches
pub mod batcher;
