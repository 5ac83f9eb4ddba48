// ============================================================
// Layer 3 — EncodedInput Domain Type
// ============================================================
// One tokenised sequence, ready to be batched.
//
// BERT takes three parallel integer sequences of equal length:
//
//   input_ids       [CLS] tok tok [SEP] tok tok [SEP] [PAD] [PAD]
//   token_type_ids    0    0   0    0    1   1    1     0     0
//   attention_mask    1    1   1    1    1   1    1     0     0
//
// token_type_ids selects the segment embedding (sentence A or B),
// attention_mask marks real tokens (1) versus padding (0).
//
// Reference: Devlin et al. (2019) BERT, Figure 2

use serde::{Deserialize, Serialize};

/// A padded BERT input sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedInput {
    pub input_ids:      Vec<u32>,
    pub token_type_ids: Vec<u32>,
    pub attention_mask: Vec<u32>,
}

impl EncodedInput {
    /// Pad (or truncate) all three sequences to exactly `len`.
    /// Padding uses id 0, segment 0 and mask 0.
    pub fn padded(mut self, len: usize, pad_id: u32) -> Self {
        self.input_ids.resize(len, pad_id);
        self.token_type_ids.resize(len, 0);
        self.attention_mask.resize(len, 0);
        self
    }

    /// Sequence length including padding
    pub fn len(&self) -> usize {
        self.input_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.input_ids.is_empty()
    }

    /// Number of real (unpadded) tokens
    pub fn real_len(&self) -> usize {
        self.attention_mask.iter().filter(|&&m| m != 0).count()
    }
}
