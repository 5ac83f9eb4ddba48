// ============================================================
// Layer 4 — BERT Input Batcher
// ============================================================
// Converts a Vec<EncodedInput> into device tensors.
//
// How batching works here:
//   Input:  N EncodedInputs, each padded to length S
//   Output: BertBatch with three [N, S] integer tensors
//
//   Each sequence is flattened into one long Vec, then reshaped:
//   [s1_t1, s1_t2, ..., s1_tS, s2_t1, ..., sN_tS] → [N, S]
//
// All inputs must already share one length; TokenizerStore pads
// every encoding to max_seq_len, so that holds for CLI inputs.
//
// Reference: Burn Book §4 (Batcher)

use anyhow::{ensure, Result};
use burn::prelude::*;

use crate::domain::encoded_input::EncodedInput;

/// A batch of BERT inputs; every tensor is [batch_size, seq_len].
#[derive(Debug, Clone)]
pub struct BertBatch<B: Backend> {
    pub input_ids:      Tensor<B, 2, Int>,
    pub token_type_ids: Tensor<B, 2, Int>,
    /// 1 = real token, 0 = padding
    pub attention_mask: Tensor<B, 2, Int>,
}

/// Holds the target device so tensors are created on the right GPU/CPU.
#[derive(Clone, Debug)]
pub struct BertBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> BertBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }

    /// Stack `items` into one batch.
    /// Fails on an empty list, on zero-length sequences, or on
    /// sequences of different lengths.
    pub fn batch(&self, items: Vec<EncodedInput>) -> Result<BertBatch<B>> {
        ensure!(!items.is_empty(), "Cannot batch zero inputs");
        ensure!(!items.iter().any(EncodedInput::is_empty), "Cannot batch a zero-length sequence");

        let batch_size = items.len();
        let seq_len    = items[0].len();
        ensure!(
            items.iter().all(|item| item.len() == seq_len),
            "All inputs in a batch must be padded to the same length"
        );

        let stack = |field: fn(&EncodedInput) -> &[u32]| {
            let flat: Vec<i32> = items
                .iter()
                .flat_map(|item| field(item).iter().map(|&x| x as i32))
                .collect();
            Tensor::<B, 1, Int>::from_ints(flat.as_slice(), &self.device)
                .reshape([batch_size, seq_len])
        };

        Ok(BertBatch {
            input_ids:      stack(|item| item.input_ids.as_slice()),
            token_type_ids: stack(|item| item.token_type_ids.as_slice()),
            attention_mask: stack(|item| item.attention_mask.as_slice()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    fn input(ids: Vec<u32>) -> EncodedInput {
        let n = ids.len();
        EncodedInput {
            input_ids:      ids,
            token_type_ids: vec![0; n],
            attention_mask: vec![1; n],
        }
    }

    #[test]
    fn test_batch_shapes_and_order() {
        let batcher = BertBatcher::<TestBackend>::new(Default::default());
        let batch = batcher
            .batch(vec![input(vec![101, 5, 102]), input(vec![101, 6, 102])])
            .unwrap();

        assert_eq!(batch.input_ids.dims(), [2, 3]);
        let ids: Vec<i64> = batch.input_ids.into_data().iter::<i64>().collect();
        assert_eq!(ids, vec![101, 5, 102, 101, 6, 102]);
    }

    #[test]
    fn test_rejects_ragged_and_empty_batches() {
        let batcher = BertBatcher::<TestBackend>::new(Default::default());
        assert!(batcher.batch(Vec::new()).is_err());
        assert!(batcher
            .batch(vec![input(vec![1, 2]), input(vec![1, 2, 3])])
            .is_err());
    }

    #[test]
    fn test_rejects_zero_length_sequences() {
        let batcher = BertBatcher::<TestBackend>::new(Default::default());
        let err = batcher.batch(vec![input(Vec::new()), input(Vec::new())]).unwrap_err();
        assert!(err.to_string().contains("zero-length"));
    }
}
