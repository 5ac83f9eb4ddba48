// ============================================================
// Layer 5 — Trainable Position Embedding
// ============================================================
// Self-attention is permutation-invariant, so the position of
// every token has to be injected explicitly. Here each position
// owns one learned row of a [max_positions, dim] table.
//
// Merge modes (how the position vector meets the input):
//   Add    → x + e
//   Mul    → x * (1 + e)
//   Zero   → e                  (input discarded)
//   Concat → [x, e]             (along the feature axis)
//
// Hierarchical decomposition lets a table of n rows serve up to
// n² positions without retraining. With factor α:
//
//   u_i  = (t_i - α t_0) / (1 - α)
//   e(p) = α u[p / n] + (1 - α) u[p mod n]
//
// For p < n this reproduces t_p exactly, so a trained table keeps
// its meaning for the positions it was trained on.
//
// Reference: Su (2020), hierarchical decomposition of position encodings
//            Burn Book §3 (Building Blocks)

use burn::{
    module::{Ignored, Param},
    nn::Initializer,
    prelude::*,
    tensor::module::embedding,
};

/// α used when hierarchical decomposition is switched on without a value.
pub const DEFAULT_HIERARCHICAL_ALPHA: f64 = 0.4;

#[derive(Config, Debug, PartialEq)]
pub enum MergeMode {
    Add,
    Mul,
    Zero,
    Concat,
}

#[derive(Config, Debug)]
pub struct PositionEmbeddingConfig {
    /// Rows of the table (maximum position without decomposition)
    pub input_dim: usize,
    /// Width of each position vector
    pub output_dim: usize,
    #[config(default = "MergeMode::Add")]
    pub merge_mode: MergeMode,
    /// α of the hierarchical decomposition, None disables it
    pub hierarchical: Option<f64>,
    #[config(default = "Initializer::Zeros")]
    pub initializer: Initializer,
}

impl PositionEmbeddingConfig {
    /// Turn on hierarchical decomposition with α = 0.4.
    pub fn with_default_hierarchy(self) -> Self {
        self.with_hierarchical(Some(DEFAULT_HIERARCHICAL_ALPHA))
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> PositionEmbedding<B> {
        PositionEmbedding {
            embeddings:   self.initializer.init([self.input_dim, self.output_dim], device),
            merge_mode:   Ignored(self.merge_mode.clone()),
            hierarchical: Ignored(self.hierarchical),
        }
    }
}

#[derive(Module, Debug)]
pub struct PositionEmbedding<B: Backend> {
    /// [input_dim, output_dim]
    pub embeddings: Param<Tensor<B, 2>>,
    merge_mode:     Ignored<MergeMode>,
    hierarchical:   Ignored<Option<f64>>,
}

impl<B: Backend> PositionEmbedding<B> {
    /// Merge position vectors into `inputs` ([batch, seq, dim]).
    ///
    /// `position_ids` ([batch, seq] or [1, seq]) overrides the default
    /// 0..seq positions.
    ///
    /// # Panics
    /// Without hierarchical decomposition, if a position is past the
    /// end of the table.
    pub fn forward(
        &self,
        inputs:       Tensor<B, 3>,
        position_ids: Option<Tensor<B, 2, Int>>,
    ) -> Tensor<B, 3> {
        let [batch, seq_len, _] = inputs.dims();
        let embeddings = self.lookup(batch, seq_len, position_ids, &inputs.device());

        match *self.merge_mode {
            MergeMode::Add    => inputs + embeddings,
            MergeMode::Mul    => inputs * embeddings.add_scalar(1.0),
            MergeMode::Zero   => embeddings,
            MergeMode::Concat => Tensor::cat(vec![inputs, embeddings], 2),
        }
    }

    /// Position vectors for every (batch, seq) slot: [batch, seq, output_dim].
    pub fn lookup(
        &self,
        batch:        usize,
        seq_len:      usize,
        position_ids: Option<Tensor<B, 2, Int>>,
        device:       &B::Device,
    ) -> Tensor<B, 3> {
        let table = self.embeddings.val();
        let [rows, dim] = table.dims();

        match (*self.hierarchical, position_ids) {
            (Some(alpha), ids) => {
                let ids = ids
                    .map(|ids| ids.expand([batch, seq_len]))
                    .unwrap_or_else(|| sequential_ids(batch, seq_len, device));
                hierarchical_lookup(table, ids, alpha)
            }
            (None, Some(ids)) => embedding(table, ids.expand([batch, seq_len])),
            (None, None) => {
                assert!(
                    seq_len <= rows,
                    "sequence length {seq_len} exceeds {rows} position embeddings"
                );
                table
                    .slice([0..seq_len, 0..dim])
                    .unsqueeze::<3>()
                    .expand([batch, seq_len, dim])
            }
        }
    }
}

/// 0..seq_len for every row of the batch
fn sequential_ids<B: Backend>(batch: usize, seq_len: usize, device: &B::Device) -> Tensor<B, 2, Int> {
    Tensor::<B, 1, Int>::arange(0..seq_len as i64, device)
        .unsqueeze::<2>()
        .expand([batch, seq_len])
}

fn hierarchical_lookup<B: Backend>(
    table: Tensor<B, 2>,
    ids:   Tensor<B, 2, Int>,
    alpha: f64,
) -> Tensor<B, 3> {
    let [rows, dim] = table.dims();

    let first = table.clone().slice([0..1, 0..dim]).expand([rows, dim]);
    let table = (table - first.mul_scalar(alpha)).div_scalar(1.0 - alpha);

    let n    = rows as i64;
    let high = ids.clone().div_scalar(n);
    let low  = ids - high.clone().mul_scalar(n);

    embedding(table.clone(), high).mul_scalar(alpha)
        + embedding(table, low).mul_scalar(1.0 - alpha)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use burn::{backend::NdArray, tensor::Distribution};

    type TestBackend = NdArray<f32>;

    fn to_vec<const D: usize>(t: Tensor<TestBackend, D>) -> Vec<f32> {
        t.into_data().iter::<f32>().collect()
    }

    fn config(rows: usize, dim: usize) -> PositionEmbeddingConfig {
        PositionEmbeddingConfig::new(rows, dim)
            .with_initializer(Initializer::Normal { mean: 0.0, std: 1.0 })
    }

    #[test]
    fn test_zero_mode_is_identical_across_batch_and_calls() {
        let device = Default::default();
        let pe = config(16, 4).with_merge_mode(MergeMode::Zero).init::<TestBackend>(&device);
        let x = Tensor::<TestBackend, 3>::random([3, 5, 4], Distribution::Default, &device);

        let a = to_vec(pe.forward(x.clone(), None));
        let b = to_vec(pe.forward(x, None));
        assert_eq!(a, b);

        let per_row = 5 * 4;
        assert_eq!(a[..per_row], a[per_row..2 * per_row]);
        assert_eq!(a[..per_row], a[2 * per_row..]);
    }

    #[test]
    fn test_add_and_mul_modes() {
        let device = Default::default();
        let x = Tensor::<TestBackend, 3>::ones([1, 3, 2], &device);

        let add = config(8, 2).init::<TestBackend>(&device);
        let table = to_vec(add.embeddings.val().slice([0..3, 0..2]));
        for (got, e) in to_vec(add.forward(x.clone(), None)).into_iter().zip(&table) {
            assert_abs_diff_eq!(got, 1.0 + e, epsilon = 1e-6);
        }

        let mul = config(8, 2).with_merge_mode(MergeMode::Mul).init::<TestBackend>(&device);
        let table = to_vec(mul.embeddings.val().slice([0..3, 0..2]));
        let x = x.mul_scalar(2.0);
        for (got, e) in to_vec(mul.forward(x, None)).into_iter().zip(&table) {
            assert_abs_diff_eq!(got, 2.0 * (1.0 + e), epsilon = 1e-5);
        }
    }

    #[test]
    fn test_concat_mode_widens_features() {
        let device = Default::default();
        let pe = config(8, 3).with_merge_mode(MergeMode::Concat).init::<TestBackend>(&device);
        let x = Tensor::<TestBackend, 3>::random([2, 4, 5], Distribution::Default, &device);

        let out = pe.forward(x.clone(), None);
        assert_eq!(out.dims(), [2, 4, 8]);

        let table = to_vec(pe.embeddings.val().slice([0..4, 0..3]));
        let inputs = to_vec(x);
        let out = to_vec(out);
        for b in 0..2 {
            for s in 0..4 {
                let row = &out[(b * 4 + s) * 8..(b * 4 + s + 1) * 8];
                // leading columns carry the input unchanged
                assert_eq!(row[..5], inputs[(b * 4 + s) * 5..(b * 4 + s + 1) * 5]);
                // trailing columns are the position row, same for every batch element
                assert_eq!(row[5..], table[s * 3..(s + 1) * 3]);
            }
        }
    }

    #[test]
    fn test_custom_position_ids() {
        let device = Default::default();
        let pe = config(8, 2).with_merge_mode(MergeMode::Zero).init::<TestBackend>(&device);
        let ids = Tensor::<TestBackend, 2, Int>::from_ints([[7, 0]], &device);
        let x = Tensor::<TestBackend, 3>::zeros([1, 2, 2], &device);

        let got = to_vec(pe.forward(x, Some(ids)));
        let table = to_vec(pe.embeddings.val());
        assert_eq!(got[..2], table[14..16]);
        assert_eq!(got[2..], table[..2]);
    }

    #[test]
    #[should_panic]
    fn test_too_long_without_hierarchy_panics() {
        let device = Default::default();
        let pe = config(4, 2).init::<TestBackend>(&device);
        let x = Tensor::<TestBackend, 3>::zeros([1, 5, 2], &device);
        pe.forward(x, None);
    }

    #[test]
    fn test_hierarchy_reaches_square_of_table_size() {
        let device = Default::default();
        let rows = 4;
        let pe = config(rows, 8)
            .with_merge_mode(MergeMode::Zero)
            .with_default_hierarchy()
            .init::<TestBackend>(&device);
        let x = Tensor::<TestBackend, 3>::zeros([1, rows * rows, 8], &device);

        let out = to_vec(pe.forward(x, None));
        assert!(out.iter().all(|v| v.is_finite()));

        let vectors: Vec<&[f32]> = out.chunks(8).collect();
        for i in 0..vectors.len() {
            for j in i + 1..vectors.len() {
                assert_ne!(vectors[i], vectors[j], "positions {i} and {j} collide");
            }
        }
    }

    #[test]
    fn test_hierarchy_preserves_trained_positions() {
        let device = Default::default();
        let pe = config(6, 3)
            .with_merge_mode(MergeMode::Zero)
            .with_hierarchical(Some(0.3))
            .init::<TestBackend>(&device);
        let x = Tensor::<TestBackend, 3>::zeros([1, 6, 3], &device);

        let out = to_vec(pe.forward(x, None));
        for (got, want) in out.into_iter().zip(to_vec(pe.embeddings.val())) {
            assert_abs_diff_eq!(got, want, epsilon = 1e-5);
        }
    }
}
