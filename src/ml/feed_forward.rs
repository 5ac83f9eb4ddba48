// ============================================================
// Layer 5 — (Gated) Feed-Forward Block
// ============================================================
// With one activation this is the classic transformer FFN:
//
//   FFN(x) = act(x W_0 + b_0) W_out + b_out
//
// With several activations it becomes a gated linear unit: every
// inner projection reads the ORIGINAL input, and the outputs after
// the first one gate it multiplicatively:
//
//   GLU(x) = (act_0(x W_0) ⊙ act_1(x W_1) ⊙ ...) W_out
//
// e.g. [Gelu, Linear] gives GEGLU.
//
// Reference: Shazeer (2020) GLU Variants Improve Transformer

use burn::{
    module::Ignored,
    nn::{Initializer, Linear, LinearConfig},
    prelude::*,
};

use crate::ml::activation::Activation;

#[derive(Config, Debug)]
pub struct FeedForwardConfig {
    /// Width of the input (and of the output)
    pub d_model: usize,
    /// Width of every inner projection
    pub units: usize,
    /// One inner projection per entry; more than one enables gating
    pub activations: Vec<Activation>,
    #[config(default = true)]
    pub use_bias: bool,
    #[config(default = 0.02)]
    pub initializer_range: f64,
    /// Ask the training engine to recompute this block on the backward pass
    #[config(default = false)]
    pub recompute_grad: bool,
}

impl FeedForwardConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> FeedForward<B> {
        assert!(!self.activations.is_empty(), "FeedForward needs at least one activation");

        let dense = |d_in: usize, d_out: usize| {
            LinearConfig::new(d_in, d_out)
                .with_bias(self.use_bias)
                .with_initializer(Initializer::Normal { mean: 0.0, std: self.initializer_range })
                .init(device)
        };

        FeedForward {
            inner:       self.activations.iter().map(|_| dense(self.d_model, self.units)).collect(),
            output:      dense(self.units, self.d_model),
            activations: Ignored(self.activations.clone()),
        }
    }
}

#[derive(Module, Debug)]
pub struct FeedForward<B: Backend> {
    /// Inner projections, index i pairs with activations[i]
    pub inner:   Vec<Linear<B>>,
    pub output:  Linear<B>,
    activations: Ignored<Vec<Activation>>,
}

impl<B: Backend> FeedForward<B> {
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        let mut branches = self
            .inner
            .iter()
            .zip(self.activations.iter())
            .map(|(dense, act)| act.apply(dense.forward(x.clone())));

        // init() guarantees at least one branch
        let first = branches.next().expect("FeedForward has no inner projection");
        let gated = branches.fold(first, |acc, gate| acc * gate);

        self.output.forward(gated)
    }

    pub fn is_gated(&self) -> bool {
        self.inner.len() > 1
    }
}
