// ============================================================
// Layer 5 — Output Heads (Pooler / NSP / MLM)
// ============================================================
// Turns the encoder's sequence output into task outputs:
//
//   Pooler : take the [CLS] position, dense + tanh
//   NSP    : 2-way softmax over the pooled vector
//            (replaces the pooled vector in the output list)
//   MLM    : dense + act → LayerNorm → × token_embeddingsᵀ
//            → + bias → softmax over the vocabulary
//
// The MLM decoder owns no weight matrix of its own: it reuses the
// input token embedding table, transposed (weight tying). The
// caller passes that table in at forward time, so the parameter
// lives in exactly one place in the module tree.
//
// Reference: Devlin et al. (2019) BERT §3.1
//            Press & Wolf (2017) Using the Output Embedding

use anyhow::{bail, Context, Result};
use burn::{
    module::{Ignored, Param},
    nn::{Embedding, Initializer, LayerNorm, LayerNormConfig, Linear, LinearConfig},
    prelude::*,
};

use crate::ml::activation::Activation;

#[derive(Config, Debug)]
pub struct BertOutputConfig {
    #[config(default = true)]
    pub with_pool: bool,
    #[config(default = false)]
    pub with_nsp: bool,
    #[config(default = false)]
    pub with_mlm: bool,
    #[config(default = "Activation::Tanh")]
    pub pool_activation: Activation,
    #[config(default = "Activation::Softmax")]
    pub mlm_activation: Activation,
    /// Required by the pooler
    pub hidden_size: Option<usize>,
    /// Required by MLM: width of the token embedding table
    pub embedding_size: Option<usize>,
    /// Required by MLM: rows of the token embedding table
    pub vocab_size: Option<usize>,
    /// Required by MLM: activation of the MLM dense layer
    pub hidden_act: Option<Activation>,
    /// Required by MLM
    pub layer_norm_eps: Option<f64>,
    #[config(default = 0.02)]
    pub initializer_range: f64,
}

impl BertOutputConfig {
    /// Build the requested heads.
    ///
    /// Fails when no head is requested, when NSP is requested without
    /// the pooler, or when a requested head is missing a size.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<BertOutput<B>> {
        if !self.with_pool && !self.with_mlm {
            bail!("BertOutput needs with_pool or with_mlm");
        }
        if self.with_nsp && !self.with_pool {
            bail!("The NSP head reads the pooled vector; enable with_pool");
        }

        let init = Initializer::Normal { mean: 0.0, std: self.initializer_range };
        let dense = |d_in: usize, d_out: usize| {
            LinearConfig::new(d_in, d_out)
                .with_initializer(init.clone())
                .init(device)
        };

        let mut pooler = None;
        let mut nsp = None;
        if self.with_pool {
            let hidden = self.hidden_size.context("Pooling requires hidden_size")?;
            pooler = Some(dense(hidden, hidden));
            if self.with_nsp {
                nsp = Some(dense(hidden, 2));
            }
        }

        let mut mlm = None;
        if self.with_mlm {
            let hidden    = self.hidden_size.context("MLM requires hidden_size")?;
            let embedding = self.embedding_size.context("MLM requires embedding_size")?;
            let vocab     = self.vocab_size.context("MLM requires vocab_size")?;
            let eps       = self.layer_norm_eps.context("MLM requires layer_norm_eps")?;
            self.hidden_act.as_ref().context("MLM requires hidden_act")?;

            mlm = Some(MlmHead {
                dense: dense(hidden, embedding),
                norm:  LayerNormConfig::new(embedding).with_epsilon(eps).init(device),
                bias:  Initializer::Zeros.init([vocab], device),
            });
        }

        Ok(BertOutput {
            pooler,
            nsp,
            mlm,
            pool_activation: Ignored(self.pool_activation.clone()),
            mlm_activation:  Ignored(self.mlm_activation.clone()),
            hidden_act:      Ignored(self.hidden_act.clone().unwrap_or(Activation::Linear)),
        })
    }
}

#[derive(Module, Debug)]
pub struct MlmHead<B: Backend> {
    pub dense: Linear<B>,
    pub norm:  LayerNorm<B>,
    /// [vocab_size]
    pub bias:  Param<Tensor<B, 1>>,
}

#[derive(Module, Debug)]
pub struct BertOutput<B: Backend> {
    pub pooler:      Option<Linear<B>>,
    pub nsp:         Option<Linear<B>>,
    pub mlm:         Option<MlmHead<B>>,
    pool_activation: Ignored<Activation>,
    mlm_activation:  Ignored<Activation>,
    hidden_act:      Ignored<Activation>,
}

/// One task output, in the order the heads are evaluated.
#[derive(Debug, Clone)]
pub enum HeadOutput<B: Backend> {
    /// [batch, hidden_size]
    Pooled(Tensor<B, 2>),
    /// [batch, 2]
    NextSentence(Tensor<B, 2>),
    /// [batch, seq, vocab_size]
    MaskedLm(Tensor<B, 3>),
}

impl<B: Backend> BertOutput<B> {
    /// Run every configured head over `sequence_output` ([batch, seq, hidden]).
    ///
    /// `token_embedding` is the model's input embedding; the MLM head
    /// decodes against its transposed table.
    pub fn forward(
        &self,
        sequence_output: Tensor<B, 3>,
        token_embedding: &Embedding<B>,
    ) -> Vec<HeadOutput<B>> {
        let mut outputs = Vec::new();

        if let Some(pooler) = &self.pooler {
            let [batch, seq, hidden] = sequence_output.dims();
            debug_assert!(seq > 0);
            let cls = sequence_output
                .clone()
                .slice([0..batch, 0..1, 0..hidden])
                .reshape([batch, hidden]);
            let pooled = self.pool_activation.apply(pooler.forward(cls));

            match &self.nsp {
                Some(nsp) => outputs.push(HeadOutput::NextSentence(
                    Activation::Softmax.apply(nsp.forward(pooled)),
                )),
                None => outputs.push(HeadOutput::Pooled(pooled)),
            }
        }

        if let Some(mlm) = &self.mlm {
            let x = self.hidden_act.apply(mlm.dense.forward(sequence_output));
            let x = mlm.norm.forward(x);

            let [batch, seq, width] = x.dims();
            let table = token_embedding.weight.val(); // [vocab, width]
            let [vocab, _] = table.dims();
            let decoder = table.transpose().unsqueeze::<3>().expand([batch, width, vocab]);

            let logits = x.matmul(decoder)
                + mlm.bias.val().unsqueeze::<3>().expand([batch, seq, vocab]);
            outputs.push(HeadOutput::MaskedLm(self.mlm_activation.apply(logits)));
        }

        outputs
    }
}
