// ============================================================
// Layer 5 — Inferencer
// ============================================================
// Loads an encoder from a checkpoint directory and runs batches
// through it, returning plain Vecs the upper layers can print or
// store without touching burn types.
//
//   checkpoint dir ──► BertConfig ──► BertModelConfig ──► empty model
//                                                            │
//                           model.mpk.gz ─── load_record ────┘
//
// Per input in the batch the summary holds:
//   pooled       — the pooled [CLS] vector (pooler head)
//   nsp          — [P(is next), P(not next)] (NSP head)
//   mlm_ids      — argmax vocabulary id at every position (MLM head)
// Fields whose head is disabled stay empty. Only heads saved with
// the checkpoint can be requested; the rest are left out of the model.

use anyhow::{bail, Result};
use burn::prelude::*;

use crate::data::batcher::BertBatch;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::{
    model::{BertModel, BertModelConfig},
    output::HeadOutput,
};

/// Backend the CLI runs on.
pub type InferBackend = burn::backend::Wgpu;

/// Which heads to build on top of the encoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeadSelection {
    pub nsp: bool,
    pub mlm: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EncodedOutput {
    pub pooled:  Vec<f32>,
    pub nsp:     Vec<f32>,
    pub mlm_ids: Vec<u32>,
}

pub struct Inferencer<B: Backend> {
    model: BertModel<B>,
}

impl<B: Backend> Inferencer<B> {
    pub fn new(model: BertModel<B>) -> Self {
        Self { model }
    }

    /// Rebuild the model saved in `ckpt` and load its weights.
    pub fn from_checkpoint(
        ckpt:   &CheckpointManager,
        heads:  HeadSelection,
        device: B::Device,
    ) -> Result<Self> {
        let bert_cfg  = ckpt.load_config()?;
        let saved     = BertModelConfig::from_bert_config(&bert_cfg)?;
        if heads.nsp && !saved.with_nsp {
            bail!("Checkpoint '{}' has no NSP head; re-run init with --nsp", ckpt.dir().display());
        }
        if heads.mlm && !saved.with_mlm {
            bail!("Checkpoint '{}' has no MLM head; re-run init with --mlm", ckpt.dir().display());
        }
        let model_cfg = saved.with_with_nsp(heads.nsp).with_with_mlm(heads.mlm);

        let model = model_cfg.init::<B>(&device)?;
        let model = ckpt.load_model(model, &device)?;
        tracing::info!(
            "Model loaded from '{}' ({} layers, hidden {})",
            ckpt.dir().display(),
            bert_cfg.num_hidden_layers,
            bert_cfg.hidden_size
        );
        Ok(Self { model })
    }

    /// Run one batch and summarise every head, one entry per input.
    pub fn encode(&self, batch: BertBatch<B>) -> Vec<EncodedOutput> {
        let [batch_size, seq_len] = batch.input_ids.dims();
        let output = self.model.forward(
            batch.input_ids,
            Some(batch.token_type_ids),
            Some(batch.attention_mask),
        );

        let mut summaries = vec![EncodedOutput::default(); batch_size];
        for head in output.heads {
            match head {
                HeadOutput::Pooled(pooled) => {
                    let width = pooled.dims()[1];
                    let values: Vec<f32> = pooled.into_data().iter::<f32>().collect();
                    for (summary, row) in summaries.iter_mut().zip(values.chunks(width)) {
                        summary.pooled = row.to_vec();
                    }
                }
                HeadOutput::NextSentence(probs) => {
                    let values: Vec<f32> = probs.into_data().iter::<f32>().collect();
                    for (summary, row) in summaries.iter_mut().zip(values.chunks(2)) {
                        summary.nsp = row.to_vec();
                    }
                }
                HeadOutput::MaskedLm(probs) => {
                    let ids: Vec<u32> = probs
                        .argmax(2)
                        .into_data()
                        .iter::<i64>()
                        .map(|id| id as u32)
                        .collect();
                    for (summary, row) in summaries.iter_mut().zip(ids.chunks(seq_len.max(1))) {
                        summary.mlm_ids = row.to_vec();
                    }
                }
            }
        }

        tracing::debug!("Encoded batch of {} sequences (length {})", batch_size, seq_len);
        summaries
    }
}
