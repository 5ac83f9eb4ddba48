// ============================================================
// Layer 6 — Tokenizer Store
// ============================================================
// Loads a HuggingFace tokenizer.json and turns text into BERT
// inputs:
//
//   single:  [CLS] a a a [SEP]
//   pair:    [CLS] a a a [SEP] b b [SEP]
//   segment:   0   0 0 0   0   1 1   1
//
// The special tokens are added here by hand rather than by the
// tokenizer's post-processor, so any tokenizer.json works as long
// as its vocabulary holds [CLS], [SEP] and [PAD].
//
// Long inputs are truncated longest-first until the sequence with
// its special tokens fits max_seq_len, then padded with [PAD].
//
// `build_and_save` writes a small word-level tokenizer from a text
// corpus for when no pretrained vocabulary is at hand. In
// tokenizers 0.15, train_from_files requires Trainer::Model to
// equal ModelWrapper, so the JSON is assembled directly instead.
//
// Reference: Devlin et al. (2019) BERT §3 (Input Representation)

use anyhow::{anyhow, ensure, Context, Result};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};
use tokenizers::Tokenizer;

use crate::domain::{encoded_input::EncodedInput, traits::TextEncoder};

pub const TOKENIZER_FILE: &str = "tokenizer.json";

const CLS: &str = "[CLS]";
const SEP: &str = "[SEP]";
const PAD: &str = "[PAD]";

pub struct TokenizerStore {
    tokenizer: Tokenizer,
    cls_id:    u32,
    sep_id:    u32,
    pad_id:    u32,
}

impl TokenizerStore {
    /// Load `{dir}/tokenizer.json`.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let path = dir.as_ref().join(TOKENIZER_FILE);
        let tokenizer = Tokenizer::from_file(&path)
            .map_err(|e| anyhow!("Cannot load tokenizer from '{}': {}", path.display(), e))?;
        Self::from_tokenizer(tokenizer)
    }

    pub fn from_tokenizer(tokenizer: Tokenizer) -> Result<Self> {
        let special = |token: &str| {
            tokenizer
                .token_to_id(token)
                .with_context(|| format!("Tokenizer vocabulary has no {token} token"))
        };
        let cls_id = special(CLS)?;
        let sep_id = special(SEP)?;
        let pad_id = special(PAD)?;
        Ok(Self { tokenizer, cls_id, sep_id, pad_id })
    }

    /// Smallest embedding table that covers every id; ids need not be contiguous.
    pub fn required_vocab_size(&self) -> usize {
        self.tokenizer
            .get_vocab(true)
            .values()
            .max()
            .map_or(0, |&id| id as usize + 1)
    }

    pub fn pad_id(&self) -> u32 {
        self.pad_id
    }

    fn tokenize(&self, text: &str) -> Result<Vec<u32>> {
        let encoding = self
            .tokenizer
            .encode(text, false)
            .map_err(|e| anyhow!("Cannot tokenise '{text}': {e}"))?;
        Ok(encoding.get_ids().to_vec())
    }

    /// Build a word-level tokenizer from `texts` and write it to `{dir}/tokenizer.json`.
    ///
    /// The `vocab_size - 5` most frequent lowercase words are kept;
    /// special tokens use the usual BERT ids.
    pub fn build_and_save(dir: impl AsRef<Path>, texts: &[String], vocab_size: usize) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create tokenizer directory '{}'", dir.display()))?;

        let mut freq: HashMap<String, usize> = HashMap::new();
        for text in texts {
            for word in text.split_whitespace() {
                let w = word.to_lowercase();
                let w = w.trim_matches(|c: char| !c.is_alphanumeric());
                if !w.is_empty() {
                    *freq.entry(w.to_string()).or_insert(0) += 1;
                }
            }
        }

        // Most frequent first; ties broken alphabetically so the ids are stable
        let mut words: Vec<(String, usize)> = freq.into_iter().collect();
        words.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        words.truncate(vocab_size.saturating_sub(5));

        let mut vocab = serde_json::json!({
            "[PAD]":  0,
            "[UNK]":  1,
            "[CLS]":  101,
            "[SEP]":  102,
            "[MASK]": 103,
        });
        let mut next_id = 104usize;
        for (word, _) in &words {
            if vocab.get(word).is_none() {
                vocab[word] = serde_json::json!(next_id);
                next_id += 1;
            }
        }

        let added = |id: u32, content: &str| {
            serde_json::json!({
                "id": id, "content": content, "single_word": false, "lstrip": false,
                "rstrip": false, "normalized": false, "special": true
            })
        };
        let tokenizer_json = serde_json::json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": [
                added(0, "[PAD]"), added(1, "[UNK]"), added(101, "[CLS]"),
                added(102, "[SEP]"), added(103, "[MASK]")
            ],
            "normalizer": {
                "type": "BertNormalizer",
                "clean_text": true,
                "handle_chinese_chars": true,
                "strip_accents": null,
                "lowercase": true
            },
            "pre_tokenizer": { "type": "Whitespace" },
            "post_processor": null,
            "decoder": null,
            "model": {
                "type": "WordLevel",
                "vocab": vocab,
                "unk_token": "[UNK]"
            }
        });

        let path: PathBuf = dir.join(TOKENIZER_FILE);
        fs::write(&path, serde_json::to_string_pretty(&tokenizer_json)?)
            .with_context(|| format!("Cannot write tokenizer to '{}'", path.display()))?;

        tracing::info!(
            "Tokenizer built with {} words, saved to '{}'",
            words.len(),
            path.display()
        );
        Self::load(dir)
    }
}

impl TextEncoder for TokenizerStore {
    fn encode(&self, text: &str, pair: Option<&str>, max_seq_len: usize) -> Result<EncodedInput> {
        let specials = if pair.is_some() { 3 } else { 2 };
        ensure!(
            max_seq_len >= specials,
            "max_seq_len {max_seq_len} leaves no room for {specials} special tokens"
        );

        let mut a = self.tokenize(text)?;
        let mut b = match pair {
            Some(p) => self.tokenize(p)?,
            None => Vec::new(),
        };

        // Longest-first truncation
        while a.len() + b.len() + specials > max_seq_len {
            if a.len() >= b.len() {
                a.pop();
            } else {
                b.pop();
            }
        }

        let mut input_ids = Vec::with_capacity(max_seq_len);
        input_ids.push(self.cls_id);
        input_ids.extend_from_slice(&a);
        input_ids.push(self.sep_id);
        let first_len = input_ids.len();
        if pair.is_some() {
            input_ids.extend_from_slice(&b);
            input_ids.push(self.sep_id);
        }

        let n = input_ids.len();
        let token_type_ids = (0..n).map(|i| u32::from(i >= first_len)).collect();

        Ok(EncodedInput {
            input_ids,
            token_type_ids,
            attention_mask: vec![1; n],
        }
        .padded(max_seq_len, self.pad_id))
    }

    fn id_to_token(&self, id: u32) -> Option<String> {
        self.tokenizer.id_to_token(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, TokenizerStore) {
        let dir = tempfile::tempdir().unwrap();
        let texts = vec![
            "the cat sat on the mat".to_string(),
            "the dog sat".to_string(),
        ];
        let store = TokenizerStore::build_and_save(dir.path(), &texts, 100).unwrap();
        (dir, store)
    }

    #[test]
    fn test_build_assigns_frequent_words_first() {
        let (dir, store) = store();
        assert!(dir.path().join(TOKENIZER_FILE).exists());
        // "the" appears three times, "sat" twice
        assert_eq!(store.id_to_token(104).as_deref(), Some("the"));
        assert_eq!(store.id_to_token(105).as_deref(), Some("sat"));
        assert_eq!(store.pad_id(), 0);
        // 6 distinct words after the 104 reserved ids
        assert_eq!(store.required_vocab_size(), 110);
    }

    #[test]
    fn test_single_sentence_encoding() {
        let (_dir, store) = store();
        let enc = store.encode("The cat", None, 6).unwrap();

        assert_eq!(enc.input_ids, vec![101, 104, store.tokenizer.token_to_id("cat").unwrap(), 102, 0, 0]);
        assert_eq!(enc.token_type_ids, vec![0; 6]);
        assert_eq!(enc.attention_mask, vec![1, 1, 1, 1, 0, 0]);
    }

    #[test]
    fn test_pair_encoding_sets_segments() {
        let (_dir, store) = store();
        let enc = store.encode("the cat", Some("sat"), 8).unwrap();

        assert_eq!(enc.input_ids[0], 101);
        assert_eq!(enc.input_ids[3], 102);
        assert_eq!(enc.input_ids[5], 102);
        assert_eq!(enc.token_type_ids, vec![0, 0, 0, 0, 1, 1, 0, 0]);
        assert_eq!(enc.real_len(), 6);
    }

    #[test]
    fn test_truncates_longest_first() {
        let (_dir, store) = store();
        let enc = store.encode("the cat sat on the mat", Some("dog"), 7).unwrap();

        assert_eq!(enc.len(), 7);
        assert_eq!(enc.real_len(), 7);
        // three words of the first text survive, the single pair word is kept
        assert_eq!(enc.token_type_ids, vec![0, 0, 0, 0, 0, 1, 1]);
    }

    #[test]
    fn test_unknown_words_map_to_unk() {
        let (_dir, store) = store();
        let enc = store.encode("zebra", None, 4).unwrap();
        assert_eq!(enc.input_ids, vec![101, 1, 102, 0]);
    }

    #[test]
    fn test_rejects_tiny_max_len_and_missing_file() {
        let (_dir, store) = store();
        assert!(store.encode("the", Some("cat"), 2).is_err());

        let empty = tempfile::tempdir().unwrap();
        assert!(TokenizerStore::load(empty.path()).is_err());
    }
}
