// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns used by several other layers:
//
//   checkpoint.rs      — Model weights and BertConfig on disk
//                        Uses Burn's CompactRecorder for the
//                        parameters; the config goes alongside
//                        as JSON so the model can be rebuilt.
//
//   tokenizer_store.rs — Text → EncodedInput
//                        Loads a tokenizer.json (or builds a
//                        word-level one from a corpus) and adds
//                        [CLS]/[SEP], segment ids and padding.
//
//   config_store.rs    — Per-run model config records
//                        One JSON file, one entry per key,
//                        stamped with time and description.
//
//   logger.rs          — Named file loggers
//                        A registry handing out one tracing
//                        Dispatch per name and log file.
//
//   progress.rs        — Terminal progress bar
//
// Reference: Rust Book §7 (Modules)
//            Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Tokenizer loading and BERT input encoding
pub mod tokenizer_store;

/// JSON store of per-run model configs
pub mod config_store;

/// Registry of named file loggers
pub mod logger;

/// Single-line progress bar
pub mod progress;
