// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Pure Rust structs and traits describing what the system works
// with: encoder configurations and tokenised inputs.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO ML-specific code
//   - Only plain Rust structs, enums, and traits
//
// BertConfig::from_json_file is the one exception to "no I/O":
// reading a config file is part of the type's public contract.
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// Encoder hyperparameters (bert_config.json)
pub mod bert_config;

// A tokenised, padded input sequence
pub mod encoded_input;

// Core abstractions (traits) that other layers implement
pub mod traits;
