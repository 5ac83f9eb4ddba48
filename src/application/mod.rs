// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// This layer orchestrates the other layers to accomplish one
// user-facing goal (creating a model, encoding text, reading
// stored configs).
//
// Rules for this layer:
//   - No ML math or model code here
//   - No printing to stdout here (that's Layer 1)
//   - Only workflow coordination
//
// The use cases are generic over the Burn backend; Layer 1
// picks the concrete one.
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// Build a fresh checkpoint from a BertConfig
pub mod init_use_case;

// Tokenise and encode texts with a saved model
pub mod encode_use_case;

// Inspect configs and recorded runs
pub mod config_use_case;
