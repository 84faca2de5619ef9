//! bbdb-format
//!
//! This crate implements:
//!  1) A tokenizer + recursive-descent parser for BBDB v2 files (`file-version: 6`),
//!  2) The object model (`Database`, `Record`, `Address`),
//!  3) A validator that reports every schema violation at once,
//!  4) A writer producing the exact BBDB text syntax,
//!  5) `to_tree` / `from_tree` conversion against `serde_json::Value`,
//!  6) Error types (`BbdbError`), and the `FromTree` trait.

pub mod error;
pub mod types;
pub mod utils;
pub mod tokenizer;
pub mod parser;
pub mod verifier;
pub mod writer;
pub mod tree;
pub mod traits;

pub use error::{BbdbError, Violation};
pub use parser::{parse, parse_reader};
pub use traits::FromTree;
pub use tree::{from_tree, to_tree};
pub use types::{Address, Database, Record, DEFAULT_CODING, DEFAULT_FILE_VERSION, SUPPORTED_VERSIONS};
pub use verifier::{validate_database, validate_record};
pub use writer::{to_string, write};
