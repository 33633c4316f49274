//! Tokenizing, filtering, and schema for one raw S3 access-log line.

pub mod reduce;
pub mod schema;
pub mod tokenizer;

pub use reduce::{reduce_dandi_line, reduce_line, Diagnostic, LineOutcome, ReducedLine};
pub use schema::{DandiObjectKeyHandler, IdentityObjectKeyHandler, ObjectKeyHandler};
pub use tokenizer::{tokenize, MalformedLine};
