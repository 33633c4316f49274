//! Error types shared across the `s3log-*` crates.
//!
//! Only the "Fatal (caller-visible)" class from the reduce pipeline's error
//! taxonomy is represented here as a `Result::Err`. Line- and file-level
//! problems are diagnostics routed through `s3log_batch::error_collector`
//! instead of propagating as errors.

use std::path::PathBuf;

use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display(
        "line at byte offset {offset} of {path} exceeds the configured buffer budget; \
         raise `maximum_buffer_size_in_bytes` to account for it"
    ))]
    OversizeLine { path: PathBuf, offset: u64 },

    #[snafu(display("{path} does not have the expected `.{expected}` extension"))]
    BadExtension { path: PathBuf, expected: &'static str },

    #[snafu(display("{path} is not a directory"))]
    NotADirectory { path: PathBuf },

    #[snafu(display("failed to read {path}"))]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("failed to write {path}"))]
    WriteFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("failed to create directory {path}"))]
    CreateDirectory {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
