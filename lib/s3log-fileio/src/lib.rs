//! Buffered file reading and file-level reduction for the S3 log reduce stage.

pub mod file_reducer;
pub mod line_reader;

pub use file_reducer::{reduce_file, FileReductionReport};
pub use line_reader::LineReader;
