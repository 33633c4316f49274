//! Drives the line reader and line reducer across one raw log file, writing
//! a single reduced TSV file (component C4).

use std::collections::HashSet;
use std::path::Path;

use s3log_common::{BadExtensionSnafu, Error, WriteFileSnafu};
use s3log_parse::{reduce_dandi_line, Diagnostic, LineOutcome, ObjectKeyHandler};
use snafu::{ensure, ResultExt};
use tracing::{debug, trace, warn};

use crate::line_reader::LineReader;

const HEADER: &str = "timestamp\tip_address\tobject_key\tbytes_sent\n";

/// Summarizes what happened while reducing one file, independent of the
/// per-line diagnostics (which the caller routes to the error collector).
pub struct FileReductionReport {
    pub lines_read: u64,
    pub lines_accepted: u64,
    pub diagnostics: Vec<Diagnostic>,
}

/// Reduces `raw_log_path` to `reduced_log_path`, keeping only lines that
/// match `operation_type`, are not from an excluded IP, and survive
/// tokenization. Writes a header line only when at least one row survives,
/// matching the convention that an all-filtered input produces an empty
/// output file rather than a header-only one.
pub fn reduce_file(
    raw_log_path: &Path,
    reduced_log_path: &Path,
    operation_type: &str,
    excluded_ips: &HashSet<String>,
    object_key_handler: &dyn ObjectKeyHandler,
    maximum_buffer_size_in_bytes: u64,
) -> Result<FileReductionReport, Error> {
    ensure!(
        raw_log_path.extension().is_some_and(|ext| ext == "log"),
        BadExtensionSnafu {
            path: raw_log_path.to_path_buf(),
            expected: "log",
        }
    );

    let reader = LineReader::open(raw_log_path, maximum_buffer_size_in_bytes)?;
    debug!(path = %raw_log_path.display(), batches = reader.batch_count(), "reducing raw log file");

    let mut rows = Vec::new();
    let mut diagnostics = Vec::new();
    let mut lines_read = 0u64;

    for batch in reader {
        let batch = batch?;
        for raw_line in &batch {
            lines_read += 1;
            match reduce_dandi_line(raw_line, operation_type, excluded_ips, object_key_handler) {
                LineOutcome::Accepted(reduced, diagnostic) => {
                    rows.push(reduced.to_tsv_row());
                    diagnostics.extend(diagnostic);
                }
                LineOutcome::Filtered(diagnostic) => diagnostics.extend(diagnostic),
                LineOutcome::Rejected(diagnostic) => {
                    trace!(category = diagnostic.category, "line rejected during reduction");
                    diagnostics.push(diagnostic);
                }
            }
        }
    }

    let lines_accepted = rows.len() as u64;
    if !diagnostics.is_empty() {
        warn!(
            path = %raw_log_path.display(),
            count = diagnostics.len(),
            "collected diagnostics while reducing file"
        );
    }

    let mut contents = String::new();
    if !rows.is_empty() {
        contents.push_str(HEADER);
        for row in &rows {
            contents.push_str(row);
            contents.push('\n');
        }
    }
    std::fs::write(reduced_log_path, contents).context(WriteFileSnafu {
        path: reduced_log_path.to_path_buf(),
    })?;

    Ok(FileReductionReport {
        lines_read,
        lines_accepted,
        diagnostics,
    })
}

#[cfg(test)]
mod test {
    use std::io::Write;

    use s3log_parse::DandiObjectKeyHandler;

    use super::*;

    fn write_raw_log(lines: &[&str]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let mut f = std::fs::File::create(dir.path().join("input.log")).unwrap();
        for line in lines {
            writeln!(f, "{line}").unwrap();
        }
        dir
    }

    const BLOB_LINE: &str = r#"owner dandiarchive [01/Jan/2020:10:00:00 +0000] 192.0.2.1 - req1 REST.GET.OBJECT blobs/abc/def/XYZ "GET /blobs/abc/def/XYZ HTTP/1.1" 200 - 123 123 10 5 "-" "ua" - host sigv4 suite auth endpoint TLSv1.2 arn"#;

    #[test]
    fn writes_header_and_row_when_lines_survive() {
        let dir = write_raw_log(&[BLOB_LINE]);
        let raw = dir.path().join("input.log");
        let reduced = dir.path().join("output.tsv");
        let excluded = HashSet::new();
        let handler = DandiObjectKeyHandler;

        let report = reduce_file(&raw, &reduced, "REST.GET.OBJECT", &excluded, &handler, 3_000).unwrap();
        assert_eq!(report.lines_read, 1);
        assert_eq!(report.lines_accepted, 1);

        let written = std::fs::read_to_string(&reduced).unwrap();
        assert!(written.starts_with("timestamp\tip_address\tobject_key\tbytes_sent\n"));
        assert!(written.contains("blobs/abc/def/XYZ"));
    }

    #[test]
    fn writes_empty_file_when_nothing_survives() {
        let dir = write_raw_log(&[BLOB_LINE]);
        let raw = dir.path().join("input.log");
        let reduced = dir.path().join("output.tsv");
        let excluded = HashSet::new();
        let handler = DandiObjectKeyHandler;

        let report = reduce_file(&raw, &reduced, "REST.PUT.OBJECT", &excluded, &handler, 3_000).unwrap();
        assert_eq!(report.lines_accepted, 0);

        let written = std::fs::read_to_string(&reduced).unwrap();
        assert!(written.is_empty());
    }

    #[test]
    fn rejects_non_log_extension() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("input.txt");
        std::fs::write(&raw, "").unwrap();
        let reduced = dir.path().join("output.tsv");
        let excluded = HashSet::new();
        let handler = DandiObjectKeyHandler;

        let result = reduce_file(&raw, &reduced, "REST.GET.OBJECT", &excluded, &handler, 3_000);
        assert!(result.is_err());
    }
}
