//! Filters and extracts the four retained fields from one raw log line
//! (component C3): `timestamp`, `ip_address`, `object_key`, `bytes_sent`.

use std::collections::HashSet;

use chrono::NaiveDateTime;

use crate::schema::{is_known_operation, ObjectKeyHandler};
use crate::tokenizer::tokenize;

/// One surviving line, reduced to the four retained fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReducedLine {
    pub timestamp: String,
    pub ip_address: String,
    pub object_key: String,
    pub bytes_sent: u64,
}

impl ReducedLine {
    /// Renders the tab-separated row (without trailing newline) written to
    /// the reduced log file.
    pub fn to_tsv_row(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}",
            self.timestamp, self.ip_address, self.object_key, self.bytes_sent
        )
    }
}

/// A note for the error collector (C6); raised alongside an outcome rather
/// than written directly, since this crate has no notion of a task id or
/// output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub category: &'static str,
    pub message: String,
}

/// Outcome of reducing a single raw line. A diagnostic may accompany
/// [`LineOutcome::Accepted`] or [`LineOutcome::Filtered`] (e.g. an
/// unexpected but non-fatal timezone offset) without changing which variant
/// is returned; [`LineOutcome::Rejected`] always carries one.
pub enum LineOutcome {
    /// The line passed every filter; here is its reduced form.
    Accepted(ReducedLine, Option<Diagnostic>),
    /// The line was well-formed but did not match the requested operation,
    /// status code, object key parent, or excluded-IP filters.
    Filtered(Option<Diagnostic>),
    /// The line could not be parsed, or failed a hard validation check.
    Rejected(Diagnostic),
}

/// Reduces one line, trying the DANDI-specific fast path first and falling
/// back to full tokenization when the fast path's narrow assumptions don't
/// hold for this particular line.
pub fn reduce_dandi_line(
    raw_line: &str,
    operation_type: &str,
    excluded_ips: &HashSet<String>,
    object_key_handler: &dyn ObjectKeyHandler,
) -> LineOutcome {
    match fast_reduce_line(raw_line, operation_type, excluded_ips) {
        FastOutcome::Resolved(outcome) => outcome,
        FastOutcome::FallThrough => reduce_line(raw_line, operation_type, excluded_ips, object_key_handler),
    }
}

/// Reduces one line using only the general tokenizer path (no DANDI fast
/// path). Useful when the caller's object key parents aren't `blobs`/`zarr`.
pub fn reduce_line(
    raw_line: &str,
    operation_type: &str,
    excluded_ips: &HashSet<String>,
    object_key_handler: &dyn ObjectKeyHandler,
) -> LineOutcome {
    let tokens = match tokenize(raw_line) {
        Ok(tokens) => tokens,
        Err(_) => {
            return LineOutcome::Rejected(Diagnostic {
                category: "line_reduction",
                message: format!("Error parsing line: {raw_line}"),
            })
        }
    };

    let http_status_code = &tokens[9];
    let operation = &tokens[6];
    let timestamp_field = &tokens[2];
    let ip_address = &tokens[3];
    let object_key = &tokens[7];
    let bytes_sent_field = &tokens[11];

    if http_status_code.is_empty() || !http_status_code.chars().all(|c| c.is_ascii_digit()) {
        return LineOutcome::Rejected(Diagnostic {
            category: "line",
            message: format!("Unexpected status code: '{http_status_code}' parsed from line '{raw_line}'."),
        });
    }

    if !is_known_operation(operation) {
        return LineOutcome::Rejected(Diagnostic {
            category: "line",
            message: format!("Unexpected request type: '{operation}' parsed from line '{raw_line}'."),
        });
    }

    let timezone = &timestamp_field[timestamp_field.len().saturating_sub(5)..];
    let timezone_diagnostic = (timezone != "+0000").then(|| Diagnostic {
        category: "line",
        message: format!("Unexpected time shift parsed from line '{raw_line}'."),
    });

    // Fine to proceed even when the timezone looks off; just worth flagging.
    if !http_status_code.starts_with('2') {
        return LineOutcome::Filtered(timezone_diagnostic);
    }
    if operation != operation_type {
        return LineOutcome::Filtered(timezone_diagnostic);
    }
    if excluded_ips.contains(ip_address.as_str()) {
        return LineOutcome::Filtered(timezone_diagnostic);
    }

    let handled_object_key = object_key_handler.handle(object_key);
    let handled_timestamp = match parse_bracketed_timestamp(timestamp_field) {
        Some(ts) => ts,
        None => {
            return LineOutcome::Rejected(Diagnostic {
                category: "line_reduction",
                message: format!("Unparseable timestamp '{timestamp_field}' in line '{raw_line}'."),
            })
        }
    };
    let handled_bytes_sent = if bytes_sent_field == "-" {
        0
    } else {
        match bytes_sent_field.parse::<u64>() {
            Ok(n) => n,
            Err(_) => {
                return LineOutcome::Rejected(Diagnostic {
                    category: "line_reduction",
                    message: format!("Non-numeric bytes_sent '{bytes_sent_field}' in line '{raw_line}'."),
                })
            }
        }
    };

    LineOutcome::Accepted(
        ReducedLine {
            timestamp: handled_timestamp,
            ip_address: ip_address.clone(),
            object_key: handled_object_key,
            bytes_sent: handled_bytes_sent,
        },
        timezone_diagnostic,
    )
}

enum FastOutcome {
    Resolved(LineOutcome),
    FallThrough,
}

fn fast_line_reduction_error(raw_line: &str) -> FastOutcome {
    FastOutcome::Resolved(LineOutcome::Rejected(Diagnostic {
        category: "fast_line_reduction",
        message: format!("Error during fast reduction of line '{raw_line}'"),
    }))
}

/// Restrictive, allocation-light pass that trusts the raw line's
/// space-separated layout directly instead of tokenizing it; only handles
/// the `blobs`/`zarr` object key parents and falls through to the general
/// path when its narrower field-shape assumptions don't hold. A line too
/// short to hold the fields this path indexes into is a hard reject, not a
/// fallback, mirroring the broad exception guard the slow path doesn't need.
fn fast_reduce_line(raw_line: &str, operation_type: &str, excluded_ips: &HashSet<String>) -> FastOutcome {
    let split: Vec<&str> = raw_line.split(' ').collect();
    if split.len() < 9 {
        return fast_line_reduction_error(raw_line);
    }

    let ip_address = split[4];
    if excluded_ips.contains(ip_address) {
        return FastOutcome::Resolved(LineOutcome::Filtered(None));
    }

    let line_operation_type = split[7];
    if line_operation_type != operation_type {
        return FastOutcome::Resolved(LineOutcome::Filtered(None));
    }

    let full_object_key = split[8];
    let object_key = match full_object_key.split('/').next() {
        Some("blobs") => full_object_key.to_owned(),
        Some("zarr") => full_object_key.split('/').take(2).collect::<Vec<_>>().join("/"),
        _ => return FastOutcome::Resolved(LineOutcome::Filtered(None)),
    };

    // `split('" ')[1]` in the original: the segment strictly between the
    // first and second `" ` delimiter, i.e. the fields right after the
    // request_uri quoted block and before the referrer quoted block. A line
    // with fewer than two such delimiters has no such segment to index.
    let mut quote_split = raw_line.splitn(3, "\" ");
    quote_split.next();
    let Some(after_quote_block) = quote_split.next() else {
        return fast_line_reduction_error(raw_line);
    };
    let post_quote_fields: Vec<&str> = after_quote_block.split(' ').collect();

    let http_status_code = post_quote_fields.first().copied().unwrap_or_default();
    let is_numeric_status = http_status_code.len() == 3 && http_status_code.chars().all(|c| c.is_ascii_digit());
    if is_numeric_status && !http_status_code.starts_with('2') {
        return FastOutcome::Resolved(LineOutcome::Filtered(None));
    }

    let bytes_sent_field = post_quote_fields.get(2).copied().unwrap_or_default();
    if post_quote_fields.len() != 7 || !is_numeric_status || !bytes_sent_field.chars().all(|c| c.is_ascii_digit()) {
        return FastOutcome::FallThrough;
    }

    // Timezone is intentionally ignored on the fast path, matching the slow
    // path's tolerance of non-UTC offsets.
    let timestamp_field = split[2];
    let Some(timestamp) = parse_bracketed_timestamp(timestamp_field) else {
        return fast_line_reduction_error(raw_line);
    };
    let Ok(bytes_sent) = bytes_sent_field.parse::<u64>() else {
        return fast_line_reduction_error(raw_line);
    };

    FastOutcome::Resolved(LineOutcome::Accepted(
        ReducedLine {
            timestamp,
            ip_address: ip_address.to_owned(),
            object_key,
            bytes_sent,
        },
        None,
    ))
}

/// Parses a `day/Mon/Year:HH:MM:SS [+ZZZZ]`-shaped timestamp field (brackets
/// and timezone optional), and returns it in ISO-8601 form.
fn parse_bracketed_timestamp(field: &str) -> Option<String> {
    let trimmed = field.trim_start_matches('[').trim_end_matches(']');
    let without_timezone = trimmed.split(' ').next().unwrap_or(trimmed);
    NaiveDateTime::parse_from_str(without_timezone, "%d/%b/%Y:%H:%M:%S")
        .ok()
        .map(|dt| dt.to_string().replace(' ', "T"))
}
