//! Splits one raw S3 log line into its positional fields (component C2).

use std::sync::OnceLock;

use regex::Regex;

/// A line whose field count could not be normalized to 24, 25, or 26 tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedLine {
    pub token_count: usize,
}

fn log_line_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""([^"]+)"|\[([^]]+)\]|([^ ]+)"#).expect("static pattern is valid"))
}

fn raw_scan(line: &str) -> Vec<String> {
    log_line_regex()
        .captures_iter(line)
        .map(|cap| {
            cap.get(1)
                .or_else(|| cap.get(2))
                .or_else(|| cap.get(3))
                .map(|m| m.as_str().to_owned())
                .unwrap_or_default()
        })
        .collect()
}

/// Splits `raw_line` into 24, 25, or 26 positional fields, repairing embedded
/// unescaped quotes when the first pass over-splits.
pub fn tokenize(raw_line: &str) -> Result<Vec<String>, MalformedLine> {
    let mut tokens = raw_scan(raw_line);

    if tokens.len() > 26 {
        if let Some(repaired) = repair_embedded_quotes(raw_line) {
            tokens = raw_scan(&repaired);
        }
    }

    normalize(tokens)
}

fn normalize(mut tokens: Vec<String>) -> Result<Vec<String>, MalformedLine> {
    match tokens.len() {
        24 => {
            tokens.push("-".to_owned());
            Ok(tokens)
        }
        25 => Ok(tokens),
        26 => {
            tokens.pop();
            Ok(tokens)
        }
        n => Err(MalformedLine { token_count: n }),
    }
}

/// Collapses nested/embedded quoted blocks (e.g. a stray quoted phrase inside
/// the user-agent field) down to a single ` - ` placeholder, so a subsequent
/// [`tokenize`] pass sees one clean field instead of several bogus ones.
///
/// Treats every ` "` / `" ` two-character sequence in the line as a
/// quote-block delimiter and bracket-matches them in chronological order;
/// any span strictly inside the outermost pair is replaced. Returns `None`
/// when the delimiters are not evenly balanced, in which case the caller
/// should fall back to the unrepaired (and still malformed) token list.
fn repair_embedded_quotes(line: &str) -> Option<String> {
    let bytes = line.as_bytes();
    let mut delimiters: Vec<(usize, bool)> = Vec::new();

    let mut i = 0usize;
    let mut iterations: u64 = 0;
    while i + 1 < bytes.len() {
        iterations += 1;
        if iterations > 1_000_000 {
            return None;
        }

        if bytes[i] == b' ' && bytes[i + 1] == b'"' {
            delimiters.push((i + 1, true));
        } else if bytes[i] == b'"' && bytes[i + 1] == b' ' {
            delimiters.push((i, false));
        }
        i += 1;
    }

    if delimiters.is_empty() || delimiters.len() % 2 != 0 {
        return None;
    }
    let opens = delimiters.iter().filter(|(_, is_open)| *is_open).count();
    if opens != delimiters.len() - opens {
        return None;
    }

    let mut result = String::with_capacity(line.len());
    let mut cursor = 0usize;
    let mut depth = 0i32;
    let mut interior_start: Option<usize> = None;

    for (pos, is_open) in delimiters {
        if is_open {
            depth += 1;
            if depth == 2 {
                interior_start = Some(pos);
            }
        } else {
            if depth == 2 {
                if let Some(start) = interior_start.take() {
                    result.push_str(&line[cursor..start]);
                    result.push_str(" - ");
                    cursor = pos + 1;
                }
            }
            depth -= 1;
        }
    }

    if depth != 0 {
        return None;
    }

    result.push_str(&line[cursor..]);
    Some(result)
}
