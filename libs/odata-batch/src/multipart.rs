//! Minimal `multipart/mixed` reader (RFC 2046 §5.1).
//!
//! Lenient in the same places common MIME parsers are: both CRLF and bare LF
//! line endings are accepted, the preamble and epilogue are ignored, a
//! missing close delimiter ends the last part at end of input, and a part
//! whose first line is not a header is treated as having no headers.

use crate::error::BatchError;

/// One body part: its MIME headers and raw payload.
///
/// Payload lines are re-joined with CRLF; the line break preceding the next
/// delimiter belongs to the delimiter and is not part of the payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BodyPart {
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl BodyPart {
    /// First header with the given name (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Extract the boundary from a `multipart/mixed` content type.
///
/// # Errors
/// Returns [`BatchError::InvalidEnvelope`] if the content type does not parse,
/// is not `multipart/mixed`, or has no non-empty `boundary` parameter.
pub fn mixed_boundary(content_type: &str) -> Result<String, BatchError> {
    let mime: mime::Mime = content_type
        .parse()
        .map_err(|e| BatchError::invalid(format!("unparseable Content-Type '{content_type}': {e}")))?;

    if mime.type_() != mime::MULTIPART || mime.subtype() != "mixed" {
        return Err(BatchError::invalid(format!(
            "expected multipart/mixed, got '{}'",
            mime.essence_str()
        )));
    }

    let boundary = mime
        .get_param(mime::BOUNDARY)
        .map(|b| b.as_str().trim_matches('"').to_owned())
        .unwrap_or_default();
    if boundary.is_empty() {
        return Err(BatchError::invalid(
            "multipart/mixed without boundary parameter",
        ));
    }
    Ok(boundary)
}

/// Split `body` into its parts.
///
/// # Errors
/// Returns [`BatchError::InvalidEnvelope`] if no delimiter line for `boundary`
/// occurs anywhere in the body.
pub fn read_parts(boundary: &str, body: &[u8]) -> Result<Vec<BodyPart>, BatchError> {
    let delimiter = format!("--{boundary}");
    let mut parts = Vec::new();
    let mut current: Option<Vec<&[u8]>> = None;
    let mut seen_delimiter = false;

    for line in lines(body) {
        match classify(line, delimiter.as_bytes()) {
            Line::Open => {
                seen_delimiter = true;
                if let Some(lines) = current.replace(Vec::new()) {
                    parts.push(build_part(&lines));
                }
            }
            Line::Close => {
                seen_delimiter = true;
                if let Some(lines) = current.take() {
                    parts.push(build_part(&lines));
                }
                break;
            }
            Line::Content => {
                if let Some(lines) = current.as_mut() {
                    lines.push(line);
                }
            }
        }
    }

    if let Some(lines) = current.take() {
        parts.push(build_part(&lines));
    }

    if !seen_delimiter {
        return Err(BatchError::invalid(format!(
            "no '--{boundary}' delimiter found in body"
        )));
    }

    Ok(parts)
}

enum Line {
    Open,
    Close,
    Content,
}

fn lines(body: &[u8]) -> impl Iterator<Item = &[u8]> {
    body.split(|b| *b == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
}

fn classify(line: &[u8], delimiter: &[u8]) -> Line {
    let Some(rest) = line.strip_prefix(delimiter) else {
        return Line::Content;
    };
    if is_padding(rest) {
        return Line::Open;
    }
    match rest.strip_prefix(b"--") {
        Some(tail) if is_padding(tail) => Line::Close,
        _ => Line::Content,
    }
}

/// Transport padding allowed after a delimiter.
fn is_padding(bytes: &[u8]) -> bool {
    bytes.iter().all(|b| *b == b' ' || *b == b'\t')
}

fn build_part(lines: &[&[u8]]) -> BodyPart {
    let mut headers: Vec<(String, String)> = Vec::new();
    let mut idx = 0;

    while idx < lines.len() {
        let line = lines[idx];
        if line.is_empty() {
            idx += 1;
            break;
        }
        if line[0] == b' ' || line[0] == b'\t' {
            if let Some((_, value)) = headers.last_mut() {
                value.push(' ');
                value.push_str(String::from_utf8_lossy(line).trim());
                idx += 1;
                continue;
            }
        }
        match parse_header(line) {
            Some(header) => {
                headers.push(header);
                idx += 1;
            }
            // Not a header: the part has no (more) headers and the body starts here.
            None => break,
        }
    }

    BodyPart {
        headers,
        body: lines[idx..].join(&b"\r\n"[..]),
    }
}

fn parse_header(line: &[u8]) -> Option<(String, String)> {
    let text = std::str::from_utf8(line).ok()?;
    let (name, value) = text.split_once(':')?;
    if name.is_empty() || name.contains(char::is_whitespace) {
        return None;
    }
    Some((name.to_owned(), value.trim().to_owned()))
}
