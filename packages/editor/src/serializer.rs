//! # Worksheet File Format
//!
//! Worksheets are saved as valid Clojure source, marked up with magic
//! comments so the segment structure survives a round trip:
//!
//! ```text
//! ;; gorilla-repl.fileformat = 1
//!
//! ;; **
//! ;;; Some narrative text
//! ;; **
//!
//! ;; @@
//! (+ 1 1)
//! ;; @@
//! ```
//!
//! A code line that would read as the closing `;; @@` is written with one
//! extra leading backslash, which `parse` removes again.

use crate::segment::{Segment, SegmentKind};
use std::borrow::Cow;
use thiserror::Error;

pub const FORMAT_VERSION: u32 = 1;

const HEADER_PREFIX: &str = ";; gorilla-repl.fileformat = ";
const FREE_MARKER: &str = ";; **";
const FREE_LINE_PREFIX: &str = ";;;";
const CODE_MARKER: &str = ";; @@";
const ESCAPE: char = '\\';

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("missing file format header")]
    MissingHeader,

    #[error("unsupported file format version {0}")]
    UnsupportedVersion(String),

    #[error("line {line}: {kind} segment is never closed")]
    Unterminated { line: usize, kind: SegmentKind },

    #[error("line {line}: unexpected content outside a segment: {text:?}")]
    UnexpectedLine { line: usize, text: String },
}

/// Header line for the current format version
pub fn header() -> String {
    format!("{HEADER_PREFIX}{FORMAT_VERSION}")
}

/// Encode a single segment. The encoding always ends with a newline.
pub fn serialize_segment(segment: &Segment) -> String {
    match segment.kind() {
        SegmentKind::Code => {
            let body = segment
                .content()
                .split('\n')
                .map(escape_code_line)
                .collect::<Vec<_>>()
                .join("\n");
            format!("{CODE_MARKER}\n{body}\n{CODE_MARKER}\n")
        }
        SegmentKind::Free => {
            let body = segment
                .content()
                .split('\n')
                .map(|line| match line {
                    "" => FREE_LINE_PREFIX.to_string(),
                    line => format!("{FREE_LINE_PREFIX} {line}"),
                })
                .collect::<Vec<_>>()
                .join("\n");
            format!("{FREE_MARKER}\n{body}\n{FREE_MARKER}\n")
        }
    }
}

/// Encode a whole worksheet
pub fn serialize<'a>(segments: impl IntoIterator<Item = &'a Segment>) -> String {
    let body = segments
        .into_iter()
        .map(serialize_segment)
        .collect::<Vec<_>>()
        .join("\n");
    format!("{}\n\n{}", header(), body)
}

/// Decode a worksheet into fresh segments (new identities, empty output)
pub fn parse(source: &str) -> Result<Vec<Segment>, FormatError> {
    // Split on '\n' only so carriage returns in content survive
    let mut lines = source.split('\n').enumerate().map(|(i, l)| (i + 1, l));

    let header = lines
        .by_ref()
        .find(|(_, l)| !l.trim().is_empty())
        .map(|(_, l)| l.trim_end())
        .ok_or(FormatError::MissingHeader)?;
    let version = header
        .strip_prefix(HEADER_PREFIX)
        .ok_or(FormatError::MissingHeader)?
        .trim();
    if version != FORMAT_VERSION.to_string() {
        return Err(FormatError::UnsupportedVersion(version.to_string()));
    }

    let mut segments = Vec::new();
    while let Some((line_no, line)) = lines.next() {
        let kind = match line.trim_end() {
            "" => continue,
            FREE_MARKER => SegmentKind::Free,
            CODE_MARKER => SegmentKind::Code,
            other => {
                return Err(FormatError::UnexpectedLine {
                    line: line_no,
                    text: other.to_string(),
                })
            }
        };
        let closing = match kind {
            SegmentKind::Free => FREE_MARKER,
            SegmentKind::Code => CODE_MARKER,
        };

        let mut body = Vec::new();
        let mut closed = false;
        for (_, line) in lines.by_ref() {
            if line.trim_end() == closing {
                closed = true;
                break;
            }
            body.push(match kind {
                SegmentKind::Free => decode_free_line(line),
                SegmentKind::Code => unescape_code_line(line),
            });
        }
        if !closed {
            return Err(FormatError::Unterminated {
                line: line_no,
                kind,
            });
        }

        segments.push(Segment::new(kind, body.join("\n")));
    }

    Ok(segments)
}

fn looks_like_code_marker(line: &str) -> bool {
    line.trim_start_matches(ESCAPE).trim_end() == CODE_MARKER
}

fn escape_code_line(line: &str) -> Cow<'_, str> {
    if looks_like_code_marker(line) {
        Cow::Owned(format!("{ESCAPE}{line}"))
    } else {
        Cow::Borrowed(line)
    }
}

fn unescape_code_line(line: &str) -> &str {
    match line.strip_prefix(ESCAPE) {
        Some(rest) if looks_like_code_marker(rest) => rest,
        _ => line,
    }
}

fn decode_free_line(line: &str) -> &str {
    match line.strip_prefix(FREE_LINE_PREFIX) {
        Some(rest) => rest.strip_prefix(' ').unwrap_or(rest),
        // Hand-edited files sometimes lose the prefix
        None => line,
    }
}
