//! Identity codec: pack a (class, assessment, student) identity into a
//! filename and recover it later.
//!
//! The download and upload runs are disconnected processes with no shared
//! database, so the filename is the only persisted link between a local
//! file and its remote (assessment, student) identity. Encoding and
//! decoding form one strict grammar: anything `encode` produces must
//! decode, and anything a human plausibly mistypes (a missing " Marked"
//! suffix, a truncated id) must fail to decode rather than misroute
//! feedback to the wrong student.
//!
//! Grammar: `class__<24-hex assessment id>__student__<24-hex student id>__
//! <original name> Marked.pdf`, matched case-insensitively. Only the
//! strict-id form exists; legacy names carrying an assessment title in the
//! second segment do not decode.

use std::sync::OnceLock;

use regex::Regex;

use crate::models::MarkedIdentity;

/// Segment separator. Sanitized segments can never contain it.
pub const SEGMENT_DELIMITER: &str = "__";

pub const MAX_CLASS_LEN: usize = 50;
pub const MAX_ASSESSMENT_LEN: usize = 60;
pub const MAX_STUDENT_LEN: usize = 50;
pub const MAX_ORIGINAL_LEN: usize = 90;

/// Sanitize one free-text segment for use inside the filename grammar:
/// path-illegal and control characters become spaces, whitespace runs
/// collapse to a single space, `__` folds to `_` until the delimiter
/// cannot occur inside the segment, and the result is capped at `max_len`
/// characters.
pub fn sanitize_component(s: &str, max_len: usize) -> String {
    let replaced: String = s
        .chars()
        .map(|c| {
            if c.is_control() || matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*') {
                ' '
            } else {
                c
            }
        })
        .collect();

    let mut out = replaced.split_whitespace().collect::<Vec<_>>().join(" ");
    while out.contains(SEGMENT_DELIMITER) {
        out = out.replace(SEGMENT_DELIMITER, "_");
    }

    if out.chars().count() > max_len {
        out.chars().take(max_len).collect()
    } else {
        out
    }
}

/// Build the identity prefix for every file a submission produces:
/// `class__assessment__student__student_id`.
///
/// The assessment label is the raw vendor id during downloads so the
/// upload run can route the marked file back; the student id is carried
/// exactly as issued (sanitizing a hex token is a no-op, trimming aside).
pub fn marked_prefix(
    class_label: &str,
    assessment_label: &str,
    student_label: &str,
    student_id: &str,
) -> String {
    [
        sanitize_component(class_label, MAX_CLASS_LEN),
        sanitize_component(assessment_label, MAX_ASSESSMENT_LEN),
        sanitize_component(student_label, MAX_STUDENT_LEN),
        student_id.trim().to_string(),
    ]
    .join(SEGMENT_DELIMITER)
}

/// Append the sanitized original attachment name to an identity prefix,
/// ensuring a `.pdf` extension.
pub fn attachment_filename(prefix: &str, original_filename: &str) -> String {
    let original = sanitize_component(original_filename, MAX_ORIGINAL_LEN);
    let mut name = format!("{prefix}{SEGMENT_DELIMITER}{original}");
    if !name.to_lowercase().ends_with(".pdf") {
        name.push_str(".pdf");
    }
    name
}

/// Full encode: identity prefix plus original attachment name.
pub fn encode(
    class_label: &str,
    assessment_label: &str,
    student_label: &str,
    student_id: &str,
    original_filename: &str,
) -> String {
    attachment_filename(
        &marked_prefix(class_label, assessment_label, student_label, student_id),
        original_filename,
    )
}

static MARKED_RE: OnceLock<Regex> = OnceLock::new();

fn marked_pattern() -> &'static Regex {
    MARKED_RE.get_or_init(|| {
        Regex::new(
            r"(?i)^(?P<class>.+?)__(?P<assessment>[0-9a-f]{24})__(?P<student>.+?)__(?P<student_id>[0-9a-f]{24})__.+?\sMarked\.pdf$",
        )
        .expect("marked filename pattern is valid")
    })
}

/// Decode a marked filename back into its identity. Returns `None` on any
/// mismatch; callers treat unmatched names as a skip, not an error.
pub fn decode(filename: &str) -> Option<MarkedIdentity> {
    let caps = marked_pattern().captures(filename)?;
    Some(MarkedIdentity {
        class_label: caps["class"].to_string(),
        assessment_id: caps["assessment"].to_string(),
        student_label: caps["student"].to_string(),
        student_id: caps["student_id"].to_string(),
    })
}
