//! Domain models shared across the wisemark crates.

use serde::{Deserialize, Serialize};

/// What a normalized attachment is, and therefore how the download
/// pipeline handles it: PDFs land directly, images are staged and merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    Pdf,
    Image,
}

/// One downloadable file attached to a submission, after normalization.
///
/// `dedupe_key` is the vendor storage key when present, else the lowercased
/// filename-or-URL. Within one submission's normalized list no two
/// attachments share a `dedupe_key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub kind: AttachmentKind,
    pub url: String,
    pub filename: String,
    pub dedupe_key: String,
}

/// The (class, assessment, student) identity recovered from a marked
/// filename. The two id fields are exact 24-hex vendor identifiers; the
/// labels are the sanitized display segments and carry no routing weight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarkedIdentity {
    pub class_label: String,
    pub assessment_id: String,
    pub student_label: String,
    pub student_id: String,
}

/// Per-run counters for the download pipeline. Partial progress is always
/// visible: a run never reduces to a single pass/fail boolean.
#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct DownloadReport {
    /// PDF attachments downloaded directly.
    pub pdfs_downloaded: usize,
    /// PDFs synthesized from image attachments.
    pub pdfs_from_images: usize,
    /// Submissions with no usable attachments.
    pub skipped_no_files: usize,
    /// Attachment downloads or image merges that failed after retries.
    pub failed_downloads: usize,
}

/// Per-run counters for the upload pipeline.
#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct UploadReport {
    /// Files uploaded and attached as feedback.
    pub uploaded: usize,
    /// Files whose name did not decode; never attempted.
    pub skipped: usize,
    /// Files whose remote calls never succeeded.
    pub failed: usize,
}
