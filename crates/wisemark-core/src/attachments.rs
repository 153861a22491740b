//! Attachment normalization: from one raw submission record to a
//! deduplicated, classified list of downloadable files.
//!
//! Vendor attachment entries are inconsistent about where the download URL
//! lives and what the file is called. Each field goes through an ordered
//! alias list (first present, non-empty string wins): URL `path` →
//! `s3FilePath` → `url` → `downloadUrl`; filename `filename` → `fileName`
//! → `name`; storage key `s3Key` → `key`. Entries that are neither PDFs
//! nor rasters are discarded silently; the vendor attaches types this
//! system does not process.

use std::collections::HashSet;
use std::path::Path;

use serde_json::Value;

use crate::models::{Attachment, AttachmentKind};

/// Raster extensions the image-to-PDF converter accepts.
pub const IMAGE_EXTS: [&str; 4] = [".png", ".jpg", ".jpeg", ".webp"];

const URL_KEYS: [&str; 4] = ["path", "s3FilePath", "url", "downloadUrl"];
const FILENAME_KEYS: [&str; 3] = ["filename", "fileName", "name"];
const STORAGE_KEY_KEYS: [&str; 2] = ["s3Key", "key"];
const IMAGE_TYPE_TAGS: [&str; 5] = ["image", "png", "jpg", "jpeg", "webp"];

fn first_string<'a>(entry: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|k| {
        entry
            .get(*k)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    })
}

fn is_absolute_http(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Path portion of a URL: scheme and host stripped, query and fragment
/// dropped. Non-URL inputs pass through unchanged.
fn url_path(url: &str) -> &str {
    let without = url.split(['?', '#']).next().unwrap_or(url);
    match without.find("://") {
        Some(idx) => {
            let rest = &without[idx + 3..];
            match rest.find('/') {
                Some(slash) => &rest[slash..],
                None => "",
            }
        }
        None => without,
    }
}

/// Lowercased extension with leading dot, from a filename or URL.
fn extension_of(name: &str) -> String {
    Path::new(url_path(name))
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
        .unwrap_or_default()
}

fn url_basename(url: &str) -> Option<String> {
    Path::new(url_path(url))
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .map(str::to_string)
}

/// Normalize one submission record's attachment list. Iteration order
/// follows source order; within the output no two entries share a
/// dedupe key (first occurrence wins).
pub fn extract_attachments(sub: &Value) -> Vec<Attachment> {
    let Some(entries) = sub.get("attachments").and_then(Value::as_array) else {
        return Vec::new();
    };

    let mut picked = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for entry in entries {
        if !entry.is_object() {
            continue;
        }

        let Some(url) = first_string(entry, &URL_KEYS) else {
            continue;
        };
        if !is_absolute_http(url) {
            continue;
        }

        let type_tag = entry
            .get("type")
            .and_then(Value::as_str)
            .map(str::to_lowercase)
            .unwrap_or_default();
        let filename = first_string(entry, &FILENAME_KEYS).unwrap_or_default();
        let ext = if filename.is_empty() {
            extension_of(url)
        } else {
            extension_of(filename)
        };

        let kind = if type_tag == "pdf" || ext == ".pdf" {
            AttachmentKind::Pdf
        } else if IMAGE_TYPE_TAGS.contains(&type_tag.as_str())
            || IMAGE_EXTS.contains(&ext.as_str())
        {
            AttachmentKind::Image
        } else {
            continue;
        };

        let dedupe_key = first_string(entry, &STORAGE_KEY_KEYS)
            .map(str::to_string)
            .unwrap_or_else(|| {
                if filename.is_empty() {
                    url.to_lowercase()
                } else {
                    filename.to_lowercase()
                }
            });
        if !seen.insert(dedupe_key.clone()) {
            continue;
        }

        let filename = if filename.is_empty() {
            url_basename(url).unwrap_or_else(|| format!("attachment{ext}"))
        } else {
            filename.to_string()
        };

        picked.push(Attachment {
            kind,
            url: url.to_string(),
            filename,
            dedupe_key,
        });
    }

    picked
}
