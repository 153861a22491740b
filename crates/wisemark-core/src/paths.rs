//! Download-folder layout and filename collision handling.
//!
//! One dated folder per download run; files inside follow the identity
//! codec's grammar; a `_staging` subfolder holds in-flight images and
//! never persists past a single submission's processing. The folder's
//! filename namespace is single-writer: collisions are resolved by
//! probing and appending ` (2)`, ` (3)`, ... to the stem.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::filename;
use crate::models::MarkedIdentity;

/// Prefix of every dated download folder.
pub const DOWNLOAD_DIR_PREFIX: &str = "Downloaded_";

/// Transient subfolder for images awaiting merge.
pub const STAGING_DIR_NAME: &str = "_staging";

const MARKED_SUFFIX: &str = "marked.pdf";

/// Deterministic folder name for a run date.
pub fn dated_folder_name(date: NaiveDate) -> String {
    format!("{DOWNLOAD_DIR_PREFIX}{}", date.format("%Y-%m-%d"))
}

/// The dated download folder for `date` under `root`.
pub fn download_folder(root: &Path, date: NaiveDate) -> PathBuf {
    root.join(dated_folder_name(date))
}

fn split_name(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => (&name[..idx], &name[idx..]),
        _ => (name, ""),
    }
}

/// Probe for a free path in `dir`: `name.ext`, then `name (2).ext`,
/// `name (3).ext`, ... Safe only under the single-writer assumption.
pub fn unique_path(dir: &Path, desired_name: &str) -> PathBuf {
    let candidate = dir.join(desired_name);
    if !candidate.exists() {
        return candidate;
    }
    let (stem, ext) = split_name(desired_name);
    for i in 2..10_000u32 {
        let candidate = dir.join(format!("{stem} ({i}){ext}"));
        if !candidate.exists() {
            return candidate;
        }
    }
    dir.join(format!("{stem} ({}){ext}", chrono::Utc::now().timestamp()))
}

/// Whether a filename follows the marked-file convention.
pub fn is_marked_pdf(name: &str) -> bool {
    name.to_lowercase().ends_with(MARKED_SUFFIX)
}

/// All dated download folders under `root`, newest first.
pub fn download_folders(root: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(root) else {
        return Vec::new();
    };
    let mut folders: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| {
            p.is_dir()
                && p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(DOWNLOAD_DIR_PREFIX))
        })
        .collect();
    // Folder names embed an ISO date, so lexicographic order is date order.
    folders.sort();
    folders.reverse();
    folders
}

/// The most recent download folder, if any.
pub fn latest_download_folder(root: &Path) -> Option<PathBuf> {
    download_folders(root).into_iter().next()
}

fn folder_files(folder: &Path) -> Vec<PathBuf> {
    fs::read_dir(folder)
        .map(|entries| {
            entries
                .flatten()
                .map(|e| e.path())
                .filter(|p| p.is_file())
                .collect()
        })
        .unwrap_or_default()
}

fn file_name(path: &Path) -> &str {
    path.file_name().and_then(|n| n.to_str()).unwrap_or("")
}

/// Count output PDFs in a folder, ignoring `_`-prefixed staging artifacts.
pub fn count_pdfs(folder: &Path) -> usize {
    folder_files(folder)
        .iter()
        .filter(|p| {
            let name = file_name(p);
            !name.starts_with('_') && name.to_lowercase().ends_with(".pdf")
        })
        .count()
}

/// Count marked files in a folder.
pub fn count_marked(folder: &Path) -> usize {
    folder_files(folder)
        .iter()
        .filter(|p| is_marked_pdf(file_name(p)))
        .count()
}

/// Scan a folder for marked files and decode their identities. Returns the
/// decodable files (sorted by name for a stable upload order) and the
/// count of marked files whose names did not decode; those are skipped,
/// never attempted.
pub fn collect_uploadables(folder: &Path) -> io::Result<(Vec<(PathBuf, MarkedIdentity)>, usize)> {
    let mut candidates = Vec::new();
    let mut skipped = 0usize;

    let mut files: Vec<PathBuf> = fs::read_dir(folder)?
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_file() && is_marked_pdf(file_name(p)))
        .collect();
    files.sort();

    for path in files {
        match filename::decode(file_name(&path)) {
            Some(identity) => candidates.push((path, identity)),
            None => skipped += 1,
        }
    }

    Ok((candidates, skipped))
}

#[cfg(test)]
mod tests {
    use super::*;

    const AID: &str = "64a1b2c3d4e5f60718293a4b";
    const SID: &str = "5f60718293a4b64a1b2c3d4e";

    fn touch(path: &Path) {
        fs::write(path, b"x").unwrap();
    }

    #[test]
    fn dated_folder_name_is_deterministic() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        assert_eq!(dated_folder_name(date), "Downloaded_2024-05-01");
    }

    #[test]
    fn unique_path_appends_counter_suffixes() {
        let dir = tempfile::tempdir().unwrap();
        let first = unique_path(dir.path(), "report.pdf");
        assert_eq!(first, dir.path().join("report.pdf"));
        touch(&first);

        let second = unique_path(dir.path(), "report.pdf");
        assert_eq!(second, dir.path().join("report (2).pdf"));
        touch(&second);

        let third = unique_path(dir.path(), "report.pdf");
        assert_eq!(third, dir.path().join("report (3).pdf"));
    }

    #[test]
    fn unique_path_handles_extensionless_names() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("notes"));
        assert_eq!(unique_path(dir.path(), "notes"), dir.path().join("notes (2)"));
    }

    #[test]
    fn latest_folder_is_newest_by_date() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join("Downloaded_2024-04-30")).unwrap();
        fs::create_dir(root.path().join("Downloaded_2024-05-02")).unwrap();
        fs::create_dir(root.path().join("Downloaded_2024-05-01")).unwrap();
        fs::create_dir(root.path().join("unrelated")).unwrap();

        let latest = latest_download_folder(root.path()).unwrap();
        assert_eq!(file_name(&latest), "Downloaded_2024-05-02");
        assert_eq!(download_folders(root.path()).len(), 3);
    }

    #[test]
    fn counts_ignore_staging_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a.pdf"));
        touch(&dir.path().join("b Marked.pdf"));
        touch(&dir.path().join("_staging_leftover.pdf"));
        touch(&dir.path().join("notes.txt"));

        assert_eq!(count_pdfs(dir.path()), 2);
        assert_eq!(count_marked(dir.path()), 1);
    }

    #[test]
    fn collect_uploadables_splits_decodable_from_skipped() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join(format!(
            "Year 10__{AID}__Jane__{SID}__Paper 1 Marked.pdf"
        )));
        touch(&dir.path().join(format!(
            "Year 11__{AID}__Omar__{SID}__Paper 2 Marked.pdf"
        )));
        // Marked but not encoded; counted as skipped.
        touch(&dir.path().join("renamed by hand Marked.pdf"));
        // Not marked at all; invisible to the scan.
        touch(&dir.path().join(format!(
            "Year 10__{AID}__Jane__{SID}__Paper 1.pdf"
        )));

        let (candidates, skipped) = collect_uploadables(dir.path()).unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(skipped, 1);
        assert_eq!(candidates[0].1.assessment_id, AID);
        assert_eq!(candidates[0].1.student_id, SID);
    }
}
