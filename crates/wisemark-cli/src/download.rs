//! Download pipeline: discover recent submissions and land them as PDFs.
//!
//! For every live class: scan the content timeline for assessment ids,
//! fetch each assessment, pick its submission list, and for every
//! submission inside the recency window download the PDF attachments
//! directly, or, when a submission has only images, stage them and merge
//! into one PDF. A failed class, assessment, attachment, or merge is
//! logged and counted; it never aborts the run.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Local, Utc};
use serde_json::Value;
use tracing::{debug, info, warn};
use wisemark_api_client::ApiClient;
use wisemark_core::{
    attachments::{self, IMAGE_EXTS},
    filename, paths, scan, timestamp, AttachmentKind, DownloadReport, WiseConfig,
};
use wisemark_processing::images_to_pdf;

pub async fn run(
    client: &ApiClient,
    config: &WiseConfig,
    days_back: i64,
    root: &Path,
) -> Result<DownloadReport> {
    let since = Utc::now() - Duration::days(days_back);
    let folder = paths::download_folder(root, Local::now().date_naive());
    std::fs::create_dir_all(&folder)
        .with_context(|| format!("Failed to create {}", folder.display()))?;

    let classes_doc = client
        .live_classes(&config.institute_id)
        .await
        .context("Failed to list live classes")?;
    let classes = scan::extract_class_list(&classes_doc);

    info!(classes = classes.len(), "live classes found");
    info!(folder = %folder.display(), since = %since, "downloading submissions");

    let mut report = DownloadReport::default();

    for class in &classes {
        let Some((class_id, class_name)) = scan::extract_class_identity(class) else {
            continue;
        };

        let timeline = match client.content_timeline(&class_id).await {
            Ok(t) => t,
            Err(e) => {
                warn!(class = %class_name, error = format!("{e:#}"), "timeline fetch failed, skipping class");
                continue;
            }
        };
        let assessment_ids = scan::extract_assessment_ids(&timeline);
        debug!(class = %class_name, assessments = assessment_ids.len(), "timeline scanned");

        for assessment_id in &assessment_ids {
            let assessment = match client.assessment(assessment_id).await {
                Ok(a) => a,
                Err(e) => {
                    warn!(assessment = %assessment_id, error = format!("{e:#}"), "assessment fetch failed, skipping");
                    continue;
                }
            };

            let Some(submissions) = scan::best_submission_list(&assessment) else {
                continue;
            };
            let title = scan::extract_assessment_title(&assessment)
                .unwrap_or_else(|| assessment_id.clone());
            debug!(assessment = %title, submissions = submissions.items.len(), "submission list selected");

            for sub in submissions.items {
                process_submission(
                    client,
                    sub,
                    &class_name,
                    assessment_id,
                    &folder,
                    since,
                    &mut report,
                )
                .await;
            }
        }
    }

    info!(
        pdfs_downloaded = report.pdfs_downloaded,
        pdfs_from_images = report.pdfs_from_images,
        skipped_no_files = report.skipped_no_files,
        failed_downloads = report.failed_downloads,
        "download run complete"
    );
    Ok(report)
}

async fn process_submission(
    client: &ApiClient,
    sub: &Value,
    class_name: &str,
    assessment_id: &str,
    folder: &Path,
    since: DateTime<Utc>,
    report: &mut DownloadReport,
) {
    if !timestamp::within_window(timestamp::latest_timestamp(sub), since) {
        return;
    }

    let student_name = scan::extract_student_name(sub);
    let student_id = scan::extract_student_id(sub);

    let atts = attachments::extract_attachments(sub);
    if atts.is_empty() {
        report.skipped_no_files += 1;
        return;
    }

    // The raw assessment id goes into the prefix so the upload run can
    // route the marked file back without any shared state.
    let prefix = filename::marked_prefix(class_name, assessment_id, &student_name, &student_id);

    let pdf_atts: Vec<_> = atts
        .iter()
        .filter(|a| a.kind == AttachmentKind::Pdf)
        .collect();

    for att in &pdf_atts {
        let out_name = filename::attachment_filename(&prefix, &att.filename);
        let out_path = paths::unique_path(folder, &out_name);
        match client.download_with_retry(&att.url, &out_path).await {
            Ok(()) => {
                report.pdfs_downloaded += 1;
                info!(file = %out_path.display(), "downloaded PDF");
            }
            Err(e) => {
                report.failed_downloads += 1;
                warn!(url = %att.url, error = format!("{e:#}"), "PDF download failed");
            }
        }
    }

    // Only when a submission offers no ready-made PDF do the images come
    // into play, merged into one document in source order.
    if pdf_atts.is_empty() {
        merge_image_attachments(client, &atts, &prefix, folder, report).await;
    }
}

fn staged_image_ext(filename: &str) -> &'static str {
    IMAGE_EXTS
        .iter()
        .find(|ext| filename.to_lowercase().ends_with(*ext))
        .copied()
        .unwrap_or(".jpg")
}

async fn merge_image_attachments(
    client: &ApiClient,
    atts: &[wisemark_core::Attachment],
    prefix: &str,
    folder: &Path,
    report: &mut DownloadReport,
) {
    let image_atts: Vec<_> = atts
        .iter()
        .filter(|a| a.kind == AttachmentKind::Image)
        .collect();
    if image_atts.is_empty() {
        return;
    }

    let staging = folder.join(paths::STAGING_DIR_NAME);
    let mut staged: Vec<PathBuf> = Vec::new();

    for (idx, att) in image_atts.iter().enumerate() {
        let ext = staged_image_ext(&att.filename);
        let img_name = format!("{prefix}__image_{:02}{ext}", idx + 1);
        let img_path = paths::unique_path(&staging, &img_name);
        match client.download_with_retry(&att.url, &img_path).await {
            Ok(()) => staged.push(img_path),
            Err(e) => {
                report.failed_downloads += 1;
                warn!(url = %att.url, error = format!("{e:#}"), "image download failed");
            }
        }
    }

    if !staged.is_empty() {
        let out_path = paths::unique_path(folder, &format!("{prefix}__images.pdf"));
        match images_to_pdf(&staged, &out_path) {
            Ok(()) => {
                report.pdfs_from_images += 1;
                info!(file = %out_path.display(), pages = staged.len(), "created PDF from images");
            }
            Err(e) => {
                report.failed_downloads += 1;
                warn!(error = %e, "failed to merge images into PDF");
            }
        }
    }

    // Staged files never outlive the submission that produced them,
    // whatever happened above. Deletion errors are ignored per file.
    for path in &staged {
        let _ = std::fs::remove_file(path);
    }
    let _ = std::fs::remove_dir(&staging);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staged_extension_falls_back_to_jpg() {
        assert_eq!(staged_image_ext("scan.PNG"), ".png");
        assert_eq!(staged_image_ext("photo.jpeg"), ".jpeg");
        assert_eq!(staged_image_ext("mystery"), ".jpg");
        assert_eq!(staged_image_ext("archive.heic"), ".jpg");
    }
}
