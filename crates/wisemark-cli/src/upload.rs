//! Upload pipeline: send marked PDFs back to Wise as feedback attachments.
//!
//! Every file matching the marked-name convention is decoded; names that
//! do not decode are skipped, not attempted. The remote handshake is
//! retried as one unit inside the client; a file whose remote calls never
//! succeed is counted failed and the batch moves on.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};
use wisemark_api_client::ApiClient;
use wisemark_core::{paths, UploadReport};

pub async fn run(client: &ApiClient, folder: &Path) -> Result<UploadReport> {
    let (candidates, skipped) = paths::collect_uploadables(folder)
        .with_context(|| format!("Failed to scan {}", folder.display()))?;

    let mut report = UploadReport {
        skipped,
        ..Default::default()
    };

    if candidates.is_empty() && skipped == 0 {
        info!(folder = %folder.display(), "no marked PDFs found");
        return Ok(report);
    }
    info!(
        found = candidates.len() + skipped,
        folder = %folder.display(),
        "marked PDFs found"
    );

    for (path, identity) in &candidates {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        info!(file = name, student = %identity.student_label, "uploading");

        let outcome = async {
            let descriptor = client.upload_marked_file(path).await?;
            client
                .submit_feedback(&identity.assessment_id, &identity.student_id, &descriptor)
                .await
        }
        .await;

        match outcome {
            Ok(()) => report.uploaded += 1,
            Err(e) => {
                report.failed += 1;
                warn!(file = name, error = format!("{e:#}"), "upload failed");
            }
        }
    }

    info!(
        uploaded = report.uploaded,
        skipped = report.skipped,
        failed = report.failed,
        "upload run complete"
    );
    Ok(report)
}
