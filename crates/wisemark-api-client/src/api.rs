//! Domain methods for the Wise API.
//!
//! Read endpoints return raw `Value` documents; their shapes drift across
//! assessment types and are only consumed through the core scanner. The
//! upload handshake responses are stable enough to type.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{with_retry, ApiClient, RETRY_ATTEMPTS, RETRY_DELAY};

/// Durable file descriptor returned by `completeUpload` and forwarded on
/// the feedback POST.
#[derive(Debug, Clone, Deserialize)]
pub struct FileDescriptor {
    #[serde(rename = "fileKey")]
    pub file_key: String,
    #[serde(rename = "fileName")]
    pub file_name: String,
    #[serde(rename = "fileType", default = "default_file_type")]
    pub file_type: String,
}

fn default_file_type() -> String {
    "pdf".to_string()
}

#[derive(Debug, Deserialize)]
struct InitiatedUpload {
    #[serde(rename = "uploadUrl")]
    upload_url: String,
    #[serde(rename = "fileKey")]
    file_key: String,
}

impl ApiClient {
    /// List LIVE classes for an institute. Raw envelope; unwrap with
    /// `wisemark_core::scan::extract_class_list`.
    pub async fn live_classes(&self, institute_id: &str) -> Result<Value> {
        self.get(
            &format!("/institutes/{institute_id}/classes"),
            &[("classType", "LIVE"), ("showCoTeachers", "true")],
        )
        .await
    }

    /// A class's content timeline, scanned for assessment ids.
    pub async fn content_timeline(&self, class_id: &str) -> Result<Value> {
        self.get(
            &format!("/user/classes/{class_id}/contentTimeline"),
            &[("showSequentialLearningDisabledSections", "true")],
        )
        .await
    }

    /// One assessment's detail document, scanned for submission lists.
    pub async fn assessment(&self, assessment_id: &str) -> Result<Value> {
        self.get(&format!("/user/getAssessment/{assessment_id}"), &[])
            .await
    }

    async fn initiate_upload(&self, file_name: &str) -> Result<InitiatedUpload> {
        let response = self
            .post_json(
                "/files/initiateUpload",
                &json!({ "fileName": file_name, "fileType": "pdf" }),
            )
            .await?;
        let data = response
            .get("data")
            .cloned()
            .context("initiateUpload response missing data")?;
        serde_json::from_value(data).context("initiateUpload data has unexpected shape")
    }

    async fn complete_upload(&self, file_key: &str) -> Result<FileDescriptor> {
        let response = self
            .post_json("/files/completeUpload", &json!({ "fileKey": file_key }))
            .await?;
        let data = response
            .get("data")
            .cloned()
            .context("completeUpload response missing data")?;
        serde_json::from_value(data).context("completeUpload data has unexpected shape")
    }

    /// Upload a local PDF through the vendor handshake: initiate to get a
    /// write location, PUT the bytes, complete for the durable descriptor.
    /// The whole three-step unit is retried on any transport or protocol
    /// error.
    pub async fn upload_marked_file(&self, path: &Path) -> Result<FileDescriptor> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .context("File has no UTF-8 name")?
            .to_string();
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;

        with_retry("upload handshake", RETRY_ATTEMPTS, RETRY_DELAY, || {
            let file_name = file_name.clone();
            let bytes = bytes.clone();
            async move {
                let init = self.initiate_upload(&file_name).await?;
                self.put_bytes(&init.upload_url, bytes).await?;
                self.complete_upload(&init.file_key).await
            }
        })
        .await
    }

    /// Attach an uploaded file as feedback on one student's submission.
    pub async fn submit_feedback(
        &self,
        assessment_id: &str,
        student_id: &str,
        file: &FileDescriptor,
    ) -> Result<()> {
        let payload = json!({
            "assessmentId": assessment_id,
            "studentId": student_id,
            "attachments": [{
                "fileKey": file.file_key,
                "fileName": file.file_name,
                "fileType": file.file_type,
            }],
        });
        self.post_json("/user/submitAssessmentFeedback", &payload)
            .await
            .map(|_| ())
    }

    /// Fetch a file with the same bounded retry as uploads.
    pub async fn download_with_retry(&self, url: &str, out_path: &Path) -> Result<()> {
        with_retry("download", RETRY_ATTEMPTS, RETRY_DELAY, || {
            self.download_to_file(url, out_path)
        })
        .await
    }
}
