//! services/api/src/adapters/sst.rs
//!
//! This module contains the adapter for Amazon Transcribe batch jobs.
//! It implements the `TranscriptionJobs` port from the `core` crate.

use async_trait::async_trait;
use aws_sdk_transcribe::types::{
    LanguageCode, Media, MediaFormat, TranscriptionJobStatus as SdkStatus,
};
use aws_sdk_transcribe::Client;
use koala_core::domain::TranscriptionJobStatus;
use koala_core::ports::{PortError, PortResult, TranscriptionJobs};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `TranscriptionJobs` port using Amazon Transcribe.
/// Result documents are downloaded over HTTPS from the URI Transcribe reports.
#[derive(Clone)]
pub struct TranscribeSstAdapter {
    client: Client,
    http: reqwest::Client,
}

impl TranscribeSstAdapter {
    /// Creates a new `TranscribeSstAdapter`.
    pub fn new(client: Client, http: reqwest::Client) -> Self {
        Self { client, http }
    }
}

fn status_from_sdk(
    status: Option<&SdkStatus>,
    transcript_uri: Option<&str>,
    failure_reason: Option<&str>,
) -> TranscriptionJobStatus {
    match status {
        Some(SdkStatus::Completed) => TranscriptionJobStatus::Completed {
            transcript_uri: transcript_uri.map(str::to_string),
        },
        Some(SdkStatus::Failed) => TranscriptionJobStatus::Failed {
            reason: failure_reason.unwrap_or("unknown reason").to_string(),
        },
        _ => TranscriptionJobStatus::InProgress,
    }
}

//=========================================================================================
// `TranscriptionJobs` Trait Implementation
//=========================================================================================

#[async_trait]
impl TranscriptionJobs for TranscribeSstAdapter {
    async fn start_job(
        &self,
        job_name: &str,
        media_uri: &str,
        language_code: &str,
        media_format: &str,
    ) -> PortResult<()> {
        self.client
            .start_transcription_job()
            .transcription_job_name(job_name)
            .media(Media::builder().media_file_uri(media_uri).build())
            .language_code(LanguageCode::from(language_code))
            .media_format(MediaFormat::from(media_format))
            .send()
            .await
            .map_err(|e| {
                PortError::TranscriptionFailed(format!(
                    "Failed to start transcription job {}: {}",
                    job_name,
                    aws_sdk_transcribe::error::DisplayErrorContext(&e)
                ))
            })?;
        Ok(())
    }

    async fn job_status(&self, job_name: &str) -> PortResult<TranscriptionJobStatus> {
        let output = self
            .client
            .get_transcription_job()
            .transcription_job_name(job_name)
            .send()
            .await
            .map_err(|e| {
                PortError::TranscriptionFailed(format!(
                    "Failed to read transcription job {}: {}",
                    job_name,
                    aws_sdk_transcribe::error::DisplayErrorContext(&e)
                ))
            })?;

        let job = output.transcription_job();
        Ok(status_from_sdk(
            job.and_then(|j| j.transcription_job_status()),
            job.and_then(|j| j.transcript())
                .and_then(|t| t.transcript_file_uri()),
            job.and_then(|j| j.failure_reason()),
        ))
    }

    async fn fetch_transcript(&self, transcript_uri: &str) -> PortResult<String> {
        let response = self
            .http
            .get(transcript_uri)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                PortError::TranscriptionFailed(format!("Failed to fetch transcript: {}", e))
            })?;

        response
            .text()
            .await
            .map_err(|e| {
                PortError::TranscriptionFailed(format!("Failed to read transcript: {}", e))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sdk_statuses_map_onto_domain_statuses() {
        assert_eq!(
            status_from_sdk(Some(&SdkStatus::Completed), Some("https://t/1.json"), None),
            TranscriptionJobStatus::Completed {
                transcript_uri: Some("https://t/1.json".to_string())
            }
        );
        assert_eq!(
            status_from_sdk(Some(&SdkStatus::Failed), None, Some("bad audio")),
            TranscriptionJobStatus::Failed {
                reason: "bad audio".to_string()
            }
        );
        assert_eq!(
            status_from_sdk(Some(&SdkStatus::Queued), None, None),
            TranscriptionJobStatus::InProgress
        );
        assert_eq!(status_from_sdk(None, None, None), TranscriptionJobStatus::InProgress);
    }
}
