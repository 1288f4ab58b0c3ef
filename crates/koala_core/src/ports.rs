//! crates/koala_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the cloud services that back it.

use async_trait::async_trait;
use bytes::Bytes;

use crate::domain::{
    SignedUrl, SynthesisRequest, TextGeneration, TextGenerationRequest, TranscriptionJobStatus,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., SDK, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// A generation API (speech, image, text) failed or returned unusable output.
    #[error("Producer failed: {0}")]
    Producer(String),
    #[error("Producer returned no artifacts: {0}")]
    EmptyArtifact(String),
    /// Upload or URL signing against the blob store failed.
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Transcription failed: {0}")]
    TranscriptionFailed(String),
    #[error("Timed out: {0}")]
    Timeout(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// A durable, key-addressed object store.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Metadata-only existence check. A missing object is `Ok(false)`.
    async fn exists(&self, key: &str) -> PortResult<bool>;

    /// Uploads `bytes` under `key` and returns a signed URL for it.
    /// Concurrent writers to the same key are not coordinated; the last one wins.
    async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> PortResult<SignedUrl>;

    /// Produces a time-limited read URL. The expiry is fixed by configuration.
    async fn sign(&self, key: &str) -> PortResult<SignedUrl>;

    /// The provider-native URI of an object, for services that read the store directly.
    fn media_uri(&self, key: &str) -> String;
}

#[async_trait]
pub trait SpeechSynthesisService: Send + Sync {
    /// Synthesizes the request into encoded audio.
    async fn synthesize(&self, request: &SynthesisRequest) -> PortResult<Bytes>;
}

#[async_trait]
pub trait ImageGenerationService: Send + Sync {
    /// Generates one image for the prompt and returns its encoded bytes.
    async fn generate(&self, prompt: &str) -> PortResult<Bytes>;
}

#[async_trait]
pub trait TextGenerationClient: Send + Sync {
    async fn generate(&self, request: &TextGenerationRequest) -> PortResult<TextGeneration>;
}

/// An asynchronous speech-to-text job API.
#[async_trait]
pub trait TranscriptionJobs: Send + Sync {
    /// Submits a job reading the audio at `media_uri`.
    async fn start_job(
        &self,
        job_name: &str,
        media_uri: &str,
        language_code: &str,
        media_format: &str,
    ) -> PortResult<()>;

    async fn job_status(&self, job_name: &str) -> PortResult<TranscriptionJobStatus>;

    /// Downloads the raw result document of a completed job.
    async fn fetch_transcript(&self, transcript_uri: &str) -> PortResult<String>;
}
