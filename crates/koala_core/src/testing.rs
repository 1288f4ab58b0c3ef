//! crates/koala_core/src/testing.rs
//!
//! In-memory implementations of every port, for unit tests in this crate and,
//! behind the `test-utils` feature, for the service's handler tests.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::domain::{
    SignedUrl, SynthesisRequest, TextGeneration, TextGenerationRequest, TokenUsage,
    TranscriptionJobStatus,
};
use crate::ports::{
    BlobStore, ImageGenerationService, PortError, PortResult, SpeechSynthesisService,
    TextGenerationClient, TranscriptionJobs,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

//=========================================================================================
// Blob Store
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bytes: Bytes,
    pub content_type: String,
}

/// A blob store backed by a map. Signed URLs are `memory://{key}`.
#[derive(Default)]
pub struct InMemoryBlobStore {
    objects: Mutex<HashMap<String, StoredObject>>,
    fail_exists: AtomicBool,
    fail_put: AtomicBool,
    puts: AtomicUsize,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every existence check return an error.
    pub fn fail_exists(&self, fail: bool) {
        self.fail_exists.store(fail, Ordering::SeqCst);
    }

    pub fn fail_put(&self, fail: bool) {
        self.fail_put.store(fail, Ordering::SeqCst);
    }

    pub fn insert(&self, key: &str, bytes: Bytes, content_type: &str) {
        lock(&self.objects).insert(
            key.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
    }

    pub fn object(&self, key: &str) -> Option<StoredObject> {
        lock(&self.objects).get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = lock(&self.objects).keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        lock(&self.objects).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn exists(&self, key: &str) -> PortResult<bool> {
        if self.fail_exists.load(Ordering::SeqCst) {
            return Err(PortError::Storage("connection reset".to_string()));
        }
        Ok(lock(&self.objects).contains_key(key))
    }

    async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> PortResult<SignedUrl> {
        if self.fail_put.load(Ordering::SeqCst) {
            return Err(PortError::Storage(format!("upload of {} rejected", key)));
        }
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.insert(key, bytes, content_type);
        self.sign(key).await
    }

    async fn sign(&self, key: &str) -> PortResult<SignedUrl> {
        Ok(SignedUrl(format!("memory://{}", key)))
    }

    fn media_uri(&self, key: &str) -> String {
        format!("memory://{}", key)
    }
}

//=========================================================================================
// Producers
//=========================================================================================

/// Returns fixed audio and records every synthesis request.
pub struct FakeSpeechSynthesis {
    audio: Bytes,
    fail: AtomicBool,
    requests: Mutex<Vec<SynthesisRequest>>,
}

impl FakeSpeechSynthesis {
    pub fn new(audio: &'static [u8]) -> Self {
        Self {
            audio: Bytes::from_static(audio),
            fail: AtomicBool::new(false),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn requests(&self) -> Vec<SynthesisRequest> {
        lock(&self.requests).clone()
    }
}

#[async_trait]
impl SpeechSynthesisService for FakeSpeechSynthesis {
    async fn synthesize(&self, request: &SynthesisRequest) -> PortResult<Bytes> {
        lock(&self.requests).push(request.clone());
        if self.fail.load(Ordering::SeqCst) {
            return Err(PortError::Producer("synthesis unavailable".to_string()));
        }
        Ok(self.audio.clone())
    }
}

/// Returns fixed image bytes, or no artifact at all when built with `empty()`.
pub struct FakeImageGenerator {
    image: Option<Bytes>,
    prompts: Mutex<Vec<String>>,
}

impl FakeImageGenerator {
    pub fn new(image: &'static [u8]) -> Self {
        Self {
            image: Some(Bytes::from_static(image)),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn empty() -> Self {
        Self {
            image: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        lock(&self.prompts).clone()
    }
}

#[async_trait]
impl ImageGenerationService for FakeImageGenerator {
    async fn generate(&self, prompt: &str) -> PortResult<Bytes> {
        lock(&self.prompts).push(prompt.to_string());
        self.image
            .clone()
            .ok_or_else(|| PortError::EmptyArtifact("image model returned 0 artifacts".to_string()))
    }
}

/// Replies with queued texts in order and records each request.
#[derive(Default)]
pub struct ScriptedTextClient {
    replies: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<TextGenerationRequest>>,
}

impl ScriptedTextClient {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<TextGenerationRequest> {
        lock(&self.requests).clone()
    }
}

#[async_trait]
impl TextGenerationClient for ScriptedTextClient {
    async fn generate(&self, request: &TextGenerationRequest) -> PortResult<TextGeneration> {
        lock(&self.requests).push(request.clone());
        let text = lock(&self.replies)
            .pop_front()
            .ok_or_else(|| PortError::Producer("no scripted reply left".to_string()))?;
        Ok(TextGeneration {
            usage: TokenUsage {
                input_tokens: 10,
                output_tokens: text.split_whitespace().count() as u32,
            },
            text,
        })
    }
}

//=========================================================================================
// Transcription Jobs
//=========================================================================================

/// A job API whose status calls walk through a fixed script. Once the script is
/// exhausted the job stays in progress forever.
pub struct ScriptedTranscriptionJobs {
    statuses: Mutex<VecDeque<TranscriptionJobStatus>>,
    document: String,
    started: Mutex<Vec<(String, String, String)>>,
    polls: AtomicUsize,
}

impl ScriptedTranscriptionJobs {
    pub fn new(statuses: Vec<TranscriptionJobStatus>, document: impl Into<String>) -> Self {
        Self {
            statuses: Mutex::new(statuses.into()),
            document: document.into(),
            started: Mutex::new(Vec::new()),
            polls: AtomicUsize::new(0),
        }
    }

    /// `(job_name, media_uri, language_code)` of every submitted job.
    pub fn started(&self) -> Vec<(String, String, String)> {
        lock(&self.started).clone()
    }

    pub fn poll_count(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TranscriptionJobs for ScriptedTranscriptionJobs {
    async fn start_job(
        &self,
        job_name: &str,
        media_uri: &str,
        language_code: &str,
        _media_format: &str,
    ) -> PortResult<()> {
        lock(&self.started).push((
            job_name.to_string(),
            media_uri.to_string(),
            language_code.to_string(),
        ));
        Ok(())
    }

    async fn job_status(&self, _job_name: &str) -> PortResult<TranscriptionJobStatus> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        Ok(lock(&self.statuses)
            .pop_front()
            .unwrap_or(TranscriptionJobStatus::InProgress))
    }

    async fn fetch_transcript(&self, _transcript_uri: &str) -> PortResult<String> {
        Ok(self.document.clone())
    }
}
