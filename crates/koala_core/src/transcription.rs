//! crates/koala_core/src/transcription.rs
//!
//! Speech-to-text over an asynchronous job API: upload the recording, start a
//! job, poll it on a fixed interval under a hard budget, and read back the
//! first transcript line.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use bytes::Bytes;
use hound::{SampleFormat, WavSpec, WavWriter};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::{LangCode, TranscriptionJobStatus};
use crate::ports::{BlobStore, PortError, PortResult, TranscriptionJobs};

const UPLOAD_NAMESPACE: &str = "transcriptions";

/// Standard alphabet that accepts input with or without `=` padding.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, Clone, Copy)]
pub struct TranscriberConfig {
    /// Total time to wait for a job before giving up.
    pub timeout: Duration,
    pub poll_interval: Duration,
    /// Sample rate assumed for raw PCM uploads.
    pub pcm_sample_rate: u32,
}

impl Default for TranscriberConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            poll_interval: Duration::from_secs(1),
            pcm_sample_rate: 48_000,
        }
    }
}

impl TranscriberConfig {
    /// Number of status checks that fit in the budget.
    pub fn max_polls(&self) -> u32 {
        let interval = self.poll_interval.as_millis().max(1);
        let polls = (self.timeout.as_millis() / interval).max(1);
        u32::try_from(polls).unwrap_or(u32::MAX)
    }
}

pub struct Transcriber {
    store: Arc<dyn BlobStore>,
    jobs: Arc<dyn TranscriptionJobs>,
    config: TranscriberConfig,
}

impl Transcriber {
    pub fn new(
        store: Arc<dyn BlobStore>,
        jobs: Arc<dyn TranscriptionJobs>,
        config: TranscriberConfig,
    ) -> Self {
        Self {
            store,
            jobs,
            config,
        }
    }

    /// Transcribes a base64 recording (optionally a `data:` URI) spoken in `lang`.
    pub async fn transcribe_b64(&self, data_uri: &str, lang: LangCode) -> PortResult<String> {
        let audio = decode_data_uri(data_uri)?;
        let wav = ensure_wav(audio, self.config.pcm_sample_rate)?;

        let id = Uuid::new_v4().simple().to_string();
        let key = format!("{}/{}.wav", UPLOAD_NAMESPACE, id);
        let job_name = format!("transcription-{}", id);

        self.store.put(&key, wav, "audio/wav").await?;
        self.jobs
            .start_job(
                &job_name,
                &self.store.media_uri(&key),
                lang.transcribe_locale(),
                "wav",
            )
            .await?;
        info!(%job_name, %lang, "Transcription job started");

        let transcript = self.wait_for_completion(&job_name).await?;
        Ok(transcript.lines().next().unwrap_or_default().to_string())
    }

    async fn wait_for_completion(&self, job_name: &str) -> PortResult<String> {
        let max_polls = self.config.max_polls();
        for attempt in 1..=max_polls {
            match self.jobs.job_status(job_name).await? {
                TranscriptionJobStatus::Completed { transcript_uri } => {
                    info!(%job_name, attempt, "Transcription job completed");
                    return match transcript_uri {
                        Some(uri) => {
                            let document = self.jobs.fetch_transcript(&uri).await?;
                            first_transcript(&document)
                        }
                        None => Ok(String::new()),
                    };
                }
                TranscriptionJobStatus::Failed { reason } => {
                    warn!(%job_name, %reason, "Transcription job failed");
                    return Err(PortError::TranscriptionFailed(reason));
                }
                TranscriptionJobStatus::InProgress => {
                    debug!(%job_name, attempt, "Transcription job still running");
                    tokio::time::sleep(self.config.poll_interval).await;
                }
            }
        }
        Err(PortError::Timeout(format!(
            "transcription job {} did not finish within {:?}",
            job_name, self.config.timeout
        )))
    }
}

/// Decodes the base64 payload of a `data:` URI, or the whole string if it has no header.
pub fn decode_data_uri(data_uri: &str) -> PortResult<Bytes> {
    let payload = data_uri.rsplit(";base64,").next().unwrap_or(data_uri);
    let payload: String = payload
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let bytes = LENIENT_BASE64
        .decode(payload.as_bytes())
        .map_err(|e| PortError::InvalidInput(format!("audio is not valid base64: {}", e)))?;
    if bytes.is_empty() {
        return Err(PortError::InvalidInput("audio is empty".to_string()));
    }
    Ok(Bytes::from(bytes))
}

/// Passes WAV files through and wraps anything else as mono 16-bit PCM.
pub fn ensure_wav(audio: Bytes, sample_rate: u32) -> PortResult<Bytes> {
    if audio.starts_with(b"RIFF") {
        return Ok(audio);
    }
    pcm16_to_wav(&audio, sample_rate)
        .map(Bytes::from)
        .map_err(|e| PortError::InvalidInput(format!("Failed to encode WAV: {}", e)))
}

fn pcm16_to_wav(pcm_data: &[u8], sample_rate: u32) -> Result<Vec<u8>, hound::Error> {
    let mut cursor = std::io::Cursor::new(Vec::new());
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut writer = WavWriter::new(&mut cursor, spec)?;
    for chunk in pcm_data.chunks_exact(2) {
        writer.write_sample(i16::from_le_bytes([chunk[0], chunk[1]]))?;
    }
    writer.finalize()?;
    Ok(cursor.into_inner())
}

#[derive(Deserialize)]
struct TranscriptDocument {
    results: TranscriptResults,
}

#[derive(Deserialize)]
struct TranscriptResults {
    transcripts: Vec<TranscriptEntry>,
}

#[derive(Deserialize)]
struct TranscriptEntry {
    transcript: String,
}

/// Extracts `results.transcripts[0].transcript` from a result document.
pub fn first_transcript(document: &str) -> PortResult<String> {
    let parsed: TranscriptDocument = serde_json::from_str(document)
        .map_err(|e| PortError::TranscriptionFailed(format!("unreadable transcript: {}", e)))?;
    parsed
        .results
        .transcripts
        .into_iter()
        .next()
        .map(|entry| entry.transcript)
        .ok_or_else(|| PortError::TranscriptionFailed("transcript document is empty".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{InMemoryBlobStore, ScriptedTranscriptionJobs};
    use base64::engine::general_purpose::STANDARD;

    const DOCUMENT: &str =
        r#"{"jobName":"j","results":{"transcripts":[{"transcript":"안녕하세요\nsecond line"}]}}"#;

    fn wav_data_uri() -> String {
        let wav = pcm16_to_wav(&[0, 0, 1, 0, 2, 0], 16_000).unwrap();
        format!("data:audio/wav;base64,{}", STANDARD.encode(wav))
    }

    fn transcriber(
        store: Arc<InMemoryBlobStore>,
        jobs: Arc<ScriptedTranscriptionJobs>,
    ) -> Transcriber {
        Transcriber::new(store, jobs, TranscriberConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn completed_job_returns_first_line() {
        let store = Arc::new(InMemoryBlobStore::new());
        let jobs = Arc::new(ScriptedTranscriptionJobs::new(
            vec![
                TranscriptionJobStatus::InProgress,
                TranscriptionJobStatus::Completed {
                    transcript_uri: Some("https://results/j.json".to_string()),
                },
            ],
            DOCUMENT,
        ));

        let text = transcriber(store.clone(), jobs.clone())
            .transcribe_b64(&wav_data_uri(), LangCode::Ko)
            .await
            .unwrap();

        assert_eq!(text, "안녕하세요");
        assert_eq!(jobs.poll_count(), 2);
        let (job_name, media_uri, language) = jobs.started()[0].clone();
        assert!(job_name.starts_with("transcription-"));
        assert!(media_uri.starts_with("memory://transcriptions/"));
        assert!(media_uri.ends_with(".wav"));
        assert_eq!(language, "ko-KR");
        let key = &store.keys()[0];
        assert_eq!(store.object(key).unwrap().content_type, "audio/wav");
    }

    #[tokio::test(start_paused = true)]
    async fn job_that_never_finishes_times_out_after_sixty_polls() {
        let store = Arc::new(InMemoryBlobStore::new());
        let jobs = Arc::new(ScriptedTranscriptionJobs::new(Vec::new(), DOCUMENT));

        let err = transcriber(store, jobs.clone())
            .transcribe_b64(&wav_data_uri(), LangCode::En)
            .await
            .unwrap_err();

        assert!(matches!(err, PortError::Timeout(_)));
        assert_eq!(jobs.poll_count(), 60);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_job_reports_the_reason() {
        let store = Arc::new(InMemoryBlobStore::new());
        let jobs = Arc::new(ScriptedTranscriptionJobs::new(
            vec![TranscriptionJobStatus::Failed {
                reason: "unsupported media".to_string(),
            }],
            DOCUMENT,
        ));

        let err = transcriber(store, jobs)
            .transcribe_b64(&wav_data_uri(), LangCode::En)
            .await
            .unwrap_err();

        match err {
            PortError::TranscriptionFailed(reason) => assert_eq!(reason, "unsupported media"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn completed_job_without_transcript_is_empty() {
        let store = Arc::new(InMemoryBlobStore::new());
        let jobs = Arc::new(ScriptedTranscriptionJobs::new(
            vec![TranscriptionJobStatus::Completed { transcript_uri: None }],
            DOCUMENT,
        ));

        let text = transcriber(store, jobs)
            .transcribe_b64(&wav_data_uri(), LangCode::En)
            .await
            .unwrap();

        assert_eq!(text, "");
    }

    #[test]
    fn raw_pcm_is_wrapped_in_a_wav_header() {
        let wav = ensure_wav(Bytes::from_static(&[1, 0, 2, 0]), 48_000).unwrap();
        assert!(wav.starts_with(b"RIFF"));
        let reader = hound::WavReader::new(std::io::Cursor::new(wav.to_vec())).unwrap();
        assert_eq!(reader.spec().sample_rate, 48_000);
        assert_eq!(reader.len(), 2);
    }

    #[test]
    fn bare_base64_is_accepted_and_garbage_rejected() {
        assert_eq!(&decode_data_uri("aGVsbG8=").unwrap()[..], b"hello");
        assert!(matches!(
            decode_data_uri("data:audio/wav;base64,@@@"),
            Err(PortError::InvalidInput(_))
        ));
        assert!(matches!(decode_data_uri(""), Err(PortError::InvalidInput(_))));
    }

    #[test]
    fn unpadded_and_wrapped_base64_is_accepted() {
        assert_eq!(&decode_data_uri("aGVsbG8").unwrap()[..], b"hello");
        assert_eq!(
            &decode_data_uri("data:audio/wav;base64,aGVs\nbG8g\r\nd29y bGQ=").unwrap()[..],
            b"hello world"
        );
    }

    #[test]
    fn poll_budget_follows_timeout_and_interval() {
        assert_eq!(TranscriberConfig::default().max_polls(), 60);
        let config = TranscriberConfig {
            timeout: Duration::from_millis(500),
            poll_interval: Duration::from_secs(1),
            pcm_sample_rate: 16_000,
        };
        assert_eq!(config.max_polls(), 1);
    }

    #[test]
    fn huge_timeout_saturates_the_poll_budget() {
        let config = TranscriberConfig {
            timeout: Duration::MAX,
            poll_interval: Duration::from_millis(1),
            pcm_sample_rate: 16_000,
        };
        assert_eq!(config.max_polls(), u32::MAX);
    }

    #[test]
    fn empty_transcript_list_is_an_error() {
        let err = first_transcript(r#"{"results":{"transcripts":[]}}"#).unwrap_err();
        assert!(matches!(err, PortError::TranscriptionFailed(_)));
    }
}
