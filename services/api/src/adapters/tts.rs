//! services/api/src/adapters/tts.rs
//!
//! This module contains the adapter for Amazon Polly's Text-to-Speech service.
//! It implements the `SpeechSynthesisService` port from the `core` crate.

use async_trait::async_trait;
use aws_sdk_polly::types::{Engine, OutputFormat, TextType as PollyTextType, VoiceId};
use aws_sdk_polly::Client;
use bytes::Bytes;
use koala_core::domain::{SynthesisRequest, TextType};
use koala_core::ports::{PortError, PortResult, SpeechSynthesisService};

/// Sample rate requested from Polly for MP3 output.
const SAMPLE_RATE: &str = "24000";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `SpeechSynthesisService` port using Amazon Polly.
#[derive(Clone)]
pub struct PollyTtsAdapter {
    client: Client,
}

impl PollyTtsAdapter {
    /// Creates a new `PollyTtsAdapter`.
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

fn text_type_to_sdk(text_type: TextType) -> PollyTextType {
    match text_type {
        TextType::Text => PollyTextType::Text,
        TextType::Ssml => PollyTextType::Ssml,
    }
}

//=========================================================================================
// `SpeechSynthesisService` Trait Implementation
//=========================================================================================

#[async_trait]
impl SpeechSynthesisService for PollyTtsAdapter {
    /// Synthesizes MP3 audio with the neural engine.
    async fn synthesize(&self, request: &SynthesisRequest) -> PortResult<Bytes> {
        let output = self
            .client
            .synthesize_speech()
            .engine(Engine::Neural)
            .output_format(OutputFormat::Mp3)
            .sample_rate(SAMPLE_RATE)
            .text(&request.text)
            .text_type(text_type_to_sdk(request.text_type))
            .voice_id(VoiceId::from(request.voice.as_str()))
            .send()
            .await
            .map_err(|e| {
                PortError::Producer(format!(
                    "Failed to synthesize speech: {}",
                    aws_sdk_polly::error::DisplayErrorContext(&e)
                ))
            })?;

        let audio = output
            .audio_stream
            .collect()
            .await
            .map_err(|e| PortError::Producer(format!("Failed to read Polly audio stream: {}", e)))?;

        Ok(audio.into_bytes())
    }
}
