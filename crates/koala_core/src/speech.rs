//! crates/koala_core/src/speech.rs
//!
//! Lesson audio: turns a [`SpeechRequest`] into a signed URL of a cached MP3,
//! synthesizing it with a randomly chosen voice only when it is not stored yet.

use std::sync::Arc;
use tracing::debug;

use crate::cache::MediaCache;
use crate::domain::{SignedUrl, SpeechRequest, SynthesisRequest, TextType, VoiceId};
use crate::ports::{PortResult, SpeechSynthesisService};
use crate::voices::pick_voice;

pub const AUDIO_NAMESPACE: &str = "lesson-audio";
pub const AUDIO_EXT: &str = "mp3";
pub const AUDIO_CONTENT_TYPE: &str = "audio/mpeg";

/// Speaking rate Polly uses when none is requested.
const NORMAL_SPEED: u32 = 100;

pub struct SpeechService {
    cache: MediaCache,
    synthesizer: Arc<dyn SpeechSynthesisService>,
}

impl SpeechService {
    pub fn new(cache: MediaCache, synthesizer: Arc<dyn SpeechSynthesisService>) -> Self {
        Self { cache, synthesizer }
    }

    /// Returns a signed URL for the audio of `request`.
    pub async fn generate_speech_url(&self, request: &SpeechRequest) -> PortResult<SignedUrl> {
        let key_fields = cache_key_fields(request);
        self.cache
            .get_or_create(
                AUDIO_NAMESPACE,
                &key_fields,
                AUDIO_EXT,
                AUDIO_CONTENT_TYPE,
                move || async move {
                    let voice = {
                        let mut rng = rand::thread_rng();
                        pick_voice(&request.lang_code, request.gender, &mut rng)
                    };
                    let synthesis = synthesis_request(request, voice);
                    debug!(%voice, text_type = ?synthesis.text_type, "Synthesizing lesson audio");
                    self.synthesizer.synthesize(&synthesis).await
                },
            )
            .await
    }
}

/// Text, language and gender identify a clip. For plain text a non-default speed
/// changes the synthesized markup, so it is appended to keep slowed-down audio
/// from overwriting the normal-rate clip. SSML carries its own rate and is keyed
/// on the markup alone.
pub fn cache_key_fields(request: &SpeechRequest) -> Vec<String> {
    let mut fields = vec![
        request.text.clone(),
        request.lang_code.clone(),
        request.gender.code().to_string(),
    ];
    if !is_ssml(&request.text) {
        if let Some(speed) = effective_speed(request.speed) {
            fields.push(speed.to_string());
        }
    }
    fields
}

fn is_ssml(text: &str) -> bool {
    text.contains("<speak>")
}

fn effective_speed(speed: Option<u32>) -> Option<u32> {
    speed.filter(|&s| s != NORMAL_SPEED)
}

/// Builds the producer request: caller-supplied SSML is passed through untouched,
/// plain text is wrapped in a prosody tag when a speed is requested.
pub fn synthesis_request(request: &SpeechRequest, voice: VoiceId) -> SynthesisRequest {
    if is_ssml(&request.text) {
        return SynthesisRequest {
            text: request.text.clone(),
            text_type: TextType::Ssml,
            voice,
        };
    }

    match effective_speed(request.speed) {
        Some(speed) => SynthesisRequest {
            text: format!(
                "<speak><prosody rate=\"{}%\">{}</prosody></speak>",
                speed,
                escape_xml(&request.text)
            ),
            text_type: TextType::Ssml,
            voice,
        },
        None => SynthesisRequest {
            text: request.text.clone(),
            text_type: TextType::Text,
            voice,
        },
    }
}

pub(crate) fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
