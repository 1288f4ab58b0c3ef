//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use koala_core::ports::{
    BlobStore, ImageGenerationService, SpeechSynthesisService, TextGenerationClient,
    TranscriptionJobs,
};
use koala_core::{CardImageService, MediaCache, SpeechService, Transcriber, TranscriberConfig};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn BlobStore>,
    pub text: Arc<dyn TextGenerationClient>,
    pub speech: SpeechService,
    pub card_images: CardImageService,
    pub transcriber: Transcriber,
}

/// The external services the application is wired against.
pub struct Ports {
    pub store: Arc<dyn BlobStore>,
    pub speech: Arc<dyn SpeechSynthesisService>,
    pub text: Arc<dyn TextGenerationClient>,
    pub images: Arc<dyn ImageGenerationService>,
    pub transcription: Arc<dyn TranscriptionJobs>,
}

impl AppState {
    /// Builds every core service on top of one shared set of clients.
    pub fn new(config: Arc<Config>, ports: Ports) -> Self {
        let cache = MediaCache::new(ports.store.clone());
        let transcriber_config = TranscriberConfig {
            timeout: config.transcribe_timeout,
            poll_interval: config.transcribe_poll_interval,
            pcm_sample_rate: config.transcribe_sample_rate,
        };

        Self {
            speech: SpeechService::new(cache.clone(), ports.speech),
            card_images: CardImageService::new(cache, ports.text.clone(), ports.images),
            transcriber: Transcriber::new(
                ports.store.clone(),
                ports.transcription,
                transcriber_config,
            ),
            store: ports.store,
            text: ports.text,
            config,
        }
    }
}
