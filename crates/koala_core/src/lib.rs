pub mod cache;
pub mod card_image;
pub mod clusters;
pub mod content_address;
pub mod domain;
pub mod grammar;
pub mod lesson;
pub mod llm;
pub mod ports;
pub mod speech;
pub mod transcription;
pub mod voices;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use cache::MediaCache;
pub use card_image::CardImageService;
pub use clusters::Cluster;
pub use domain::{
    ChatMessage, Gender, GrammarAttempt, GrammarVerdict, LangCode, Role, SignedUrl, SpeechRequest,
    SynthesisRequest, TextGeneration, TextGenerationRequest, TextType, TokenUsage,
    TranscriptionJobStatus, VoiceId, YesNo,
};
pub use lesson::{LessonCard, LessonType};
pub use ports::{
    BlobStore, ImageGenerationService, PortError, PortResult, SpeechSynthesisService,
    TextGenerationClient, TranscriptionJobs,
};
pub use speech::SpeechService;
pub use transcription::{Transcriber, TranscriberConfig};
