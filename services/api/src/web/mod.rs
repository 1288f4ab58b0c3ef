pub mod rest;
pub mod state;

pub use rest::{
    blob_url_handler, card_image_handler, chat_handler, clusters_handler, grammar_handler,
    lesson_audio_handler, speech_url_handler, transcribe_handler,
};

use axum::{
    routing::{get, post},
    Router,
};
use state::AppState;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Builds the API routes over the shared state.
pub fn router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/speech", post(speech_url_handler))
        .route("/lesson-audio", post(lesson_audio_handler))
        .route("/transcriptions", post(transcribe_handler))
        .route("/card-images", post(card_image_handler))
        .route("/blobs/url", get(blob_url_handler))
        .route("/chat", post(chat_handler))
        .route("/grammar", post(grammar_handler))
        .route("/clusters", post(clusters_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
