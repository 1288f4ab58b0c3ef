//! crates/koala_core/src/lesson.rs
//!
//! Lesson audio for a flash card. Each lesson type reads the card through its own
//! SSML template; the resulting markup goes through the cached speech flow.

use serde::Deserialize;

use crate::domain::{Gender, SignedUrl, SpeechRequest};
use crate::ports::PortResult;
use crate::speech::{escape_xml, SpeechService};

/// Rate used in templates when the caller does not ask for one.
const DEFAULT_SPEED: u32 = 100;

/// How the card is presented in a lesson.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LessonType {
    /// The English definition only; the learner answers in the target language.
    Speaking,
    /// The term only, at the requested rate.
    Listening,
    /// The term, then its definition read by an English voice.
    New,
    Remedial,
}

/// The parts of a card that lesson audio depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonCard {
    pub term: String,
    pub definition: String,
    pub gender: Gender,
    pub lang_code: String,
}

/// Builds the SSML for `card` in a lesson of the given type.
pub fn lesson_ssml(card: &LessonCard, lesson_type: LessonType, speed: Option<u32>) -> String {
    let term = escape_xml(&remove_parens(&card.term));
    let definition = escape_xml(&remove_parens(&card.definition));
    let speed = speed.unwrap_or(DEFAULT_SPEED);

    match lesson_type {
        LessonType::Speaking => format!(
            "<speak><voice language=\"en-US\" gender=\"female\">{}</voice></speak>",
            definition
        ),
        LessonType::Listening => format!(
            "<speak><prosody rate=\"{}%\">{}</prosody></speak>",
            speed, term
        ),
        LessonType::New | LessonType::Remedial => format!(
            "<speak><prosody rate=\"{}%\">{}</prosody><break time=\"0.4s\"/>\
             <voice language=\"en-US\" gender=\"female\">{}</voice><break time=\"0.4s\"/></speak>",
            speed, term, definition
        ),
    }
}

/// Returns a signed URL for the card's lesson audio, synthesizing it on first use.
pub async fn lesson_audio(
    speech: &SpeechService,
    card: &LessonCard,
    lesson_type: LessonType,
    speed: Option<u32>,
) -> PortResult<SignedUrl> {
    let request = SpeechRequest {
        text: lesson_ssml(card, lesson_type, speed),
        lang_code: card.lang_code.clone(),
        gender: card.gender,
        speed,
    };
    speech.generate_speech_url(&request).await
}

/// Drops parenthesized hints such as "(formal)" and tidies the spacing they leave.
pub fn remove_parens(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut depth = 0usize;
    for c in text.chars() {
        match c {
            '(' => depth += 1,
            ')' if depth > 0 => depth -= 1,
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}
