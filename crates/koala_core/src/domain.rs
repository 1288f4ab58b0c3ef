//! crates/koala_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These types are independent of any cloud provider or wire format.

use serde::{Deserialize, Serialize};
use std::fmt;

//=========================================================================================
// Languages and Voices
//=========================================================================================

/// A language the app teaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LangCode {
    Ar,
    Ca,
    Cs,
    Da,
    De,
    El,
    En,
    Es,
    Fi,
    Fr,
    Gl,
    Gu,
    He,
    Hi,
    Hu,
    Id,
    It,
    Kn,
    Ko,
    Lt,
    Lv,
    Mr,
    Ms,
    Nb,
    Nl,
    Pa,
    Pl,
    Pt,
    Ro,
    Ru,
    Sk,
    Sr,
    Sv,
    Tr,
    Uk,
    Vi,
}

impl LangCode {
    pub const ALL: [LangCode; 36] = [
        LangCode::Ar,
        LangCode::Ca,
        LangCode::Cs,
        LangCode::Da,
        LangCode::De,
        LangCode::El,
        LangCode::En,
        LangCode::Es,
        LangCode::Fi,
        LangCode::Fr,
        LangCode::Gl,
        LangCode::Gu,
        LangCode::He,
        LangCode::Hi,
        LangCode::Hu,
        LangCode::Id,
        LangCode::It,
        LangCode::Kn,
        LangCode::Ko,
        LangCode::Lt,
        LangCode::Lv,
        LangCode::Mr,
        LangCode::Ms,
        LangCode::Nb,
        LangCode::Nl,
        LangCode::Pa,
        LangCode::Pl,
        LangCode::Pt,
        LangCode::Ro,
        LangCode::Ru,
        LangCode::Sk,
        LangCode::Sr,
        LangCode::Sv,
        LangCode::Tr,
        LangCode::Uk,
        LangCode::Vi,
    ];

    /// The two-letter code, e.g. `"ko"`.
    pub fn code(self) -> &'static str {
        match self {
            LangCode::Ar => "ar",
            LangCode::Ca => "ca",
            LangCode::Cs => "cs",
            LangCode::Da => "da",
            LangCode::De => "de",
            LangCode::El => "el",
            LangCode::En => "en",
            LangCode::Es => "es",
            LangCode::Fi => "fi",
            LangCode::Fr => "fr",
            LangCode::Gl => "gl",
            LangCode::Gu => "gu",
            LangCode::He => "he",
            LangCode::Hi => "hi",
            LangCode::Hu => "hu",
            LangCode::Id => "id",
            LangCode::It => "it",
            LangCode::Kn => "kn",
            LangCode::Ko => "ko",
            LangCode::Lt => "lt",
            LangCode::Lv => "lv",
            LangCode::Mr => "mr",
            LangCode::Ms => "ms",
            LangCode::Nb => "nb",
            LangCode::Nl => "nl",
            LangCode::Pa => "pa",
            LangCode::Pl => "pl",
            LangCode::Pt => "pt",
            LangCode::Ro => "ro",
            LangCode::Ru => "ru",
            LangCode::Sk => "sk",
            LangCode::Sr => "sr",
            LangCode::Sv => "sv",
            LangCode::Tr => "tr",
            LangCode::Uk => "uk",
            LangCode::Vi => "vi",
        }
    }

    /// The English display name, e.g. `"Korean"`.
    pub fn name(self) -> &'static str {
        match self {
            LangCode::Ar => "Arabic",
            LangCode::Ca => "Catalan",
            LangCode::Cs => "Czech",
            LangCode::Da => "Danish",
            LangCode::De => "German",
            LangCode::El => "Greek",
            LangCode::En => "English",
            LangCode::Es => "Spanish",
            LangCode::Fi => "Finnish",
            LangCode::Fr => "French",
            LangCode::Gl => "Galician",
            LangCode::Gu => "Gujarati",
            LangCode::He => "Hebrew",
            LangCode::Hi => "Hindi",
            LangCode::Hu => "Hungarian",
            LangCode::Id => "Indonesian",
            LangCode::It => "Italian",
            LangCode::Kn => "Kannada",
            LangCode::Ko => "Korean",
            LangCode::Lt => "Lithuanian",
            LangCode::Lv => "Latvian",
            LangCode::Mr => "Marathi",
            LangCode::Ms => "Malay",
            LangCode::Nb => "Norwegian",
            LangCode::Nl => "Dutch",
            LangCode::Pa => "Punjabi",
            LangCode::Pl => "Polish",
            LangCode::Pt => "Portuguese",
            LangCode::Ro => "Romanian",
            LangCode::Ru => "Russian",
            LangCode::Sk => "Slovak",
            LangCode::Sr => "Serbian",
            LangCode::Sv => "Swedish",
            LangCode::Tr => "Turkish",
            LangCode::Uk => "Ukrainian",
            LangCode::Vi => "Vietnamese",
        }
    }

    /// Parses a language tag. Only the first two characters are considered, so
    /// regional tags such as `"en-US"` or `"KO_kr"` resolve to their base language.
    pub fn parse(raw: &str) -> Option<LangCode> {
        let prefix: String = raw.chars().take(2).collect::<String>().to_lowercase();
        LangCode::ALL.into_iter().find(|lang| lang.code() == prefix)
    }

    /// The locale Amazon Transcribe expects for this language.
    /// Languages without a dedicated mapping are transcribed as US English.
    pub fn transcribe_locale(self) -> &'static str {
        match self {
            LangCode::En => "en-US",
            LangCode::Fr => "fr-FR",
            LangCode::Es => "es-ES",
            LangCode::De => "de-DE",
            LangCode::It => "it-IT",
            LangCode::Ko => "ko-KR",
            LangCode::Pt => "pt-BR",
            LangCode::Ar => "ar-SA",
            LangCode::He => "he-IL",
            LangCode::Hi => "hi-IN",
            LangCode::Id => "id-ID",
            LangCode::Nl => "nl-NL",
            LangCode::Pl => "pl-PL",
            LangCode::Ru => "ru-RU",
            LangCode::Sv => "sv-SE",
            LangCode::Tr => "tr-TR",
            _ => "en-US",
        }
    }
}

impl fmt::Display for LangCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Preferred voice gender for synthesized speech.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "F")]
    Female,
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "N")]
    Neutral,
}

impl Gender {
    pub fn code(self) -> &'static str {
        match self {
            Gender::Female => "F",
            Gender::Male => "M",
            Gender::Neutral => "N",
        }
    }

    /// Unknown codes are treated as "no preference".
    pub fn parse_or_neutral(raw: &str) -> Gender {
        match raw.trim() {
            "F" | "f" => Gender::Female,
            "M" | "m" => Gender::Male,
            _ => Gender::Neutral,
        }
    }
}

/// The name of an Amazon Polly voice, e.g. `"Joanna"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VoiceId(pub &'static str);

impl VoiceId {
    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for VoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

//=========================================================================================
// Speech
//=========================================================================================

/// Whether synthesis input is plain text or SSML markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextType {
    Text,
    Ssml,
}

/// A request for a cached lesson audio clip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechRequest {
    pub text: String,
    /// The language tag exactly as the caller sent it. It is part of the cache key.
    pub lang_code: String,
    pub gender: Gender,
    /// Speaking rate in percent, where 100 is the normal rate.
    pub speed: Option<u32>,
}

/// What the speech producer is asked to synthesize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisRequest {
    pub text: String,
    pub text_type: TextType,
    pub voice: VoiceId,
}

//=========================================================================================
// Blob Storage
//=========================================================================================

/// A short-lived, read-only URL for a stored artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignedUrl(pub String);

impl SignedUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for SignedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

//=========================================================================================
// Text Generation
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One turn of a conversation sent to the text generation model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

pub const DEFAULT_MAX_TOKENS: u32 = 1024;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// A provider-neutral text generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct TextGenerationRequest {
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub system: Option<String>,
    /// A JSON schema the output is expected to satisfy.
    pub response_schema: Option<serde_json::Value>,
}

impl TextGenerationRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            system: None,
            response_schema: None,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl TokenUsage {
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

/// The generated text and what it cost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextGeneration {
    pub text: String,
    pub usage: TokenUsage,
}

//=========================================================================================
// Transcription
//=========================================================================================

/// The state of an asynchronous speech-to-text job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptionJobStatus {
    InProgress,
    Completed { transcript_uri: Option<String> },
    Failed { reason: String },
}

//=========================================================================================
// Grammar Grading
//=========================================================================================

/// A spoken answer to grade against a flash card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrammarAttempt {
    pub term: String,
    pub definition: String,
    pub lang_code: String,
    pub user_input: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum YesNo {
    Yes,
    No,
}

/// The model's judgement on a [`GrammarAttempt`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrammarVerdict {
    #[serde(rename = "yesNo")]
    pub yes_no: YesNo,
    pub why: String,
}

impl GrammarVerdict {
    pub fn passed(&self) -> bool {
        self.yes_no == YesNo::Yes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lang_code_parse_uses_two_letter_prefix() {
        assert_eq!(LangCode::parse("en"), Some(LangCode::En));
        assert_eq!(LangCode::parse("KO-kr"), Some(LangCode::Ko));
        assert_eq!(LangCode::parse("xx"), None);
        assert_eq!(LangCode::parse(""), None);
    }

    #[test]
    fn every_language_round_trips_through_its_code() {
        for lang in LangCode::ALL {
            assert_eq!(LangCode::parse(lang.code()), Some(lang));
        }
    }

    #[test]
    fn unmapped_languages_transcribe_as_us_english() {
        assert_eq!(LangCode::Ko.transcribe_locale(), "ko-KR");
        assert_eq!(LangCode::Lv.transcribe_locale(), "en-US");
    }

    #[test]
    fn unknown_gender_is_neutral() {
        assert_eq!(Gender::parse_or_neutral("M"), Gender::Male);
        assert_eq!(Gender::parse_or_neutral("X"), Gender::Neutral);
    }

    #[test]
    fn grammar_verdict_reads_camel_case_json() {
        let verdict: GrammarVerdict =
            serde_json::from_str(r#"{"yesNo":"no","why":"Wrong particle."}"#).unwrap();
        assert!(!verdict.passed());
        assert_eq!(verdict.why, "Wrong particle.");
    }
}
