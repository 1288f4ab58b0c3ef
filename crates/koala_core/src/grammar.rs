//! crates/koala_core/src/grammar.rs
//!
//! Grades a spoken answer: would a native speaker accept it in place of the
//! card's sentence?

use serde_json::json;

use crate::domain::{ChatMessage, GrammarAttempt, GrammarVerdict, LangCode, TextGenerationRequest};
use crate::llm::generate_structured;
use crate::ports::{PortResult, TextGenerationClient};

/// Extra instructions for languages where the default judgement is too strict.
fn language_override(lang: Option<LangCode>) -> &'static str {
    match lang {
        Some(LangCode::Ko) => "For the sake of this discussion, let's say that formality levels don't need to be taken into consideration.",
        _ => "",
    }
}

pub fn grading_prompt(attempt: &GrammarAttempt) -> String {
    let lang = LangCode::parse(&attempt.lang_code);
    let lang_name = lang.map(LangCode::name).unwrap_or(attempt.lang_code.as_str());
    [
        format!("I am learning {}.", lang_name),
        format!(
            "We know \"{}\" means \"{}\" in English.",
            attempt.term, attempt.definition
        ),
        "Let's say I am in a situation that warrants the sentence above.".to_string(),
        format!(
            "Could I say \"{}\" instead (note: I entered it via speech-to-text)?",
            attempt.user_input
        ),
        "Would that be OK?".to_string(),
        language_override(lang).to_string(),
        "Explain in one tweet or less.".to_string(),
    ]
    .join(" ")
}

fn verdict_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "yesNo": { "type": "string", "enum": ["yes", "no"] },
            "why": { "type": "string" }
        },
        "required": ["yesNo", "why"]
    })
}

pub async fn grade_attempt(
    client: &dyn TextGenerationClient,
    attempt: &GrammarAttempt,
) -> PortResult<GrammarVerdict> {
    let request = TextGenerationRequest::new(vec![ChatMessage::user(grading_prompt(attempt))])
        .with_temperature(0.1)
        .with_max_tokens(250);
    generate_structured(client, request, verdict_schema()).await
}
