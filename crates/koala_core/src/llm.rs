//! crates/koala_core/src/llm.rs
//!
//! Helpers layered on top of any [`TextGenerationClient`]: structured (JSON)
//! output and the flash-card image prompt.

use serde::de::DeserializeOwned;

use crate::domain::{ChatMessage, TextGenerationRequest};
use crate::ports::{PortError, PortResult, TextGenerationClient};

/// Requests output conforming to `schema` and deserializes it into `T`.
pub async fn generate_structured<T: DeserializeOwned>(
    client: &dyn TextGenerationClient,
    mut request: TextGenerationRequest,
    schema: serde_json::Value,
) -> PortResult<T> {
    request.response_schema = Some(schema);
    let generation = client.generate(&request).await?;
    parse_json_reply(&generation.text)
}

/// Parses a model reply as JSON, accepting a reply wrapped in a Markdown code fence.
pub fn parse_json_reply<T: DeserializeOwned>(reply: &str) -> PortResult<T> {
    let trimmed = reply.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed);

    if body.is_empty() {
        return Err(PortError::Producer("No content in response".to_string()));
    }
    serde_json::from_str(body)
        .map_err(|e| PortError::Producer(format!("Schema parsing error: {}", e)))
}

const SINGLE_WORD_PROMPT: &str = "You are a language learning flash card app.
Create a stable diffusion prompt to generate an image of the foreign language word.
Make it as realistic and accurate to the word's meaning as possible.
The illustration must convey the word's meaning to the student.
humans must be shown as anthropomorphized animals.
Do not add text. It will give away the answer!";

const SENTENCE_PROMPT: &str = "You are a language learning flash card app.
You are creating a comic to help users remember the flashcard above.
It is a fun, single-frame comic that illustrates the sentence.
Create a stable diffusion prompt to create this comic for the card above.
Do not add speech bubbles or text. It will give away the answer!
All characters must be Koalas.";

/// Asks the model for an image-generation prompt illustrating a flash card.
/// Single words get a realistic illustration, longer terms a one-frame comic.
pub async fn create_image_prompt(
    client: &dyn TextGenerationClient,
    term: &str,
    definition: &str,
) -> PortResult<String> {
    let system = if term.split(' ').count() < 2 {
        SINGLE_WORD_PROMPT
    } else {
        SENTENCE_PROMPT
    };

    let request = TextGenerationRequest::new(vec![ChatMessage::user(format!(
        "TERM: {}\nDEFINITION: {}",
        term, definition
    ))])
    .with_system(system)
    .with_max_tokens(128)
    .with_temperature(1.0);

    let generation = client.generate(&request).await?;
    let prompt = generation.text.trim();
    if prompt.is_empty() {
        return Err(PortError::Producer("No image prompt generated.".to_string()));
    }
    Ok(prompt.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedTextClient;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Card {
        term: String,
        definition: String,
    }

    #[test]
    fn fenced_json_is_accepted() {
        let card: Card =
            parse_json_reply("```json\n{\"term\":\"개\",\"definition\":\"dog\"}\n```").unwrap();
        assert_eq!(card.term, "개");
    }

    #[test]
    fn invalid_json_is_a_producer_error() {
        let err = parse_json_reply::<Card>("sure! here you go").unwrap_err();
        assert!(matches!(err, PortError::Producer(_)));
        let err = parse_json_reply::<Card>("   ").unwrap_err();
        assert!(matches!(err, PortError::Producer(_)));
    }

    #[tokio::test]
    async fn structured_request_carries_the_schema() {
        let client = ScriptedTextClient::new([r#"{"term":"a","definition":"b"}"#]);
        let schema = serde_json::json!({"type": "object"});

        let card: Card = generate_structured(
            &client,
            TextGenerationRequest::new(vec![ChatMessage::user("give me a card")]),
            schema.clone(),
        )
        .await
        .unwrap();

        assert_eq!(card, Card { term: "a".into(), definition: "b".into() });
        assert_eq!(client.requests()[0].response_schema, Some(schema));
    }

    #[tokio::test]
    async fn image_prompt_style_depends_on_term_length() {
        let client = ScriptedTextClient::new(["a koala holding an apple", "a comic"]);

        create_image_prompt(&client, "사과", "apple").await.unwrap();
        create_image_prompt(&client, "사과를 먹어요", "I eat an apple").await.unwrap();

        let requests = client.requests();
        assert_eq!(requests[0].system.as_deref(), Some(SINGLE_WORD_PROMPT));
        assert_eq!(requests[1].system.as_deref(), Some(SENTENCE_PROMPT));
        assert_eq!(requests[0].max_tokens, 128);
        assert_eq!(requests[0].messages[0].content, "TERM: 사과\nDEFINITION: apple");
    }

    #[tokio::test]
    async fn blank_image_prompt_is_rejected() {
        let client = ScriptedTextClient::new(["  "]);
        let err = create_image_prompt(&client, "dog", "개").await.unwrap_err();
        assert!(matches!(err, PortError::Producer(_)));
    }
}
