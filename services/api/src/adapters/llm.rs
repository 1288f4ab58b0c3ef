//! services/api/src/adapters/llm.rs
//!
//! This module contains the adapter for Anthropic models hosted on Amazon Bedrock.
//! It implements the `TextGenerationClient` port from the `core` crate, and is the
//! only place the Messages API request/response shapes are known.

use async_trait::async_trait;
use aws_sdk_bedrockruntime::primitives::Blob;
use aws_sdk_bedrockruntime::Client;
use koala_core::domain::{Role, TextGeneration, TextGenerationRequest, TokenUsage};
use koala_core::ports::{PortError, PortResult, TextGenerationClient};
use serde::{Deserialize, Serialize};
use tracing::debug;

const ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";
const JSON_ONLY_INSTRUCTION: &str =
    "Respond with a single JSON object and nothing else. It must conform to this JSON schema:";

//=========================================================================================
// Messages API Wire Types
//=========================================================================================

#[derive(Serialize, Debug, PartialEq)]
struct ClaudeMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize, Debug)]
struct ClaudeParams<'a> {
    anthropic_version: &'static str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<ClaudeMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ClaudeContent {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize, Debug)]
struct ClaudeUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Deserialize, Debug)]
struct ClaudeResponse {
    content: Vec<ClaudeContent>,
    usage: ClaudeUsage,
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `TextGenerationClient` using Bedrock `InvokeModel`.
#[derive(Clone)]
pub struct BedrockTextAdapter {
    client: Client,
    model_id: String,
}

impl BedrockTextAdapter {
    /// Creates a new `BedrockTextAdapter`.
    pub fn new(client: Client, model_id: String) -> Self {
        Self { client, model_id }
    }
}

/// Builds the request body. The Messages API only accepts user and assistant turns,
/// so system messages are folded into the top-level `system` prompt, followed by
/// the schema instruction when structured output is requested.
fn build_params(request: &TextGenerationRequest) -> ClaudeParams<'_> {
    let mut system_parts: Vec<String> = request.system.iter().cloned().collect();
    let mut messages = Vec::with_capacity(request.messages.len());

    for message in &request.messages {
        match message.role {
            Role::System => system_parts.push(message.content.clone()),
            Role::User => messages.push(ClaudeMessage {
                role: "user",
                content: &message.content,
            }),
            Role::Assistant => messages.push(ClaudeMessage {
                role: "assistant",
                content: &message.content,
            }),
        }
    }

    if let Some(schema) = &request.response_schema {
        system_parts.push(format!("{}\n{}", JSON_ONLY_INSTRUCTION, schema));
    }

    ClaudeParams {
        anthropic_version: ANTHROPIC_VERSION,
        max_tokens: request.max_tokens,
        temperature: request.temperature,
        messages,
        system: if system_parts.is_empty() {
            None
        } else {
            Some(system_parts.join("\n\n"))
        },
    }
}

fn parse_response(body: &[u8]) -> PortResult<TextGeneration> {
    let response: ClaudeResponse = serde_json::from_slice(body)
        .map_err(|e| PortError::Producer(format!("Unreadable Bedrock response: {}", e)))?;

    let text = response
        .content
        .into_iter()
        .next()
        .map(|c| c.text)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| PortError::Producer("No content in response".to_string()))?;

    Ok(TextGeneration {
        text,
        usage: TokenUsage {
            input_tokens: response.usage.input_tokens,
            output_tokens: response.usage.output_tokens,
        },
    })
}

//=========================================================================================
// `TextGenerationClient` Trait Implementation
//=========================================================================================

#[async_trait]
impl TextGenerationClient for BedrockTextAdapter {
    async fn generate(&self, request: &TextGenerationRequest) -> PortResult<TextGeneration> {
        let body = serde_json::to_vec(&build_params(request))
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let output = self
            .client
            .invoke_model()
            .model_id(&self.model_id)
            .content_type("application/json")
            .accept("application/json")
            .body(Blob::new(body))
            .send()
            .await
            .map_err(|e| {
                PortError::Producer(format!(
                    "Bedrock API Error: {}",
                    aws_sdk_bedrockruntime::error::DisplayErrorContext(&e)
                ))
            })?;

        let generation = parse_response(output.body().as_ref())?;
        debug!(
            model = %self.model_id,
            total_tokens = generation.usage.total(),
            "Text generation complete"
        );
        Ok(generation)
    }
}
