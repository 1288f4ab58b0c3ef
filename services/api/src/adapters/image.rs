//! services/api/src/adapters/image.rs
//!
//! This module contains the adapter for Stable Diffusion XL on Amazon Bedrock.
//! It implements the `ImageGenerationService` port from the `core` crate.

use async_trait::async_trait;
use aws_sdk_bedrockruntime::primitives::Blob;
use aws_sdk_bedrockruntime::Client;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use koala_core::ports::{ImageGenerationService, PortError, PortResult};
use serde::{Deserialize, Serialize};

const NEGATIVE_PROMPT: &str =
    "blurry, bad, text, watermark, signature, deformed, ugly, low quality";

//=========================================================================================
// Stable Diffusion Wire Types
//=========================================================================================

#[derive(Serialize, Debug)]
struct WeightedPrompt<'a> {
    text: &'a str,
    weight: f32,
}

#[derive(Serialize, Debug)]
struct StableDiffusionParams<'a> {
    text_prompts: Vec<WeightedPrompt<'a>>,
    height: u32,
    width: u32,
    cfg_scale: u32,
    clip_guidance_preset: &'static str,
    sampler: &'static str,
    samples: u32,
    steps: u32,
    style_preset: &'static str,
}

#[derive(Deserialize, Debug)]
struct Artifact {
    base64: String,
}

#[derive(Deserialize, Debug)]
struct StableDiffusionResponse {
    #[serde(default)]
    artifacts: Vec<Artifact>,
}

/// The fixed style used for every flash-card illustration.
fn build_params(prompt: &str) -> StableDiffusionParams<'_> {
    StableDiffusionParams {
        text_prompts: vec![
            WeightedPrompt {
                text: prompt,
                weight: 1.0,
            },
            WeightedPrompt {
                text: NEGATIVE_PROMPT,
                weight: -1.0,
            },
        ],
        height: 1024,
        width: 1024,
        cfg_scale: 7,
        clip_guidance_preset: "FAST_BLUE",
        sampler: "K_DPM_2_ANCESTRAL",
        samples: 1,
        steps: 50,
        style_preset: "photographic",
    }
}

/// Decodes the first returned image; no artifacts is a typed failure.
fn first_artifact(body: &[u8]) -> PortResult<Bytes> {
    let response: StableDiffusionResponse = serde_json::from_slice(body)
        .map_err(|e| PortError::Producer(format!("Unreadable image response: {}", e)))?;

    let artifact = response.artifacts.into_iter().next().ok_or_else(|| {
        PortError::EmptyArtifact("No image artifacts returned from Stable Diffusion".to_string())
    })?;

    STANDARD
        .decode(artifact.base64.as_bytes())
        .map(Bytes::from)
        .map_err(|e| PortError::Producer(format!("Image artifact is not valid base64: {}", e)))
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `ImageGenerationService` using Bedrock `InvokeModel`.
#[derive(Clone)]
pub struct BedrockImageAdapter {
    client: Client,
    model_id: String,
}

impl BedrockImageAdapter {
    /// Creates a new `BedrockImageAdapter`.
    pub fn new(client: Client, model_id: String) -> Self {
        Self { client, model_id }
    }
}

#[async_trait]
impl ImageGenerationService for BedrockImageAdapter {
    async fn generate(&self, prompt: &str) -> PortResult<Bytes> {
        let body = serde_json::to_vec(&build_params(prompt))
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
                    "Failed to generate image: {}",
                    aws_sdk_bedrockruntime::error::DisplayErrorContext(&e)
                ))
            })?;

        first_artifact(output.body().as_ref())
    }
}
