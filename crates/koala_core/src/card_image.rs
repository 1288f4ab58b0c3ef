//! crates/koala_core/src/card_image.rs
//!
//! Flash-card illustrations, cached by term and definition.

use std::sync::Arc;

use crate::cache::MediaCache;
use crate::domain::SignedUrl;
use crate::llm::create_image_prompt;
use crate::ports::{ImageGenerationService, PortResult, TextGenerationClient};

pub const IMAGE_NAMESPACE: &str = "card-images";
pub const IMAGE_EXT: &str = "png";
pub const IMAGE_CONTENT_TYPE: &str = "image/png";

pub struct CardImageService {
    cache: MediaCache,
    text: Arc<dyn TextGenerationClient>,
    images: Arc<dyn ImageGenerationService>,
}

impl CardImageService {
    pub fn new(
        cache: MediaCache,
        text: Arc<dyn TextGenerationClient>,
        images: Arc<dyn ImageGenerationService>,
    ) -> Self {
        Self {
            cache,
            text,
            images,
        }
    }

    /// Returns a signed URL for the card's image. The prompt and the image are
    /// only generated when nothing is stored for this term and definition.
    pub async fn card_image_url(&self, term: &str, definition: &str) -> PortResult<SignedUrl> {
        self.cache
            .get_or_create(
                IMAGE_NAMESPACE,
                &[term, definition],
                IMAGE_EXT,
                IMAGE_CONTENT_TYPE,
                move || async move {
                    let prompt = create_image_prompt(self.text.as_ref(), term, definition).await?;
                    self.images.generate(&prompt).await
                },
            )
            .await
    }

    /// Signs a previously stored image key, if the card has one.
    pub async fn existing_image_url(&self, blob_id: Option<&str>) -> PortResult<Option<SignedUrl>> {
        match blob_id {
            Some(key) => self.cache.store().sign(key).await.map(Some),
            None => Ok(None),
        }
    }
}
