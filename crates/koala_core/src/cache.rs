//! crates/koala_core/src/cache.rs
//!
//! The "get or create" flow shared by every generated media type:
//! derive a content address, probe the blob store, and only produce and
//! upload the artifact when it is not already stored.

use bytes::Bytes;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::content_address::derive_key;
use crate::domain::SignedUrl;
use crate::ports::{BlobStore, PortResult};

/// Checks whether `key` is stored and signs it if so.
///
/// Any failure, including transient network errors, is reported as a miss so the
/// caller regenerates the artifact instead of failing the request.
pub async fn probe(store: &dyn BlobStore, key: &str) -> Option<SignedUrl> {
    match store.exists(key).await {
        Ok(true) => match store.sign(key).await {
            Ok(url) => Some(url),
            Err(e) => {
                warn!(key, error = %e, "Signing an existing artifact failed; treating as a miss");
                None
            }
        },
        Ok(false) => None,
        Err(e) => {
            warn!(key, error = %e, "Existence check failed; treating as a miss");
            None
        }
    }
}

/// Content-addressed cache of generated artifacts in a [`BlobStore`].
#[derive(Clone)]
pub struct MediaCache {
    store: Arc<dyn BlobStore>,
}

impl MediaCache {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn BlobStore> {
        &self.store
    }

    /// Returns a signed URL for the artifact identified by `key_fields`, running
    /// `producer` and uploading its output only on a cache miss.
    ///
    /// Producer and upload errors are returned as-is; nothing is retried and a
    /// failed upload is not cleaned up.
    pub async fn get_or_create<S, F, Fut>(
        &self,
        namespace: &str,
        key_fields: &[S],
        ext: &str,
        content_type: &str,
        producer: F,
    ) -> PortResult<SignedUrl>
    where
        S: AsRef<str>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = PortResult<Bytes>>,
    {
        let key = derive_key(namespace, key_fields, ext);
        debug!(%key, "Derived cache key");

        if let Some(url) = probe(self.store.as_ref(), &key).await {
            info!(%key, "Cache hit");
            return Ok(url);
        }

        info!(%key, "Cache miss; producing artifact");
        let bytes = producer().await?;
        debug!(%key, size = bytes.len(), "Artifact produced; uploading");

        self.store.put(&key, bytes, content_type).await
    }
}
