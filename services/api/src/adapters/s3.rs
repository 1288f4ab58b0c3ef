//! services/api/src/adapters/s3.rs
//!
//! This module contains the blob store adapter backed by Amazon S3.
//! It implements the `BlobStore` port from the `core` crate.

use async_trait::async_trait;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::operation::head_object::HeadObjectError;
use aws_sdk_s3::Client;
use bytes::Bytes;
use koala_core::domain::SignedUrl;
use koala_core::ports::{BlobStore, PortError, PortResult};
use std::fmt;
use std::time::Duration;
use tracing::debug;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `BlobStore` port on a single S3 bucket.
#[derive(Clone)]
pub struct S3BlobStore {
    client: Client,
    bucket: String,
    url_expiration: Duration,
}

impl S3BlobStore {
    /// Creates a new `S3BlobStore`. Every signed URL it issues expires after `url_expiration`.
    pub fn new(client: Client, bucket: String, url_expiration: Duration) -> Self {
        Self {
            client,
            bucket,
            url_expiration,
        }
    }
}

/// Classifies a failed `HeadObject`: a modeled 404 means the object is absent,
/// anything else (throttling, auth, dispatch failures) is a storage error.
fn head_object_failure(
    key: &str,
    service_error: Option<&HeadObjectError>,
    detail: impl fmt::Display,
) -> PortResult<bool> {
    if service_error.is_some_and(HeadObjectError::is_not_found) {
        Ok(false)
    } else {
        Err(PortError::Storage(format!("HeadObject {} failed: {}", key, detail)))
    }
}

//=========================================================================================
// `BlobStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl BlobStore for S3BlobStore {
    /// Issues a `HeadObject`; a 404 means the object is absent.
    async fn exists(&self, key: &str) -> PortResult<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => head_object_failure(
                key,
                e.as_service_error(),
                aws_sdk_s3::error::DisplayErrorContext(&e),
            ),
        }
    }

    async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> PortResult<SignedUrl> {
        let size = bytes.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| {
                PortError::Storage(format!(
                    "Failed to upload {}: {}",
                    key,
                    aws_sdk_s3::error::DisplayErrorContext(&e)
                ))
            })?;
        debug!(key, size, "Uploaded object to S3");

        self.sign(key).await
    }

    async fn sign(&self, key: &str) -> PortResult<SignedUrl> {
        let presigning = PresigningConfig::expires_in(self.url_expiration)
            .map_err(|e| PortError::Storage(format!("Invalid URL expiration: {}", e)))?;

        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| {
                PortError::Storage(format!(
                    "Failed to generate signed URL for {}: {}",
                    key,
                    aws_sdk_s3::error::DisplayErrorContext(&e)
                ))
            })?;

        Ok(SignedUrl(request.uri().to_string()))
    }

    fn media_uri(&self, key: &str) -> String {
        format!("s3://{}/{}", self.bucket, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_s3::error::ErrorMetadata;
    use aws_sdk_s3::types::error::NotFound;

    #[test]
    fn missing_object_is_absent_not_an_error() {
        let not_found = HeadObjectError::NotFound(NotFound::builder().build());
        let outcome = head_object_failure("lesson-audio/v1a.mp3", Some(&not_found), "404");
        assert!(matches!(outcome, Ok(false)));
    }

    #[test]
    fn other_service_errors_are_storage_errors() {
        let denied =
            HeadObjectError::generic(ErrorMetadata::builder().code("AccessDenied").build());
        let outcome = head_object_failure("lesson-audio/v1a.mp3", Some(&denied), "403");
        match outcome {
            Err(PortError::Storage(message)) => {
                assert!(message.contains("lesson-audio/v1a.mp3"));
                assert!(message.contains("403"));
            }
            other => panic!("expected a storage error, got {:?}", other),
        }
    }

    #[test]
    fn transport_failures_are_storage_errors() {
        let outcome = head_object_failure("k", None, "dispatch failure");
        assert!(matches!(outcome, Err(PortError::Storage(_))));
    }
}
