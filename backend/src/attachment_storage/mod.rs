//! S3-based attachment storage operations
mod error;

use std::sync::Arc;
use std::time::Duration;

use aws_sdk_s3::{presigning::PresigningConfig, Client as S3Client};
use chrono::{DateTime, Utc};

pub use error::{BucketError, BucketResult};

/// Presigned URL with expiration information
#[derive(Debug, Clone)]
pub struct PresignedUrl {
    /// The presigned URL for PUT operations
    pub url: String,
    /// UTC timestamp when the URL expires
    pub expires_at: DateTime<Utc>,
}

/// Attachment storage client for S3 operations
pub struct AttachmentStorage {
    s3_client: Arc<S3Client>,
    bucket_name: String,
    presigned_url_expiry_secs: u64,
}

impl AttachmentStorage {
    /// Creates a new attachment storage client
    ///
    /// # Arguments
    ///
    /// * `s3_client` - Pre-configured S3 client
    /// * `bucket_name` - S3 bucket name for attachments
    /// * `presigned_url_expiry_secs` - Lifetime of presigned upload URLs in seconds
    #[must_use]
    pub const fn new(
        s3_client: Arc<S3Client>,
        bucket_name: String,
        presigned_url_expiry_secs: u64,
    ) -> Self {
        Self {
            s3_client,
            bucket_name,
            presigned_url_expiry_secs,
        }
    }

    /// Public URL the attachment is served from once uploaded
    #[must_use]
    pub fn attachment_url(&self, attachment_id: &str) -> String {
        format!(
            "https://{}.s3.amazonaws.com/{attachment_id}",
            self.bucket_name
        )
    }

    /// Generates a presigned URL for uploading the attachment object
    ///
    /// The object key is the attachment ID itself.
    ///
    /// # Errors
    ///
    /// Returns `BucketError::ConfigError` if presigning config creation fails
    /// Returns `BucketError::S3Error` if presigned URL generation fails
    pub async fn generate_presigned_put_url(
        &self,
        attachment_id: &str,
    ) -> BucketResult<PresignedUrl> {
        let expires_in = Duration::from_secs(self.presigned_url_expiry_secs);

        let presigned_config = PresigningConfig::expires_in(expires_in).map_err(|e| {
            BucketError::ConfigError(format!("Failed to create presigning config: {e}"))
        })?;

        let presigned_request = self
            .s3_client
            .put_object()
            .bucket(&self.bucket_name)
            .key(attachment_id)
            .presigned(presigned_config)
            .await
            .map_err(|e| BucketError::S3Error(format!("Failed to generate presigned URL: {e}")))?;

        let expires_at: DateTime<Utc> = Utc::now() + expires_in;

        Ok(PresignedUrl {
            url: presigned_request.uri().to_string(),
            expires_at,
        })
    }
}
