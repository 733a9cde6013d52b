use std::time::Duration;

use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::Client as S3Client;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;

const MAX_FILE_NAME_LEN: usize = 120;

/// Presigned-URL access to the materials bucket.
#[derive(Clone)]
pub struct BlobStore {
    client: S3Client,
    bucket: String,
    url_ttl: Duration,
}

impl BlobStore {
    pub fn new(client: S3Client, bucket: String, url_ttl_secs: u64) -> Self {
        Self {
            client,
            bucket,
            url_ttl: Duration::from_secs(url_ttl_secs),
        }
    }

    pub fn url_ttl_secs(&self) -> u64 {
        self.url_ttl.as_secs()
    }

    fn presigning(&self) -> Result<PresigningConfig, AppError> {
        PresigningConfig::expires_in(self.url_ttl)
            .map_err(|e| AppError::Storage(format!("Invalid presign TTL: {e}")))
    }

    /// URL the client PUTs the file body to.
    pub async fn presign_upload(&self, key: &str, content_type: Option<&str>) -> Result<String, AppError> {
        let request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .set_content_type(content_type.map(String::from))
            .presigned(self.presigning()?)
            .await
            .map_err(|e| AppError::Storage(format!("Presigning upload failed: {e}")))?;
        Ok(request.uri().to_string())
    }

    pub async fn presign_download(&self, key: &str) -> Result<String, AppError> {
        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(self.presigning()?)
            .await
            .map_err(|e| AppError::Storage(format!("Presigning download failed: {e}")))?;
        Ok(request.uri().to_string())
    }

    pub async fn delete(&self, key: &str) -> Result<(), AppError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Delete failed: {e}")))?;
        info!("Deleted s3://{}/{}", self.bucket, key);
        Ok(())
    }
}

/// Every object a tenant uploads lives under this prefix.
pub fn tenant_prefix(admin_id: Uuid) -> String {
    format!("materials/{admin_id}/")
}

pub fn object_key(admin_id: Uuid, file_name: &str) -> String {
    format!(
        "{}{}-{}",
        tenant_prefix(admin_id),
        Uuid::new_v4().simple(),
        sanitize_file_name(file_name)
    )
}

/// Keeps ASCII letters, digits, `.`, `-` and `_`; everything else becomes `_`.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name).trim();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_FILE_NAME_LEN)
        .collect();
    let cleaned = cleaned.trim_start_matches('.').to_string();
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}
