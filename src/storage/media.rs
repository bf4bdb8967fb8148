//! Media storage via a third-party image host
//!
//! Images are sent as multipart form uploads with an unsigned preset;
//! the host responds with JSON containing a `secure_url` that is what
//! gets persisted into `photo_url` / post `image_url`.

use serde::Deserialize;

use crate::error::AppError;
use crate::metrics::MEDIA_UPLOADS_TOTAL;

/// Successful upload response from the image host
#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
}

/// Media storage service
///
/// Uploads media to the configured image host and returns public URLs.
pub struct MediaStorage {
    client: reqwest::Client,
    /// Upload endpoint, e.g. "https://api.cloudinary.com/v1_1/<cloud>/image/upload"
    upload_url: String,
    /// Unsigned upload preset name
    upload_preset: String,
}

impl MediaStorage {
    /// Create new media storage client
    ///
    /// # Arguments
    /// * `config` - Media upload configuration
    /// * `client` - Shared HTTP client
    pub fn new(config: &crate::config::MediaConfig, client: reqwest::Client) -> Self {
        Self {
            client,
            upload_url: config.upload_url.clone(),
            upload_preset: config.upload_preset.clone(),
        }
    }

    /// Upload an image
    ///
    /// # Arguments
    /// * `file_name` - File name to report in the form data
    /// * `data` - File contents
    /// * `content_type` - MIME type
    ///
    /// # Returns
    /// Public secure URL for the uploaded file
    pub async fn upload(
        &self,
        file_name: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<String, AppError> {
        use reqwest::multipart::{Form, Part};

        if data.is_empty() {
            return Err(AppError::Validation("image data is empty".to_string()));
        }

        let part = Part::bytes(data)
            .file_name(file_name.to_string())
            .mime_str(content_type)
            .map_err(|e| AppError::Storage(format!("invalid content type: {}", e)))?;

        let form = Form::new()
            .part("file", part)
            .text("upload_preset", self.upload_preset.clone());

        let response = self
            .client
            .post(&self.upload_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                MEDIA_UPLOADS_TOTAL.with_label_values(&["error"]).inc();
                AppError::Storage(format!("media upload failed: {}", e))
            })?;

        if !response.status().is_success() {
            MEDIA_UPLOADS_TOTAL.with_label_values(&["error"]).inc();
            return Err(AppError::Storage(format!(
                "media host returned {}",
                response.status()
            )));
        }

        let body: UploadResponse = response.json().await.map_err(|e| {
            MEDIA_UPLOADS_TOTAL.with_label_values(&["error"]).inc();
            AppError::Storage(format!("unexpected media host response: {}", e))
        })?;

        MEDIA_UPLOADS_TOTAL.with_label_values(&["ok"]).inc();
        tracing::debug!(url = %body.secure_url, "Media uploaded");

        Ok(body.secure_url)
    }

    /// Upload a profile photo
    pub async fn upload_profile_photo(
        &self,
        id: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<String, AppError> {
        let file_name = format!("profile-{}.{}", id, extension_for(content_type));
        self.upload(&file_name, data, content_type).await
    }

    /// Upload a post image
    pub async fn upload_post_image(
        &self,
        id: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<String, AppError> {
        let file_name = format!("post-{}.{}", id, extension_for(content_type));
        self.upload(&file_name, data, content_type).await
    }
}

fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "bin",
    }
}
