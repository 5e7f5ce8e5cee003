use reqwest::multipart::{Form, Part};
use reqwest::Url;

use crate::config::ClientConfig;
use crate::error::CaptionError;
use crate::intake::SelectedImage;

/// Shown when the service answers 2xx without a usable `caption` field.
pub const FALLBACK_CAPTION: &str = "Caption generated successfully!";

/// Multipart field the captioning service reads the image from.
pub const IMAGE_FIELD: &str = "image";

/// Longest slice of a response body kept in log lines.
const LOGGED_BODY_LIMIT: usize = 500;

#[derive(Debug, Clone)]
pub struct CaptionClient {
    http: reqwest::Client,
    endpoint: Url,
}

impl CaptionClient {
    pub fn new(config: &ClientConfig) -> Result<Self, CaptionError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            endpoint: config.endpoint.clone(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Uploads `image` as a one-field multipart form and returns the caption.
    pub async fn caption(&self, image: &SelectedImage) -> Result<String, CaptionError> {
        let part = Part::bytes(image.bytes().to_vec())
            .file_name(image.name().to_string())
            .mime_str(image.mime())?;
        let form = Form::new().part(IMAGE_FIELD, part);

        tracing::info!(
            endpoint = %self.endpoint,
            file = image.name(),
            bytes = image.size(),
            "📤 sending image to captioning endpoint"
        );

        let response = self
            .http
            .post(self.endpoint.clone())
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        tracing::debug!(%status, body = truncate(&body), "captioning endpoint responded");

        if !status.is_success() {
            if let Some(reason) = service_error(&body) {
                tracing::warn!(%status, reason = %reason, "captioning service reported an error");
            }
            return Err(CaptionError::Status {
                status,
                body: truncate(&body).to_string(),
            });
        }

        let caption = parse_caption(&body)?;
        tracing::info!(caption = %caption, "✅ caption received");
        Ok(caption)
    }
}

/// Reads `caption` from a JSON object body, falling back to
/// [`FALLBACK_CAPTION`] when the field is missing, empty, or not a string.
pub fn parse_caption(body: &str) -> Result<String, CaptionError> {
    let value: serde_json::Value = serde_json::from_str(body)?;
    let object = value.as_object().ok_or(CaptionError::NotAnObject)?;

    Ok(object
        .get("caption")
        .and_then(|c| c.as_str())
        .filter(|c| !c.is_empty())
        .unwrap_or(FALLBACK_CAPTION)
        .to_string())
}

fn service_error(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value["error"].as_str().map(str::to_string)
}

fn truncate(body: &str) -> &str {
    if body.len() <= LOGGED_BODY_LIMIT {
        return body;
    }
    let mut end = LOGGED_BODY_LIMIT;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}
