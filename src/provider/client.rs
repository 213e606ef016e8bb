use super::ImageProvider;
use crate::models::{Config, ImageSize, UpstreamEnvelope, UpstreamImageRequest};
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response};

pub struct CloudflareClient {
    client: Client,
    api_token: String,
    run_url: String,
    image_size: ImageSize,
}

impl CloudflareClient {
    /// Builds a client honoring `config.upstream_timeout`; without one the
    /// transport default applies.
    pub fn new(config: &Config) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.upstream_timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self::new_with_client(config, builder.build()?))
    }

    pub fn new_with_client(config: &Config, client: Client) -> Self {
        Self {
            client,
            api_token: config.api_token.clone(),
            run_url: config.run_url(),
            image_size: config.image_size,
        }
    }
}

#[async_trait]
impl ImageProvider for CloudflareClient {
    async fn generate_image(&self, prompt: &str, model: &str) -> Result<Vec<u8>> {
        tracing::debug!("Sending image generation request to Cloudflare (model: {})", model);

        let request = UpstreamImageRequest::new(prompt, self.image_size);
        let url = format!("{}/{}", self.run_url, model);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_token)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send request to Cloudflare: {}", e);
                // The URL embeds the account id.
                Error::Http(e.without_url())
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(
                "Cloudflare API error (status {}, model {}): {}",
                status,
                model,
                error_text
            );
            return Err(Error::Upstream {
                status: status.as_u16(),
                message: format!("Cloudflare API error: {}", status.as_u16()),
            });
        }

        read_image_body(response).await
    }
}

/// Buffers a successful image response from the provider.
///
/// Raw bytes are passed through untouched. A JSON body is treated as the
/// Workers AI envelope and its base64 `result.image` is decoded.
pub(crate) async fn read_image_body(response: Response) -> Result<Vec<u8>> {
    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"));

    if !is_json {
        return read_raw_image_body(response).await;
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| Error::Http(e.without_url()))?;
    non_empty(decode_envelope(&body)?)
}

/// Buffers a successful image response verbatim, whatever its content type.
pub(crate) async fn read_raw_image_body(response: Response) -> Result<Vec<u8>> {
    let body = response
        .bytes()
        .await
        .map_err(|e| Error::Http(e.without_url()))?;
    non_empty(body.to_vec())
}

fn non_empty(image: Vec<u8>) -> Result<Vec<u8>> {
    if image.is_empty() {
        return Err(Error::Internal(
            "Upstream returned an empty image body".to_string(),
        ));
    }
    Ok(image)
}

fn decode_envelope(body: &[u8]) -> Result<Vec<u8>> {
    let envelope: UpstreamEnvelope = serde_json::from_slice(body).map_err(|e| {
        tracing::error!("Failed to parse upstream response: {}", e);
        Error::Internal(format!("Malformed upstream response: {}", e))
    })?;

    if envelope.success == Some(false) {
        return Err(Error::Internal(
            "Upstream reported an unsuccessful run".to_string(),
        ));
    }

    let b64 = envelope
        .result
        .and_then(|r| r.image)
        .ok_or_else(|| Error::Internal("No image data in upstream response".to_string()))?;

    use base64::Engine as _;
    base64::engine::general_purpose::STANDARD
        .decode(b64)
        .map_err(|e| Error::Internal(format!("Failed to decode base64 image: {}", e)))
}
