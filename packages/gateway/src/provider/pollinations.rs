use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use tracing::warn;

use super::{
    IMAGE_SIZE, ImageProvider, enrich_image_prompt, random_seed, retry_after_header,
    truncate_for_log,
};
use crate::config::PollinationsConfig;
use crate::error::{GatewayError, ProviderFailure};
use crate::request::ImageStyle;

/// Pollinations.ai open image endpoint. The prompt travels in the URL path.
pub struct PollinationsOpen {
    http: reqwest::Client,
    base_url: reqwest::Url,
    model: String,
    max_image_bytes: u64,
}

impl PollinationsOpen {
    pub fn new(config: &PollinationsConfig, http: reqwest::Client) -> Result<Self, GatewayError> {
        let base_url = reqwest::Url::parse(config.base_url.trim_end_matches('/')).map_err(|e| {
            GatewayError::Config(format!(
                "invalid Pollinations URL '{}': {e}",
                config.base_url
            ))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(GatewayError::Config(format!(
                "Pollinations URL '{}' cannot carry a path",
                config.base_url
            )));
        }
        Ok(Self {
            http,
            base_url,
            model: config.model.clone(),
            max_image_bytes: config.max_image_bytes,
        })
    }

    fn request_url(&self, prompt: &str, seed: u32) -> reqwest::Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("prompt").push(prompt);
        }
        let size = IMAGE_SIZE.to_string();
        url.query_pairs_mut()
            .append_pair("width", &size)
            .append_pair("height", &size)
            .append_pair("seed", &seed.to_string())
            .append_pair("model", &self.model)
            .append_pair("nologo", "true");
        url
    }
}

#[async_trait]
impl ImageProvider for PollinationsOpen {
    fn name(&self) -> &'static str {
        "pollinations"
    }

    async fn generate_image(
        &self,
        prompt: &str,
        style: &ImageStyle,
    ) -> Result<Vec<u8>, ProviderFailure> {
        let url = self.request_url(&enrich_image_prompt(prompt, style), random_seed());
        let response = self.http.get(url).send().await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderFailure::RateLimited {
                retry_after: retry_after_header(response.headers()),
            });
        }
        if status.is_server_error() {
            return Err(ProviderFailure::Transport(format!(
                "Pollinations answered {status}"
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderFailure::Rejected {
                status: status.as_u16(),
                message: truncate_for_log(&body).to_string(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !content_type.starts_with("image/") {
            let body = response.text().await.unwrap_or_default();
            warn!(
                content_type,
                body = truncate_for_log(&body),
                "Pollinations returned a non-image body"
            );
            return Err(ProviderFailure::Protocol(format!(
                "expected an image, got '{content_type}'"
            )));
        }

        read_capped(response, self.max_image_bytes).await
    }
}

/// Read the body, giving up as soon as it exceeds `limit` bytes.
async fn read_capped(
    mut response: reqwest::Response,
    limit: u64,
) -> Result<Vec<u8>, ProviderFailure> {
    let too_large = |size: u64| {
        ProviderFailure::Protocol(format!(
            "image of {size} bytes exceeds the {limit} byte limit"
        ))
    };
    if let Some(declared) = response.content_length()
        && declared > limit
    {
        return Err(too_large(declared));
    }

    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        body.extend_from_slice(&chunk);
        if body.len() as u64 > limit {
            return Err(too_large(body.len() as u64));
        }
    }
    Ok(body)
}
