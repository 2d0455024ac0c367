//! Provider adapters.
//!
//! Each adapter turns a normalized request into one backend's wire format and
//! classifies every failure into a [`ProviderFailure`] before it leaves the
//! adapter. Adapters share one `reqwest::Client` built at startup.

mod bedrock;
mod claude;
mod gemini;
mod pollinations;
mod sigv4;
mod stability;
mod titan;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::ImageFormat;
use rand::Rng;

use crate::config::{GatewayConfig, ImageProviderKind, TextProviderKind};
use crate::error::{GatewayError, ProviderFailure};
use crate::request::ImageStyle;

pub use bedrock::{AwsCredentials, BedrockRuntime};
pub use claude::ClaudeHaiku;
pub use gemini::GeminiFlash;
pub use pollinations::PollinationsOpen;
pub use stability::StableDiffusion;
pub use titan::{TitanImage, TitanTextExpress};

/// Output edge length in pixels for every image backend.
pub const IMAGE_SIZE: u32 = 1024;

/// Bytes of a raw provider body kept in logs.
const LOG_BODY_LIMIT: usize = 512;

#[async_trait]
pub trait ImageProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Generate one image and return its raw bytes.
    async fn generate_image(
        &self,
        prompt: &str,
        style: &ImageStyle,
    ) -> Result<Vec<u8>, ProviderFailure>;
}

#[async_trait]
pub trait TextProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Rewrite `original` according to `instruction`, returning only the new text.
    async fn edit_text(&self, original: &str, instruction: &str)
    -> Result<String, ProviderFailure>;
}

/// Prompt sent to image backends: the user's prompt plus style and quality qualifiers.
pub fn enrich_image_prompt(prompt: &str, style: &ImageStyle) -> String {
    format!(
        "{}. Artistic style: {}, high quality, detailed.",
        prompt.trim(),
        style.preset.trim()
    )
}

/// Single instruction-following prompt used by every text backend.
pub fn editor_prompt(original: &str, instruction: &str) -> String {
    format!(
        "Act as an expert marketing editor. Original text: '{original}'. \
         Instruction: {instruction}. \
         Return only the edited text, with no commentary, quotes or explanations."
    )
}

/// Random seed so repeated prompts do not return identical images.
pub(crate) fn random_seed() -> u32 {
    rand::rng().random_range(0..=2_147_483_646)
}

/// Decode a base64 image field from a JSON response.
pub(crate) fn decode_base64_image(encoded: &str) -> Result<Vec<u8>, ProviderFailure> {
    BASE64
        .decode(encoded.trim())
        .map_err(|e| ProviderFailure::Protocol(format!("image is not valid base64: {e}")))
}

/// Confirm the bytes are an image we can name a file after.
pub fn detect_image_format(bytes: &[u8]) -> Result<ImageFormat, ProviderFailure> {
    if bytes.is_empty() {
        return Err(ProviderFailure::Protocol("provider returned an empty image".into()));
    }
    image::guess_format(bytes)
        .map_err(|e| ProviderFailure::Protocol(format!("unrecognised image data: {e}")))
}

/// Trim provider text and refuse to report an empty edit as success.
pub(crate) fn normalize_text(text: &str) -> Result<String, ProviderFailure> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ProviderFailure::Protocol(
            "provider returned empty text".into(),
        ));
    }
    Ok(trimmed.to_string())
}

/// Shorten a raw body for diagnostics.
pub(crate) fn truncate_for_log(body: &str) -> &str {
    if body.len() <= LOG_BODY_LIMIT {
        return body;
    }
    let mut end = LOG_BODY_LIMIT;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

/// Parse a `Retry-After` header given in seconds.
pub(crate) fn retry_after_header(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Build the shared outbound HTTP client.
pub fn build_http_client(config: &GatewayConfig) -> Result<reqwest::Client, GatewayError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .user_agent(concat!("marketing-portal/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| GatewayError::Config(format!("failed to build HTTP client: {e}")))
}

/// Construct the configured image adapter, failing fast on missing credentials.
pub fn build_image_provider(
    config: &GatewayConfig,
    http: reqwest::Client,
) -> Result<Arc<dyn ImageProvider>, GatewayError> {
    let provider: Arc<dyn ImageProvider> = match config.image_provider {
        ImageProviderKind::TitanImage => Arc::new(TitanImage::new(
            BedrockRuntime::from_config(&config.aws, http)?,
            config.aws.titan_image_model.clone(),
        )),
        ImageProviderKind::StableDiffusion => Arc::new(StableDiffusion::new(
            BedrockRuntime::from_config(&config.aws, http)?,
            config.aws.stable_diffusion_model.clone(),
        )),
        ImageProviderKind::PollinationsOpen => {
            Arc::new(PollinationsOpen::new(&config.pollinations, http)?)
        }
    };
    Ok(provider)
}

/// Construct the configured text adapter, failing fast on missing credentials.
pub fn build_text_provider(
    config: &GatewayConfig,
    http: reqwest::Client,
) -> Result<Arc<dyn TextProvider>, GatewayError> {
    let provider: Arc<dyn TextProvider> = match config.text_provider {
        TextProviderKind::ClaudeHaiku => Arc::new(ClaudeHaiku::new(
            BedrockRuntime::from_config(&config.aws, http)?,
            config.aws.claude_model.clone(),
        )),
        TextProviderKind::TitanTextExpress => Arc::new(TitanTextExpress::new(
            BedrockRuntime::from_config(&config.aws, http)?,
            config.aws.titan_text_model.clone(),
        )),
        TextProviderKind::GeminiFlash => Arc::new(GeminiFlash::new(&config.gemini, http)?),
    };
    Ok(provider)
}
