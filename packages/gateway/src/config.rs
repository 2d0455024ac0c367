use serde::Deserialize;

use crate::moderation::EmptyInputPolicy;

/// Image backend used by the gateway.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ImageProviderKind {
    /// Amazon Titan Image Generator on Bedrock.
    TitanImage,
    /// Stability SDXL on Bedrock.
    StableDiffusion,
    /// Pollinations.ai open image endpoint. No credentials.
    PollinationsOpen,
}

/// Text backend used by the gateway.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TextProviderKind {
    /// Anthropic Claude Haiku on Bedrock.
    ClaudeHaiku,
    /// Amazon Titan Text Express on Bedrock.
    TitanTextExpress,
    /// Google Gemini Flash via the Generative Language API.
    GeminiFlash,
}

/// AWS Bedrock settings shared by all Bedrock-hosted providers.
#[derive(Debug, Deserialize, Clone)]
pub struct AwsConfig {
    /// Default: "us-east-1".
    #[serde(default = "default_aws_region")]
    pub region: String,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,
    /// Overrides `https://bedrock-runtime.{region}.amazonaws.com`.
    pub endpoint: Option<String>,
    #[serde(default = "default_titan_image_model")]
    pub titan_image_model: String,
    #[serde(default = "default_stable_diffusion_model")]
    pub stable_diffusion_model: String,
    #[serde(default = "default_claude_model")]
    pub claude_model: String,
    #[serde(default = "default_titan_text_model")]
    pub titan_text_model: String,
}

fn default_aws_region() -> String {
    "us-east-1".into()
}
fn default_titan_image_model() -> String {
    "amazon.titan-image-generator-v1".into()
}
fn default_stable_diffusion_model() -> String {
    "stability.stable-diffusion-xl-v1".into()
}
fn default_claude_model() -> String {
    "anthropic.claude-3-haiku-20240307-v1:0".into()
}
fn default_titan_text_model() -> String {
    "amazon.titan-text-express-v1".into()
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            region: default_aws_region(),
            access_key_id: None,
            secret_access_key: None,
            session_token: None,
            endpoint: None,
            titan_image_model: default_titan_image_model(),
            stable_diffusion_model: default_stable_diffusion_model(),
            claude_model: default_claude_model(),
            titan_text_model: default_titan_text_model(),
        }
    }
}

impl AwsConfig {
    /// Base URL of the Bedrock runtime API.
    pub fn endpoint_url(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => format!("https://bedrock-runtime.{}.amazonaws.com", self.region),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    /// Default: "gemini-2.0-flash".
    #[serde(default = "default_gemini_model")]
    pub model: String,
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,
}

fn default_gemini_model() -> String {
    "gemini-2.0-flash".into()
}
fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com".into()
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_gemini_model(),
            base_url: default_gemini_base_url(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PollinationsConfig {
    #[serde(default = "default_pollinations_base_url")]
    pub base_url: String,
    /// Default: "flux".
    #[serde(default = "default_pollinations_model")]
    pub model: String,
    /// Larger responses are refused without reading the rest. Default: 20 MiB.
    #[serde(default = "default_pollinations_max_image_bytes")]
    pub max_image_bytes: u64,
}

fn default_pollinations_base_url() -> String {
    "https://image.pollinations.ai".into()
}
fn default_pollinations_model() -> String {
    "flux".into()
}
fn default_pollinations_max_image_bytes() -> u64 {
    20 * 1024 * 1024
}

impl Default for PollinationsConfig {
    fn default() -> Self {
        Self {
            base_url: default_pollinations_base_url(),
            model: default_pollinations_model(),
            max_image_bytes: default_pollinations_max_image_bytes(),
        }
    }
}

/// Retry policy for throttled provider calls.
#[derive(Debug, Deserialize, Clone)]
pub struct RetryConfig {
    /// Total attempts including the first one. Default: 3.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u8,
    /// Delay before the second attempt. Default: 2000.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Upper bound for any single wait. Default: 30000.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_max_attempts() -> u8 {
    3
}
fn default_base_delay_ms() -> u64 {
    2_000
}
fn default_max_delay_ms() -> u64 {
    30_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ModerationConfig {
    #[serde(default)]
    pub empty_input: EmptyInputPolicy,
    /// Appended to the built-in banned terms.
    #[serde(default)]
    pub extra_terms: Vec<String>,
}

/// Everything needed to construct a [`crate::ContentGateway`].
#[derive(Debug, Deserialize, Clone)]
pub struct GatewayConfig {
    #[serde(default = "default_image_provider")]
    pub image_provider: ImageProviderKind,
    #[serde(default = "default_text_provider")]
    pub text_provider: TextProviderKind,
    /// Per-call transport timeout. Default: 30.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub aws: AwsConfig,
    #[serde(default)]
    pub gemini: GeminiConfig,
    #[serde(default)]
    pub pollinations: PollinationsConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub moderation: ModerationConfig,
}

fn default_image_provider() -> ImageProviderKind {
    ImageProviderKind::TitanImage
}
fn default_text_provider() -> TextProviderKind {
    TextProviderKind::ClaudeHaiku
}
fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            image_provider: default_image_provider(),
            text_provider: default_text_provider(),
            request_timeout_secs: default_request_timeout_secs(),
            aws: AwsConfig::default(),
            gemini: GeminiConfig::default(),
            pollinations: PollinationsConfig::default(),
            retry: RetryConfig::default(),
            moderation: ModerationConfig::default(),
        }
    }
}
