use serde::{Deserialize, Serialize};

use crate::error::AppError;

const MAX_PROMPT_CHARS: usize = 2000;
const MAX_TEXT_CHARS: usize = 10_000;
const MAX_INSTRUCTION_CHARS: usize = 1000;
const MIN_CFG_SCALE: f32 = 1.1;
const MAX_CFG_SCALE: f32 = 10.0;

/// Request body for image generation.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct ImageRequest {
    /// What to draw.
    #[schema(example = "A lighthouse at dawn over a calm sea")]
    pub prompt: String,
    /// Free-form style descriptor. Default: `photographic`.
    #[schema(example = "watercolor")]
    pub style: Option<String>,
    /// Prompt adherence for providers that support it (1.1-10.0).
    #[schema(example = 8.0)]
    pub cfg_scale: Option<f32>,
}

pub fn validate_image_request(payload: &ImageRequest) -> Result<(), AppError> {
    if payload.prompt.chars().count() > MAX_PROMPT_CHARS {
        return Err(AppError::Validation(format!(
            "Prompt must be at most {MAX_PROMPT_CHARS} characters"
        )));
    }
    if let Some(style) = &payload.style
        && style.chars().count() > 64
    {
        return Err(AppError::Validation(
            "Style must be at most 64 characters".into(),
        ));
    }
    if let Some(cfg) = payload.cfg_scale
        && !(MIN_CFG_SCALE..=MAX_CFG_SCALE).contains(&cfg)
    {
        return Err(AppError::Validation(format!(
            "cfg_scale must be between {MIN_CFG_SCALE} and {MAX_CFG_SCALE}"
        )));
    }
    Ok(())
}

/// Generated image, already stored and logged.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ImageResponse {
    /// History entry created for this generation.
    #[schema(example = 12)]
    pub history_id: i32,
    #[schema(example = "img_9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08.png")]
    pub filename: String,
    /// Public path of the stored image.
    #[schema(example = "/images/img_9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08.png")]
    pub image_url: String,
    #[schema(example = "titan-image")]
    pub provider: String,
    /// Provider calls made, including the successful one.
    #[schema(example = 1)]
    pub attempts: u8,
    #[schema(example = 5230)]
    pub latency_ms: u64,
}

/// Request body for text editing.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct TextEditRequest {
    /// Original marketing copy.
    #[schema(example = "Buy our product today")]
    pub text: String,
    /// How to change it.
    #[schema(example = "translate to French")]
    pub instruction: String,
}

pub fn validate_text_edit_request(payload: &TextEditRequest) -> Result<(), AppError> {
    if payload.text.chars().count() > MAX_TEXT_CHARS {
        return Err(AppError::Validation(format!(
            "Text must be at most {MAX_TEXT_CHARS} characters"
        )));
    }
    if payload.instruction.chars().count() > MAX_INSTRUCTION_CHARS {
        return Err(AppError::Validation(format!(
            "Instruction must be at most {MAX_INSTRUCTION_CHARS} characters"
        )));
    }
    Ok(())
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct TextEditResponse {
    #[schema(example = 13)]
    pub history_id: i32,
    /// Edited text.
    #[schema(example = "Achetez notre produit aujourd'hui")]
    pub result: String,
    #[schema(example = "claude-haiku")]
    pub provider: String,
    #[schema(example = 1)]
    pub attempts: u8,
    #[schema(example = 820)]
    pub latency_ms: u64,
}
