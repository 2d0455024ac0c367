use async_trait::async_trait;
use serde_json::{Value, json};

use super::{
    BedrockRuntime, IMAGE_SIZE, ImageProvider, decode_base64_image, enrich_image_prompt,
    random_seed,
};
use crate::error::ProviderFailure;
use crate::request::ImageStyle;

const DEFAULT_CFG_SCALE: f32 = 7.0;
const STEPS: u32 = 30;

/// SDXL presets accepted by the `style_preset` field. Anything else only shapes the prompt.
const STYLE_PRESETS: &[&str] = &[
    "3d-model",
    "analog-film",
    "anime",
    "cinematic",
    "comic-book",
    "digital-art",
    "enhance",
    "fantasy-art",
    "isometric",
    "line-art",
    "low-poly",
    "modeling-compound",
    "neon-punk",
    "origami",
    "photographic",
    "pixel-art",
    "tile-texture",
];

/// Stability SDXL on Bedrock.
pub struct StableDiffusion {
    runtime: BedrockRuntime,
    model_id: String,
}

impl StableDiffusion {
    pub fn new(runtime: BedrockRuntime, model_id: impl Into<String>) -> Self {
        Self {
            runtime,
            model_id: model_id.into(),
        }
    }
}

fn request_body(prompt: &str, style: &ImageStyle, seed: u32) -> Value {
    let mut body = json!({
        "text_prompts": [{ "text": enrich_image_prompt(prompt, style), "weight": 1.0 }],
        "cfg_scale": style.cfg_scale.unwrap_or(DEFAULT_CFG_SCALE),
        "seed": seed,
        "steps": STEPS,
        "width": IMAGE_SIZE,
        "height": IMAGE_SIZE,
    });
    let preset = style.preset.trim().to_lowercase();
    if STYLE_PRESETS.contains(&preset.as_str()) {
        body["style_preset"] = Value::String(preset);
    }
    body
}

fn image_from_response(response: &Value) -> Result<Vec<u8>, ProviderFailure> {
    let artifact = response
        .get("artifacts")
        .and_then(|artifacts| artifacts.get(0))
        .ok_or_else(|| ProviderFailure::Protocol("response has no artifacts[0]".into()))?;

    if artifact.get("finishReason").and_then(Value::as_str) == Some("CONTENT_FILTERED") {
        return Err(ProviderFailure::Rejected {
            status: 200,
            message: "The provider's content filter blocked the image".into(),
        });
    }

    let encoded = artifact
        .get("base64")
        .and_then(Value::as_str)
        .ok_or_else(|| ProviderFailure::Protocol("artifact has no base64 field".into()))?;
    decode_base64_image(encoded)
}

#[async_trait]
impl ImageProvider for StableDiffusion {
    fn name(&self) -> &'static str {
        "stable-diffusion"
    }

    async fn generate_image(
        &self,
        prompt: &str,
        style: &ImageStyle,
    ) -> Result<Vec<u8>, ProviderFailure> {
        let body = request_body(prompt, style, random_seed());
        let response = self.runtime.invoke_model(&self.model_id, &body).await?;
        image_from_response(&response)
    }
}
