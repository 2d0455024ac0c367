use async_trait::async_trait;
use serde_json::{Value, json};

use super::{
    BedrockRuntime, IMAGE_SIZE, ImageProvider, TextProvider, decode_base64_image, editor_prompt,
    enrich_image_prompt, random_seed,
};
use crate::error::ProviderFailure;
use crate::request::ImageStyle;

const DEFAULT_CFG_SCALE: f32 = 8.0;
const MAX_TOKEN_COUNT: u32 = 1000;

/// Amazon Titan Image Generator on Bedrock.
pub struct TitanImage {
    runtime: BedrockRuntime,
    model_id: String,
}

impl TitanImage {
    pub fn new(runtime: BedrockRuntime, model_id: impl Into<String>) -> Self {
        Self {
            runtime,
            model_id: model_id.into(),
        }
    }
}

fn image_request(prompt: &str, style: &ImageStyle, seed: u32) -> Value {
    json!({
        "taskType": "TEXT_IMAGE",
        "textToImageParams": {
            "text": enrich_image_prompt(prompt, style),
        },
        "imageGenerationConfig": {
            "numberOfImages": 1,
            "height": IMAGE_SIZE,
            "width": IMAGE_SIZE,
            "cfgScale": style.cfg_scale.unwrap_or(DEFAULT_CFG_SCALE),
            "seed": seed,
        }
    })
}

fn image_from_response(response: &Value) -> Result<Vec<u8>, ProviderFailure> {
    if let Some(error) = response.get("error").and_then(Value::as_str) {
        return Err(ProviderFailure::Rejected {
            status: 200,
            message: error.to_string(),
        });
    }
    let encoded = response
        .get("images")
        .and_then(|images| images.get(0))
        .and_then(Value::as_str)
        .ok_or_else(|| ProviderFailure::Protocol("response has no images[0]".into()))?;
    decode_base64_image(encoded)
}

#[async_trait]
impl ImageProvider for TitanImage {
    fn name(&self) -> &'static str {
        "titan-image"
    }

    async fn generate_image(
        &self,
        prompt: &str,
        style: &ImageStyle,
    ) -> Result<Vec<u8>, ProviderFailure> {
        let body = image_request(prompt, style, random_seed());
        let response = self.runtime.invoke_model(&self.model_id, &body).await?;
        image_from_response(&response)
    }
}

/// Amazon Titan Text Express on Bedrock.
pub struct TitanTextExpress {
    runtime: BedrockRuntime,
    model_id: String,
}

impl TitanTextExpress {
    pub fn new(runtime: BedrockRuntime, model_id: impl Into<String>) -> Self {
        Self {
            runtime,
            model_id: model_id.into(),
        }
    }
}

fn text_request(original: &str, instruction: &str) -> Value {
    json!({
        "inputText": editor_prompt(original, instruction),
        "textGenerationConfig": {
            "maxTokenCount": MAX_TOKEN_COUNT,
            "temperature": 0.5,
            "topP": 0.9,
        }
    })
}

fn text_from_response(response: &Value) -> Result<String, ProviderFailure> {
    let result = response
        .get("results")
        .and_then(|results| results.get(0))
        .ok_or_else(|| ProviderFailure::Protocol("response has no results[0]".into()))?;

    if result.get("completionReason").and_then(Value::as_str) == Some("CONTENT_FILTERED") {
        return Err(ProviderFailure::Rejected {
            status: 200,
            message: "The provider's content filter blocked the response".into(),
        });
    }

    result
        .get("outputText")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ProviderFailure::Protocol("result has no outputText".into()))
}

#[async_trait]
impl TextProvider for TitanTextExpress {
    fn name(&self) -> &'static str {
        "titan-text-express"
    }

    async fn edit_text(
        &self,
        original: &str,
        instruction: &str,
    ) -> Result<String, ProviderFailure> {
        let body = text_request(original, instruction);
        let response = self.runtime.invoke_model(&self.model_id, &body).await?;
        text_from_response(&response)
    }
}
