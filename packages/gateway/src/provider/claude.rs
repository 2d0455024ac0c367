use async_trait::async_trait;
use serde_json::{Value, json};

use super::{BedrockRuntime, TextProvider, editor_prompt};
use crate::error::ProviderFailure;

const ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";
const MAX_TOKENS: u32 = 1000;

/// Anthropic Claude Haiku through the Bedrock messages API.
pub struct ClaudeHaiku {
    runtime: BedrockRuntime,
    model_id: String,
}

impl ClaudeHaiku {
    pub fn new(runtime: BedrockRuntime, model_id: impl Into<String>) -> Self {
        Self {
            runtime,
            model_id: model_id.into(),
        }
    }
}

fn request_body(original: &str, instruction: &str) -> Value {
    json!({
        "anthropic_version": ANTHROPIC_VERSION,
        "max_tokens": MAX_TOKENS,
        "messages": [{
            "role": "user",
            "content": [{ "type": "text", "text": editor_prompt(original, instruction) }],
        }],
    })
}

/// Concatenate the text blocks of a messages response.
fn text_from_response(response: &Value) -> Result<String, ProviderFailure> {
    let blocks = response
        .get("content")
        .and_then(Value::as_array)
        .ok_or_else(|| ProviderFailure::Protocol("response has no content array".into()))?;

    let text: String = blocks
        .iter()
        .filter(|block| block.get("type").and_then(Value::as_str) == Some("text"))
        .filter_map(|block| block.get("text").and_then(Value::as_str))
        .collect();

    if text.is_empty() {
        return Err(ProviderFailure::Protocol(
            "response contains no text blocks".into(),
        ));
    }
    Ok(text)
}

#[async_trait]
impl TextProvider for ClaudeHaiku {
    fn name(&self) -> &'static str {
        "claude-haiku"
    }

    async fn edit_text(
        &self,
        original: &str,
        instruction: &str,
    ) -> Result<String, ProviderFailure> {
        let body = request_body(original, instruction);
        let response = self.runtime.invoke_model(&self.model_id, &body).await?;
        text_from_response(&response)
    }
}
