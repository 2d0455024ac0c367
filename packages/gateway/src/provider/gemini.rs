use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::warn;

use super::{TextProvider, editor_prompt, retry_after_header, truncate_for_log};
use crate::config::GeminiConfig;
use crate::error::{GatewayError, ProviderFailure};

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Google Gemini Flash via the Generative Language REST API.
pub struct GeminiFlash {
    http: reqwest::Client,
    url: reqwest::Url,
    api_key: String,
}

impl GeminiFlash {
    pub fn new(config: &GeminiConfig, http: reqwest::Client) -> Result<Self, GatewayError> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                GatewayError::Config(
                    "GEMINI_API_KEY is not set; it is required by the gemini_flash provider"
                        .into(),
                )
            })?
            .to_string();

        let raw = format!(
            "{}/v1beta/models/{}:generateContent",
            config.base_url.trim_end_matches('/'),
            config.model
        );
        let url = reqwest::Url::parse(&raw)
            .map_err(|e| GatewayError::Config(format!("invalid Gemini URL '{raw}': {e}")))?;

        Ok(Self { http, url, api_key })
    }
}

fn request_body(original: &str, instruction: &str) -> Value {
    json!({
        "contents": [{
            "role": "user",
            "parts": [{ "text": editor_prompt(original, instruction) }],
        }],
    })
}

fn text_from_response(response: &Value) -> Result<String, ProviderFailure> {
    if let Some(reason) = response
        .pointer("/promptFeedback/blockReason")
        .and_then(Value::as_str)
    {
        return Err(ProviderFailure::Rejected {
            status: 200,
            message: format!("The provider blocked the prompt ({reason})"),
        });
    }

    let candidate = response
        .pointer("/candidates/0")
        .ok_or_else(|| ProviderFailure::Protocol("response has no candidates".into()))?;

    if candidate.get("finishReason").and_then(Value::as_str) == Some("SAFETY") {
        return Err(ProviderFailure::Rejected {
            status: 200,
            message: "The provider's safety filter blocked the response".into(),
        });
    }

    let text: String = candidate
        .pointer("/content/parts")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect();

    if text.is_empty() {
        return Err(ProviderFailure::Protocol("candidate has no text parts".into()));
    }
    Ok(text)
}

/// Parse a protobuf duration such as `"27s"` or `"1.5s"`.
fn parse_proto_duration(raw: &str) -> Option<Duration> {
    let secs: f64 = raw.trim().strip_suffix('s')?.parse().ok()?;
    Duration::try_from_secs_f64(secs).ok()
}

/// Classify a Google API error envelope.
///
/// `RESOURCE_EXHAUSTED` covers both per-minute throttling and daily quotas;
/// the `QuotaFailure` detail tells them apart.
pub(crate) fn classify_error(
    status: u16,
    body: &str,
    header_retry: Option<Duration>,
) -> ProviderFailure {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let error = parsed.as_ref().and_then(|v| v.get("error"));

    let message = error
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| truncate_for_log(body).to_string());
    let code = error.and_then(|e| e.get("status")).and_then(Value::as_str);
    let details: &[Value] = error
        .and_then(|e| e.get("details"))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);

    let detail_of = |suffix: &str| {
        details.iter().find(|d| {
            d.get("@type")
                .and_then(Value::as_str)
                .is_some_and(|t| t.ends_with(suffix))
        })
    };

    match (code, status) {
        (Some("RESOURCE_EXHAUSTED"), _) | (None, 429) => {
            let daily = detail_of("QuotaFailure")
                .and_then(|d| d.get("violations"))
                .and_then(Value::as_array)
                .is_some_and(|violations| {
                    violations.iter().any(|v| {
                        v.get("quotaId")
                            .and_then(Value::as_str)
                            .is_some_and(|id| id.contains("PerDay"))
                    })
                });
            if daily {
                return ProviderFailure::QuotaExhausted(message);
            }
            let hinted = detail_of("RetryInfo")
                .and_then(|d| d.get("retryDelay"))
                .and_then(Value::as_str)
                .and_then(parse_proto_duration);
            ProviderFailure::RateLimited {
                retry_after: hinted.or(header_retry),
            }
        }
        (Some("UNAVAILABLE"), _) | (Some("DEADLINE_EXCEEDED"), _) | (None, 500..=504) => {
            ProviderFailure::Transport(message)
        }
        _ => ProviderFailure::Rejected { status, message },
    }
}

#[async_trait]
impl TextProvider for GeminiFlash {
    fn name(&self) -> &'static str {
        "gemini-flash"
    }

    async fn edit_text(
        &self,
        original: &str,
        instruction: &str,
    ) -> Result<String, ProviderFailure> {
        let response = self
            .http
            .post(self.url.clone())
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request_body(original, instruction))
            .send()
            .await?;

        let status = response.status();
        let header_retry = retry_after_header(response.headers());
        let text = response.text().await?;

        if !status.is_success() {
            return Err(classify_error(status.as_u16(), &text, header_retry));
        }

        let parsed: Value = serde_json::from_str(&text).map_err(|e| {
            warn!(body = truncate_for_log(&text), "Gemini returned non-JSON body");
            ProviderFailure::Protocol(format!("invalid JSON from Gemini: {e}"))
        })?;
        text_from_response(&parsed)
    }
}
