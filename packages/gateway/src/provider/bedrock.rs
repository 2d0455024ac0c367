use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;
use tracing::{debug, warn};

use super::sigv4::{self, SigningInput};
use super::truncate_for_log;
use crate::config::AwsConfig;
use crate::error::{GatewayError, ProviderFailure};

const SIGNING_SERVICE: &str = "bedrock";
const ERROR_TYPE_HEADER: &str = "x-amzn-errortype";

pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Minimal Bedrock runtime client: signed `InvokeModel` calls over the shared HTTP client.
#[derive(Debug, Clone)]
pub struct BedrockRuntime {
    http: reqwest::Client,
    endpoint: String,
    region: String,
    credentials: Arc<AwsCredentials>,
}

fn required(value: &Option<String>, env_name: &str) -> Result<String, GatewayError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            GatewayError::Config(format!(
                "{env_name} is not set; it is required by the selected Bedrock provider"
            ))
        })
}

impl BedrockRuntime {
    pub fn new(
        http: reqwest::Client,
        endpoint: impl Into<String>,
        region: impl Into<String>,
        credentials: AwsCredentials,
    ) -> Self {
        Self {
            http,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            region: region.into(),
            credentials: Arc::new(credentials),
        }
    }

    /// Build from configuration, failing if credentials are missing or the endpoint is unusable.
    pub fn from_config(aws: &AwsConfig, http: reqwest::Client) -> Result<Self, GatewayError> {
        let credentials = AwsCredentials {
            access_key_id: required(&aws.access_key_id, "AWS_ACCESS_KEY_ID")?,
            secret_access_key: required(&aws.secret_access_key, "AWS_SECRET_ACCESS_KEY")?,
            session_token: aws
                .session_token
                .clone()
                .filter(|token| !token.trim().is_empty()),
        };

        let endpoint = aws.endpoint_url();
        reqwest::Url::parse(&endpoint).map_err(|e| {
            GatewayError::Config(format!("invalid Bedrock endpoint '{endpoint}': {e}"))
        })?;

        Ok(Self::new(http, endpoint, aws.region.clone(), credentials))
    }

    /// Call `InvokeModel` with a JSON body and return the parsed JSON response.
    pub async fn invoke_model(&self, model_id: &str, body: &Value) -> Result<Value, ProviderFailure> {
        let payload = serde_json::to_vec(body)
            .map_err(|e| ProviderFailure::Protocol(format!("failed to encode request: {e}")))?;

        let url = reqwest::Url::parse(&format!(
            "{}/model/{}/invoke",
            self.endpoint,
            sigv4::uri_encode(model_id)
        ))
        .map_err(|e| ProviderFailure::Transport(format!("invalid Bedrock URL: {e}")))?;

        let host = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => {
                return Err(ProviderFailure::Transport(
                    "Bedrock endpoint has no host".into(),
                ));
            }
        };

        // Non-S3 services sign each path segment encoded a second time.
        let canonical_uri = url
            .path()
            .split('/')
            .map(sigv4::uri_encode)
            .collect::<Vec<_>>()
            .join("/");

        let now = Utc::now();
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();

        let mut headers = vec![
            ("content-type", "application/json".to_string()),
            ("host", host),
            ("x-amz-date", amz_date),
        ];
        if let Some(token) = &self.credentials.session_token {
            headers.push(("x-amz-security-token", token.clone()));
        }

        let signature = sigv4::sign(
            &SigningInput {
                method: "POST",
                canonical_uri: &canonical_uri,
                canonical_query: "",
                headers,
                payload_sha256: sigv4::sha256_hex(&payload),
            },
            &self.credentials.access_key_id,
            &self.credentials.secret_access_key,
            &self.region,
            SIGNING_SERVICE,
            now,
        );

        let mut request = self
            .http
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .header("x-amz-date", &signature.amz_date)
            .header(AUTHORIZATION, &signature.authorization);
        if let Some(token) = &self.credentials.session_token {
            request = request.header("x-amz-security-token", token);
        }

        debug!(model_id, "Invoking Bedrock model");
        let response = request.body(payload).send().await?;

        let status = response.status();
        let error_type = response
            .headers()
            .get(ERROR_TYPE_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let text = response.text().await?;

        if !status.is_success() {
            return Err(classify_error(status.as_u16(), error_type.as_deref(), &text));
        }

        serde_json::from_str(&text).map_err(|e| {
            warn!(model_id, body = truncate_for_log(&text), "Bedrock returned non-JSON body");
            ProviderFailure::Protocol(format!("invalid JSON from Bedrock: {e}"))
        })
    }
}

/// Strip `"ThrottlingException:http://..."` or `"com.amazon...#ThrottlingException"` to the bare code.
fn error_code(raw: &str) -> &str {
    let raw = raw.split(':').next().unwrap_or(raw);
    raw.rsplit('#').next().unwrap_or(raw).trim()
}

/// Classify a failed `InvokeModel` response by its AWS error code, then by status.
pub(crate) fn classify_error(status: u16, error_type: Option<&str>, body: &str) -> ProviderFailure {
    let parsed: Option<Value> = serde_json::from_str(body).ok();

    let message = parsed
        .as_ref()
        .and_then(|v| v.get("message").or_else(|| v.get("Message")))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| truncate_for_log(body).to_string());

    let code = error_type.map(error_code).or_else(|| {
        parsed
            .as_ref()
            .and_then(|v| v.get("__type"))
            .and_then(Value::as_str)
            .map(error_code)
    });

    match code {
        Some("ThrottlingException") => ProviderFailure::RateLimited { retry_after: None },
        Some("ServiceQuotaExceededException") => ProviderFailure::QuotaExhausted(message),
        Some("ServiceUnavailableException") | Some("ModelNotReadyException") => {
            ProviderFailure::Transport(message)
        }
        _ => match status {
            429 => ProviderFailure::RateLimited { retry_after: None },
            502..=504 => ProviderFailure::Transport(message),
            _ => ProviderFailure::Rejected { status, message },
        },
    }
}
