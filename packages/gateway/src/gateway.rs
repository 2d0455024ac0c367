use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::config::GatewayConfig;
use crate::error::{GatewayError, ProviderFailure, Result};
use crate::moderation::ModerationFilter;
use crate::provider::{
    ImageProvider, TextProvider, build_http_client, build_image_provider, build_text_provider,
    detect_image_format, normalize_text,
};
use crate::request::{GenerationInput, GenerationRequest, GenerationResult, Payload};
use crate::retry::RetryController;

/// Single entry point for content generation.
///
/// Runs role gating, then moderation, then the provider call under the retry
/// controller. Stateless across requests and safe to share behind an `Arc`.
pub struct ContentGateway {
    image: Arc<dyn ImageProvider>,
    text: Arc<dyn TextProvider>,
    moderation: ModerationFilter,
    retry: RetryController,
}

impl ContentGateway {
    pub fn new(
        image: Arc<dyn ImageProvider>,
        text: Arc<dyn TextProvider>,
        moderation: ModerationFilter,
        retry: RetryController,
    ) -> Self {
        Self {
            image,
            text,
            moderation,
            retry,
        }
    }

    /// Build the configured adapters. Fails if a selected provider lacks credentials.
    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        let http = build_http_client(config)?;
        let image = build_image_provider(config, http.clone())?;
        let text = build_text_provider(config, http)?;
        let moderation = ModerationFilter::new(
            config.moderation.empty_input,
            &config.moderation.extra_terms,
        );

        info!(
            image_provider = image.name(),
            text_provider = text.name(),
            max_attempts = config.retry.max_attempts,
            "Content gateway ready"
        );

        Ok(Self::new(
            image,
            text,
            moderation,
            RetryController::new(&config.retry),
        ))
    }

    pub fn moderation(&self) -> &ModerationFilter {
        &self.moderation
    }

    pub fn image_provider_name(&self) -> &'static str {
        self.image.name()
    }

    pub fn text_provider_name(&self) -> &'static str {
        self.text.name()
    }

    #[instrument(skip_all, fields(actor_id = request.actor_id, role = %request.actor_role, kind = %request.kind()))]
    pub async fn handle(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> Result<GenerationResult> {
        let kind = request.kind();
        if !request.actor_role.may_request(kind) {
            info!("Generation refused by role");
            return Err(GatewayError::Forbidden {
                role: request.actor_role,
                kind,
            });
        }

        let verdict = match &request.input {
            GenerationInput::Image { prompt, .. } => self.moderation.check(prompt),
            GenerationInput::TextEdit { text, instruction } => self
                .moderation
                .check_all([text.as_str(), instruction.as_str()]),
        };
        if verdict.blocked {
            info!(term = verdict.term.as_deref(), "Generation blocked by moderation");
            return Err(GatewayError::Blocked(verdict));
        }

        let started = Instant::now();
        let (payload, provider, attempts) = match &request.input {
            GenerationInput::Image { prompt, style } => {
                let image = &self.image;
                let done = self
                    .retry
                    .invoke(cancel, |_| async move {
                        let bytes = image.generate_image(prompt, style).await?;
                        let format = detect_image_format(&bytes)?;
                        Ok::<_, ProviderFailure>(Payload::Image { bytes, format })
                    })
                    .await?;
                (done.value, image.name(), done.attempts)
            }
            GenerationInput::TextEdit { text, instruction } => {
                let provider = &self.text;
                let done = self
                    .retry
                    .invoke(cancel, |_| async move {
                        let edited = provider.edit_text(text, instruction).await?;
                        Ok::<_, ProviderFailure>(Payload::Text(normalize_text(&edited)?))
                    })
                    .await?;
                (done.value, provider.name(), done.attempts)
            }
        };

        let latency = started.elapsed();
        info!(
            provider,
            attempts,
            latency_ms = latency.as_millis() as u64,
            "Generation succeeded"
        );

        Ok(GenerationResult {
            kind,
            payload,
            provider,
            latency,
            attempts,
        })
    }
}
