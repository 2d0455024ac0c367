use std::time::Duration;

use thiserror::Error;

use crate::moderation::ModerationVerdict;
use crate::request::{ActorRole, GenerationKind};

/// Failure of a single provider call, classified at the adapter boundary.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderFailure {
    /// The provider throttled the request. Worth retrying.
    #[error("provider throttled the request")]
    RateLimited { retry_after: Option<Duration> },

    /// A longer-period allowance is used up. Retrying cannot help before it resets.
    #[error("provider quota exhausted: {0}")]
    QuotaExhausted(String),

    /// Network error or timeout before a response was received.
    #[error("transport error: {0}")]
    Transport(String),

    /// The provider answered with something we cannot interpret.
    #[error("malformed provider response: {0}")]
    Protocol(String),

    /// The provider refused the request (auth, validation, safety filter, ...).
    #[error("provider rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
}

impl ProviderFailure {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderFailure::RateLimited { .. } | ProviderFailure::Transport(_)
        )
    }

    /// Minimum wait requested by the provider, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ProviderFailure::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ProviderFailure {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ProviderFailure::Protocol(err.to_string())
        } else {
            ProviderFailure::Transport(err.to_string())
        }
    }
}

/// Typed failure returned by [`crate::ContentGateway::handle`].
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Role '{role}' is not allowed to request {kind}")]
    Forbidden {
        role: ActorRole,
        kind: GenerationKind,
    },

    #[error("{}", .0.reason)]
    Blocked(ModerationVerdict),

    #[error("The provider's usage quota is exhausted, please try again later")]
    QuotaExceeded,

    #[error("The generation service is busy, please try again in a moment")]
    Busy { attempts: u8 },

    #[error("{0}")]
    Provider(String),

    #[error("Request cancelled before the provider answered")]
    Cancelled,

    #[error("Gateway configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, GatewayError>;
