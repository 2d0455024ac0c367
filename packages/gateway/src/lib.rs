//! Content generation gateway: role gating, keyword moderation, and
//! retry-wrapped calls to pluggable image and text providers.

pub mod config;
pub mod error;
pub mod gateway;
pub mod moderation;
pub mod provider;
pub mod request;
pub mod retry;

pub use config::GatewayConfig;
pub use error::{GatewayError, ProviderFailure};
pub use gateway::ContentGateway;
pub use moderation::{ModerationFilter, ModerationVerdict};
pub use provider::{ImageProvider, TextProvider};
pub use request::{
    ActorRole, GenerationKind, GenerationRequest, GenerationResult, ImageStyle, Payload,
};
pub use retry::RetryController;
