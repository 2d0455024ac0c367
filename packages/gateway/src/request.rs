use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use image::ImageFormat;
use serde::{Deserialize, Serialize};

/// Staff role. Decides which generation kinds an actor may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorRole {
    Admin,
    Designer,
    Writer,
}

impl ActorRole {
    pub const ALL: [ActorRole; 3] = [ActorRole::Admin, ActorRole::Designer, ActorRole::Writer];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActorRole::Admin => "admin",
            ActorRole::Designer => "designer",
            ActorRole::Writer => "writer",
        }
    }

    /// Writers cannot generate images and designers cannot edit text.
    pub fn may_request(&self, kind: GenerationKind) -> bool {
        !matches!(
            (self, kind),
            (ActorRole::Writer, GenerationKind::Image)
                | (ActorRole::Designer, GenerationKind::TextEdit)
        )
    }
}

impl fmt::Display for ActorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role '{0}', expected one of: admin, designer, writer")]
pub struct UnknownRole(pub String);

impl FromStr for ActorRole {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(ActorRole::Admin),
            "designer" => Ok(ActorRole::Designer),
            "writer" => Ok(ActorRole::Writer),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationKind {
    Image,
    TextEdit,
}

impl GenerationKind {
    /// Value stored as the history `action_type` for this kind.
    pub fn action_type(&self) -> &'static str {
        match self {
            GenerationKind::Image => "image_gen",
            GenerationKind::TextEdit => "text_edit",
        }
    }
}

impl fmt::Display for GenerationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationKind::Image => f.write_str("image generation"),
            GenerationKind::TextEdit => f.write_str("text editing"),
        }
    }
}

/// Caller-supplied styling for image generation.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageStyle {
    /// Free-form style descriptor, e.g. "photographic".
    pub preset: String,
    /// Prompt adherence. Passed through to providers that support it.
    pub cfg_scale: Option<f32>,
}

impl Default for ImageStyle {
    fn default() -> Self {
        Self {
            preset: "photographic".into(),
            cfg_scale: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GenerationInput {
    Image { prompt: String, style: ImageStyle },
    TextEdit { text: String, instruction: String },
}

/// One generation call. Built per request, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub actor_id: i32,
    pub actor_role: ActorRole,
    pub input: GenerationInput,
}

impl GenerationRequest {
    pub fn image(
        actor_id: i32,
        actor_role: ActorRole,
        prompt: impl Into<String>,
        style: ImageStyle,
    ) -> Self {
        Self {
            actor_id,
            actor_role,
            input: GenerationInput::Image {
                prompt: prompt.into(),
                style,
            },
        }
    }

    pub fn text_edit(
        actor_id: i32,
        actor_role: ActorRole,
        text: impl Into<String>,
        instruction: impl Into<String>,
    ) -> Self {
        Self {
            actor_id,
            actor_role,
            input: GenerationInput::TextEdit {
                text: text.into(),
                instruction: instruction.into(),
            },
        }
    }

    pub fn kind(&self) -> GenerationKind {
        match self.input {
            GenerationInput::Image { .. } => GenerationKind::Image,
            GenerationInput::TextEdit { .. } => GenerationKind::TextEdit,
        }
    }
}

/// Normalized provider output.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Raw image bytes whose format has been detected.
    Image { bytes: Vec<u8>, format: ImageFormat },
    /// Trimmed, non-empty text.
    Text(String),
}

impl Payload {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(text) => Some(text),
            Payload::Image { .. } => None,
        }
    }

    pub fn as_image(&self) -> Option<&[u8]> {
        match self {
            Payload::Image { bytes, .. } => Some(bytes),
            Payload::Text(_) => None,
        }
    }

    /// File extension for image payloads, e.g. "png".
    pub fn extension(&self) -> Option<&'static str> {
        match self {
            Payload::Image { format, .. } => format.extensions_str().first().copied(),
            Payload::Text(_) => None,
        }
    }
}

/// Successful gateway output, immutable once returned.
#[derive(Debug, Clone)]
pub struct GenerationResult {
    pub kind: GenerationKind,
    pub payload: Payload,
    /// Name of the provider that produced the payload.
    pub provider: &'static str,
    /// Wall time across all attempts, including backoff waits.
    pub latency: Duration,
    pub attempts: u8,
}
