use gateway::ActorRole;
use serde::{Deserialize, Serialize};

use crate::entity::user;
use crate::error::AppError;

/// Request body for creating a staff account.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateUserRequest {
    /// Unique username (1-32 chars, alphanumeric and underscores).
    #[schema(example = "walt_writer")]
    pub username: String,
    /// Password (8-128 characters).
    #[schema(example = "s3cure_P@ss!")]
    pub password: String,
    /// One of `admin`, `designer`, `writer`.
    #[schema(example = "writer")]
    pub role: String,
}

/// Request body for changing a user's role.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpdateRoleRequest {
    #[schema(example = "designer")]
    pub role: String,
}

pub fn parse_role(role: &str) -> Result<ActorRole, AppError> {
    role.trim()
        .to_lowercase()
        .parse::<ActorRole>()
        .map_err(|e| AppError::Validation(e.to_string()))
}

pub fn validate_create_user(payload: &CreateUserRequest) -> Result<ActorRole, AppError> {
    let username = payload.username.trim();
    if username.is_empty() || username.chars().count() > 32 {
        return Err(AppError::Validation(
            "Username must be 1-32 characters".into(),
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(AppError::Validation(
            "Username must contain only letters, digits, and underscores".into(),
        ));
    }
    if payload.password.len() < 8 || payload.password.len() > 128 {
        return Err(AppError::Validation(
            "Password must be 8-128 characters".into(),
        ));
    }
    parse_role(&payload.role)
}

/// Staff account as returned by the API. Never includes the password hash.
#[derive(Serialize, utoipa::ToSchema)]
pub struct UserResponse {
    #[schema(example = 42)]
    pub id: i32,
    #[schema(example = "walt_writer")]
    pub username: String,
    #[schema(example = "writer")]
    pub role: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<user::Model> for UserResponse {
    fn from(user: user::Model) -> Self {
        Self {
            id: user.id,
            username: user.username,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct UserListResponse {
    pub data: Vec<UserResponse>,
    pub pagination: crate::models::shared::Pagination,
}
