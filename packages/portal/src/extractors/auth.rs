use axum::{extract::FromRequestParts, http::request::Parts};
use gateway::ActorRole;
use sea_orm::EntityTrait;

use crate::entity::user;
use crate::error::AppError;
use crate::state::AppState;
use crate::utils::jwt;

/// Authenticated user extracted from the `Authorization: Bearer <token>` header.
///
/// Add this as a handler parameter to require authentication. The token only
/// identifies the account; username and role are read from the database on
/// every request, so a role change applies to tokens already issued.
pub struct AuthUser {
    pub user_id: i32,
    pub username: String,
    pub role: ActorRole,
}

impl AuthUser {
    /// Returns `Ok(())` if the user holds one of `roles`, `Err(PermissionDenied)` otherwise.
    pub fn require_role(&self, roles: &[ActorRole]) -> Result<(), AppError> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            Err(AppError::PermissionDenied)
        }
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::TokenMissing)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(AppError::TokenInvalid)?;

        let claims = jwt::verify(token, &state.config.auth.jwt_secret)
            .map_err(|_| AppError::TokenInvalid)?;

        let account = user::Entity::find_by_id(claims.uid)
            .one(&state.db)
            .await?
            .ok_or(AppError::TokenInvalid)?;
        let role = account.role.parse::<ActorRole>().map_err(|_| {
            AppError::Internal(format!(
                "user {} has unknown role '{}'",
                account.id, account.role
            ))
        })?;

        Ok(AuthUser {
            user_id: account.id,
            username: account.username,
            role,
        })
    }
}
