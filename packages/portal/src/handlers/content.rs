use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use gateway::{GenerationRequest, ImageStyle, Payload};
use sea_orm::*;
use tracing::{info, instrument, warn};

use crate::entity::content_history;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::content::*;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/images",
    tag = "Content",
    operation_id = "generateImage",
    summary = "Generate a marketing image",
    description = "Moderates the prompt, calls the configured image provider with retries, stores the image and logs it to history. Writers may not generate images.",
    request_body = ImageRequest,
    responses(
        (status = 201, description = "Image generated", body = ImageResponse),
        (status = 400, description = "Validation error or blocked prompt (VALIDATION_ERROR, CONTENT_BLOCKED)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Role may not generate images (PERMISSION_DENIED)", body = ErrorBody),
        (status = 500, description = "Provider failure (PROVIDER_BUSY, PROVIDER_QUOTA_EXCEEDED, PROVIDER_ERROR)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id))]
pub async fn generate_image(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<ImageRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_image_request(&payload)?;

    let mut style = ImageStyle {
        cfg_scale: payload.cfg_scale,
        ..ImageStyle::default()
    };
    if let Some(preset) = payload.style.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        style.preset = preset.to_string();
    }

    let request = GenerationRequest::image(
        auth_user.user_id,
        auth_user.role,
        payload.prompt.clone(),
        style.clone(),
    );
    // Dropping the handler future (client went away) cancels pending retries.
    let cancel = state.shutdown.child_token();
    let _guard = cancel.clone().drop_guard();
    let generated = state.gateway.handle(&request, &cancel).await?;

    let (Some(bytes), Some(extension)) =
        (generated.payload.as_image(), generated.payload.extension())
    else {
        return Err(AppError::Internal(
            "Image provider returned a non-image payload".into(),
        ));
    };
    let _commit = state.image_commits.lock().await;
    let stored = state.images.put(bytes, extension).await?;

    let entry = content_history::ActiveModel {
        user_id: Set(auth_user.user_id),
        action_type: Set(generated.kind.action_type().to_string()),
        input: Set(payload.prompt),
        instruction: Set(None),
        style: Set(Some(style.preset)),
        result: Set(stored.filename.clone()),
        provider: Set(generated.provider.to_string()),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    let entry = match entry.insert(&state.db).await {
        Ok(entry) => entry,
        Err(e) => {
            // Only remove files this request created; identical content may already be logged.
            if stored.created
                && let Err(cleanup) = state.images.delete(&stored.filename).await
            {
                warn!(filename = %stored.filename, error = %cleanup, "Failed to remove orphaned image");
            }
            return Err(e.into());
        }
    };

    info!(history_id = entry.id, filename = %stored.filename, "Image generated");
    Ok((
        StatusCode::CREATED,
        Json(ImageResponse {
            history_id: entry.id,
            image_url: format!("/images/{}", stored.filename),
            filename: stored.filename,
            provider: generated.provider.to_string(),
            attempts: generated.attempts,
            latency_ms: generated.latency.as_millis() as u64,
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/text-edits",
    tag = "Content",
    operation_id = "editText",
    summary = "Rewrite marketing copy",
    description = "Moderates both the text and the instruction, calls the configured text provider with retries and logs the result to history. Designers may not edit text.",
    request_body = TextEditRequest,
    responses(
        (status = 201, description = "Text edited", body = TextEditResponse),
        (status = 400, description = "Validation error or blocked input (VALIDATION_ERROR, CONTENT_BLOCKED)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Role may not edit text (PERMISSION_DENIED)", body = ErrorBody),
        (status = 500, description = "Provider failure (PROVIDER_BUSY, PROVIDER_QUOTA_EXCEEDED, PROVIDER_ERROR)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id))]
pub async fn edit_text(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<TextEditRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_text_edit_request(&payload)?;

    let request = GenerationRequest::text_edit(
        auth_user.user_id,
        auth_user.role,
        payload.text.clone(),
        payload.instruction.clone(),
    );
    let cancel = state.shutdown.child_token();
    let _guard = cancel.clone().drop_guard();
    let generated = state.gateway.handle(&request, &cancel).await?;

    let result = match &generated.payload {
        Payload::Text(text) => text.clone(),
        Payload::Image { .. } => {
            return Err(AppError::Internal(
                "Text provider returned a non-text payload".into(),
            ));
        }
    };

    let entry = content_history::ActiveModel {
        user_id: Set(auth_user.user_id),
        action_type: Set(generated.kind.action_type().to_string()),
        input: Set(payload.text),
        instruction: Set(Some(payload.instruction)),
        style: Set(None),
        result: Set(result.clone()),
        provider: Set(generated.provider.to_string()),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    info!(history_id = entry.id, "Text edited");
    Ok((
        StatusCode::CREATED,
        Json(TextEditResponse {
            history_id: entry.id,
            result,
            provider: generated.provider.to_string(),
            attempts: generated.attempts,
            latency_ms: generated.latency.as_millis() as u64,
        }),
    ))
}
