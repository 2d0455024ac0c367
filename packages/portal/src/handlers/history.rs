use std::collections::HashMap;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use gateway::GenerationKind;
use sea_orm::*;
use tracing::{info, instrument};

use crate::entity::{comment, content_history, user};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::history::*;
use crate::models::shared::{PageQuery, Pagination};
use crate::state::AppState;

/// Map user ids to usernames for response rendering.
async fn usernames<C: ConnectionTrait>(
    db: &C,
    ids: impl IntoIterator<Item = i32>,
) -> Result<HashMap<i32, String>, AppError> {
    let mut ids: Vec<i32> = ids.into_iter().collect();
    ids.sort_unstable();
    ids.dedup();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let users = user::Entity::find()
        .filter(user::Column::Id.is_in(ids))
        .all(db)
        .await?;
    Ok(users.into_iter().map(|u| (u.id, u.username)).collect())
}

async fn find_entry<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<content_history::Model, AppError> {
    content_history::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("History entry {id} not found")))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "History",
    operation_id = "listHistory",
    summary = "List generated content",
    description = "Paginated, newest first. Use `mine=true` for the caller's own entries and `action_type` to filter by kind.",
    params(HistoryListQuery),
    responses(
        (status = 200, description = "History entries", body = HistoryListResponse),
        (status = 400, description = "Unknown action_type (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn list_history(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<HistoryListQuery>,
) -> Result<Json<HistoryListResponse>, AppError> {
    let (page, per_page) = PageQuery {
        page: query.page,
        per_page: query.per_page,
    }
    .resolve();

    let mut select = content_history::Entity::find();
    if query.mine.unwrap_or(false) {
        select = select.filter(content_history::Column::UserId.eq(auth_user.user_id));
    }
    if let Some(action_type) = query.action_type.as_deref() {
        let known = [GenerationKind::Image, GenerationKind::TextEdit]
            .iter()
            .any(|k| k.action_type() == action_type);
        if !known {
            return Err(AppError::Validation(
                "action_type must be 'image_gen' or 'text_edit'".into(),
            ));
        }
        select = select.filter(content_history::Column::ActionType.eq(action_type));
    }

    let total = select
        .clone()
        .paginate(&state.db, per_page)
        .num_items()
        .await?;

    let entries = select
        .order_by_desc(content_history::Column::CreatedAt)
        .order_by_desc(content_history::Column::Id)
        .offset(Some((page - 1) * per_page))
        .limit(Some(per_page))
        .all(&state.db)
        .await?;

    let names = usernames(&state.db, entries.iter().map(|e| e.user_id)).await?;
    let data = entries
        .into_iter()
        .map(|e| HistoryEntryResponse::new(e, &names))
        .collect();

    Ok(Json(HistoryListResponse {
        data,
        pagination: Pagination::new(page, per_page, total),
    }))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "History",
    operation_id = "getHistoryEntry",
    summary = "Get one history entry",
    params(("id" = i32, Path, description = "History entry ID")),
    responses(
        (status = 200, description = "History entry", body = HistoryEntryResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user))]
pub async fn get_history(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<HistoryEntryResponse>, AppError> {
    let entry = find_entry(&state.db, id).await?;
    let names = usernames(&state.db, [entry.user_id]).await?;
    Ok(Json(HistoryEntryResponse::new(entry, &names)))
}

#[utoipa::path(
    get,
    path = "/{id}/comments",
    tag = "History",
    operation_id = "listComments",
    summary = "List comments on an entry",
    description = "Oldest first.",
    params(("id" = i32, Path, description = "History entry ID")),
    responses(
        (status = 200, description = "Comments", body = Vec<CommentResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Entry not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user))]
pub async fn list_comments(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Vec<CommentResponse>>, AppError> {
    find_entry(&state.db, id).await?;

    let comments = comment::Entity::find()
        .filter(comment::Column::ContentId.eq(id))
        .order_by_asc(comment::Column::CreatedAt)
        .order_by_asc(comment::Column::Id)
        .all(&state.db)
        .await?;

    let names = usernames(&state.db, comments.iter().map(|c| c.user_id)).await?;
    Ok(Json(
        comments
            .into_iter()
            .map(|c| CommentResponse::new(c, &names))
            .collect(),
    ))
}

#[utoipa::path(
    post,
    path = "/{id}/comments",
    tag = "History",
    operation_id = "createComment",
    summary = "Comment on an entry",
    params(("id" = i32, Path, description = "History entry ID")),
    request_body = CreateCommentRequest,
    responses(
        (status = 201, description = "Comment added", body = CommentResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Entry not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id))]
pub async fn create_comment(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<CreateCommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_comment(&payload)?;
    find_entry(&state.db, id).await?;

    let model = comment::ActiveModel {
        content_id: Set(id),
        user_id: Set(auth_user.user_id),
        text: Set(payload.text.trim().to_string()),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    info!(comment_id = model.id, content_id = id, "Comment added");
    let names = HashMap::from([(auth_user.user_id, auth_user.username)]);
    Ok((StatusCode::CREATED, Json(CommentResponse::new(model, &names))))
}
