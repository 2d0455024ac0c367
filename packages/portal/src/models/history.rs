use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::entity::{comment, content_history};
use crate::error::AppError;
use crate::models::shared::Pagination;

const MAX_COMMENT_CHARS: usize = 2000;

/// Query parameters for listing history.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HistoryListQuery {
    /// Page number (1-based). Default: 1.
    pub page: Option<u64>,
    /// Items per page (1-100). Default: 20.
    pub per_page: Option<u64>,
    /// Only entries created by the caller.
    pub mine: Option<bool>,
    /// Filter by `image_gen` or `text_edit`.
    pub action_type: Option<String>,
}

/// One logged generation.
#[derive(Serialize, utoipa::ToSchema)]
pub struct HistoryEntryResponse {
    #[schema(example = 12)]
    pub id: i32,
    #[schema(example = 3)]
    pub user_id: i32,
    /// Author's username, or `null` if the account no longer exists.
    #[schema(example = "dana_design")]
    pub username: Option<String>,
    #[schema(example = "image_gen")]
    pub action_type: String,
    /// Prompt or original text.
    pub input: String,
    pub instruction: Option<String>,
    pub style: Option<String>,
    /// Stored image filename or edited text.
    pub result: String,
    /// Public path for image entries.
    pub image_url: Option<String>,
    #[schema(example = "titan-image")]
    pub provider: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl HistoryEntryResponse {
    pub fn new(entry: content_history::Model, usernames: &HashMap<i32, String>) -> Self {
        let image_url = (entry.action_type == gateway::GenerationKind::Image.action_type())
            .then(|| format!("/images/{}", entry.result));
        Self {
            id: entry.id,
            user_id: entry.user_id,
            username: usernames.get(&entry.user_id).cloned(),
            action_type: entry.action_type,
            input: entry.input,
            instruction: entry.instruction,
            style: entry.style,
            result: entry.result,
            image_url,
            provider: entry.provider,
            created_at: entry.created_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct HistoryListResponse {
    pub data: Vec<HistoryEntryResponse>,
    pub pagination: Pagination,
}

/// Request body for adding a comment.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateCommentRequest {
    /// Comment text (1-2000 characters).
    #[schema(example = "Love the colours, can we try a warmer palette?")]
    pub text: String,
}

pub fn validate_comment(payload: &CreateCommentRequest) -> Result<(), AppError> {
    let text = payload.text.trim();
    if text.is_empty() || text.chars().count() > MAX_COMMENT_CHARS {
        return Err(AppError::Validation(format!(
            "Comment must be 1-{MAX_COMMENT_CHARS} characters"
        )));
    }
    Ok(())
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct CommentResponse {
    #[schema(example = 5)]
    pub id: i32,
    #[schema(example = 12)]
    pub content_id: i32,
    #[schema(example = 4)]
    pub user_id: i32,
    #[schema(example = "walt_writer")]
    pub username: Option<String>,
    pub text: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl CommentResponse {
    pub fn new(comment: comment::Model, usernames: &HashMap<i32, String>) -> Self {
        Self {
            id: comment.id,
            content_id: comment.content_id,
            user_id: comment.user_id,
            username: usernames.get(&comment.user_id).cloned(),
            text: comment.text,
            created_at: comment.created_at,
        }
    }
}
