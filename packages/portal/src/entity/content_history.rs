use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One row per successful generation. Never updated.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "content_history")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub user_id: i32,
    #[sea_orm(belongs_to, from = "user_id", to = "id")]
    pub user: HasOne<super::user::Entity>,

    /// `image_gen` or `text_edit`.
    pub action_type: String,
    /// Image prompt or the original text.
    #[sea_orm(column_type = "Text")]
    pub input: String,
    /// Editing instruction; NULL for images.
    #[sea_orm(column_type = "Text", nullable)]
    pub instruction: Option<String>,
    /// Style preset; NULL for text edits.
    pub style: Option<String>,
    /// Stored image filename or the edited text.
    #[sea_orm(column_type = "Text")]
    pub result: String,
    pub provider: String,

    #[sea_orm(has_many)]
    pub comments: HasMany<super::comment::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
