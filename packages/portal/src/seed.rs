use gateway::ActorRole;
use sea_orm::sea_query::{Index, OnConflict, SqliteQueryBuilder};
use sea_orm::*;
use tracing::{info, warn};

use crate::config::AuthConfig;
use crate::entity::{comment, content_history, user};
use crate::utils::hash;

/// Create the configured bootstrap admin if no user with that name exists.
///
/// An existing account is left untouched, including its password and role.
pub async fn ensure_bootstrap_admin(db: &DatabaseConnection, auth: &AuthConfig) -> Result<(), DbErr> {
    let Some(admin) = &auth.bootstrap_admin else {
        return Ok(());
    };

    let password = hash::hash_password(&admin.password)
        .map_err(|e| DbErr::Custom(format!("Password hash error: {e}")))?;
    let model = user::ActiveModel {
        username: Set(admin.username.clone()),
        password: Set(password),
        role: Set(ActorRole::Admin.as_str().to_string()),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    let result = user::Entity::insert(model)
        .on_conflict(
            OnConflict::column(user::Column::Username)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await;

    match result {
        Ok(0) | Err(DbErr::RecordNotInserted) => {}
        Ok(_) => info!(username = %admin.username, "Created bootstrap admin"),
        Err(e) => return Err(e),
    }
    Ok(())
}

/// Ensure the composite indexes used by history and comment listings exist.
///
/// Schema sync only creates single-column indexes, so these are created here.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    let indexes = [
        (
            "idx_history_user_created",
            Index::create()
                .if_not_exists()
                .name("idx_history_user_created")
                .table(content_history::Entity)
                .col(content_history::Column::UserId)
                .col(content_history::Column::CreatedAt)
                .to_string(SqliteQueryBuilder),
        ),
        (
            "idx_comment_content_created",
            Index::create()
                .if_not_exists()
                .name("idx_comment_content_created")
                .table(comment::Entity)
                .col(comment::Column::ContentId)
                .col(comment::Column::CreatedAt)
                .to_string(SqliteQueryBuilder),
        ),
    ];

    for (name, stmt) in indexes {
        match db.execute_unprepared(&stmt).await {
            Ok(_) => info!("Ensured index {name} exists"),
            Err(e) => warn!("Failed to create index {name}: {e}"),
        }
    }

    Ok(())
}
