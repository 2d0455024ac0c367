use std::sync::Arc;

use common::storage::ImageStore;
use gateway::ContentGateway;
use sea_orm::DatabaseConnection;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: AppConfig,
    pub gateway: Arc<ContentGateway>,
    pub images: Arc<dyn ImageStore>,
    /// Held from storing an image until its history row is committed or the file is
    /// cleaned up, so a cleanup never removes a file another request just logged.
    pub image_commits: Arc<Mutex<()>>,
    /// Cancelled on shutdown. In-flight generations stop waiting between retries.
    pub shutdown: CancellationToken,
}
