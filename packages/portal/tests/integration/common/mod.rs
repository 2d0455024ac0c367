use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use ::common::storage::FilesystemImageStore;
use gateway::config::RetryConfig;
use gateway::{
    ContentGateway, ImageProvider, ImageStyle, ModerationFilter, ProviderFailure, RetryController,
    TextProvider,
};
use reqwest::Client;
use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait};
use serde_json::Value;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use portal::config::{
    AppConfig, AuthConfig, BootstrapAdmin, CorsConfig, DatabaseConfig, ServerConfig,
    StorageConfig,
};
use portal::entity::content_history;
use portal::state::AppState;

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "admin-password";
pub const JWT_SECRET: &str = "test-secret-for-integration-tests";

/// 1x1 PNG header; enough for format detection.
const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

pub mod routes {
    pub const LOGIN: &str = "/api/v1/auth/login";
    pub const ME: &str = "/api/v1/auth/me";
    pub const USERS: &str = "/api/v1/users";
    pub const IMAGES: &str = "/api/v1/content/images";
    pub const TEXT_EDITS: &str = "/api/v1/content/text-edits";
    pub const HISTORY: &str = "/api/v1/history";

    pub fn user_role(id: i32) -> String {
        format!("/api/v1/users/{id}/role")
    }

    pub fn history_entry(id: i32) -> String {
        format!("/api/v1/history/{id}")
    }

    pub fn comments(id: i32) -> String {
        format!("/api/v1/history/{id}/comments")
    }
}

/// Image provider whose output depends only on the prompt.
///
/// Prompts containing "quota" fail with an exhausted quota, prompts
/// containing "busy" are throttled on every attempt.
#[derive(Default)]
pub struct StubImage {
    pub calls: AtomicUsize,
}

#[async_trait]
impl ImageProvider for StubImage {
    fn name(&self) -> &'static str {
        "stub-image"
    }

    async fn generate_image(
        &self,
        prompt: &str,
        _style: &ImageStyle,
    ) -> Result<Vec<u8>, ProviderFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if prompt.contains("quota") {
            return Err(ProviderFailure::QuotaExhausted("daily image quota".into()));
        }
        if prompt.contains("busy") {
            return Err(ProviderFailure::RateLimited { retry_after: None });
        }
        let mut bytes = PNG_MAGIC.to_vec();
        bytes.extend_from_slice(prompt.as_bytes());
        Ok(bytes)
    }
}

/// Text provider that prefixes the instruction in brackets, with stray whitespace.
#[derive(Default)]
pub struct StubText {
    pub calls: AtomicUsize,
}

#[async_trait]
impl TextProvider for StubText {
    fn name(&self) -> &'static str {
        "stub-text"
    }

    async fn edit_text(&self, original: &str, instruction: &str) -> Result<String, ProviderFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if instruction.contains("quota") {
            return Err(ProviderFailure::QuotaExhausted("daily token quota".into()));
        }
        if instruction.contains("busy") {
            return Err(ProviderFailure::RateLimited { retry_after: None });
        }
        Ok(format!("\n  [{instruction}] {original}  \n"))
    }
}

/// A running test server.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub db: DatabaseConnection,
    pub image_provider: Arc<StubImage>,
    pub text_provider: Arc<StubText>,
    pub images_dir: std::path::PathBuf,
    _scratch: TempDir,
}

/// Parsed HTTP response for test assertions.
pub struct TestResponse {
    pub status: u16,
    /// Raw response body as text.
    pub text: String,
    /// Parsed JSON body, or `Null` if the response is not valid JSON.
    pub body: Value,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let scratch = tempfile::tempdir().expect("Failed to create scratch directory");
        let db_url = format!(
            "sqlite://{}?mode=rwc",
            scratch.path().join("portal.db").display()
        );
        let images_dir = scratch.path().join("images");

        let db = portal::database::init_db(&db_url)
            .await
            .expect("Failed to initialize test database");

        let app_config = AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors: CorsConfig {
                    allow_origins: vec![],
                    max_age: 3600,
                },
            },
            database: DatabaseConfig { url: db_url },
            auth: AuthConfig {
                jwt_secret: JWT_SECRET.to_string(),
                bootstrap_admin: Some(BootstrapAdmin {
                    username: ADMIN_USERNAME.to_string(),
                    password: ADMIN_PASSWORD.to_string(),
                }),
            },
            storage: StorageConfig {
                images_dir: images_dir.clone(),
                max_image_bytes: 1024 * 1024,
            },
            gateway: Default::default(),
        };

        portal::seed::ensure_indexes(&db)
            .await
            .expect("Failed to create indexes");
        portal::seed::ensure_bootstrap_admin(&db, &app_config.auth)
            .await
            .expect("Failed to create bootstrap admin");

        let images = FilesystemImageStore::new(images_dir.clone(), 1024 * 1024)
            .await
            .expect("Failed to open image store");

        let image_provider = Arc::new(StubImage::default());
        let text_provider = Arc::new(StubText::default());
        let gateway = ContentGateway::new(
            image_provider.clone(),
            text_provider.clone(),
            ModerationFilter::default(),
            RetryController::new(&RetryConfig {
                max_attempts: 3,
                base_delay_ms: 1,
                max_delay_ms: 5,
            }),
        );

        let state = AppState {
            db: db.clone(),
            config: app_config,
            gateway: Arc::new(gateway),
            images: Arc::new(images),
            image_commits: Default::default(),
            shutdown: CancellationToken::new(),
        };

        let app = portal::build_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            client: Client::new(),
            db,
            image_provider,
            text_provider,
            images_dir,
            _scratch: scratch,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn post_with_token(&self, path: &str, body: &Value, token: &str) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .json(body)
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn post_without_token(&self, path: &str, body: &Value) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn get_with_token(&self, path: &str, token: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn get_without_token(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn patch_with_token(&self, path: &str, body: &Value, token: &str) -> TestResponse {
        let res = self
            .client
            .patch(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .json(body)
            .send()
            .await
            .expect("Failed to send PATCH request");

        TestResponse::from_response(res).await
    }

    /// Log in and return the token.
    pub async fn login(&self, username: &str, password: &str) -> String {
        let res = self
            .post_without_token(
                routes::LOGIN,
                &serde_json::json!({"username": username, "password": password}),
            )
            .await;
        assert_eq!(res.status, 200, "Login failed: {}", res.text);

        res.body["token"]
            .as_str()
            .expect("Login response should contain a token")
            .to_string()
    }

    pub async fn admin_token(&self) -> String {
        self.login(ADMIN_USERNAME, ADMIN_PASSWORD).await
    }

    /// Create a user through the admin API and return its `id`.
    pub async fn create_user(&self, admin_token: &str, username: &str, role: &str) -> i32 {
        let res = self
            .post_with_token(
                routes::USERS,
                &serde_json::json!({
                    "username": username,
                    "password": "password123",
                    "role": role,
                }),
                admin_token,
            )
            .await;
        assert_eq!(res.status, 201, "create_user failed: {}", res.text);
        res.id()
    }

    /// Create a user with `role` and return their auth token.
    pub async fn create_user_with_role(&self, username: &str, role: &str) -> String {
        let admin = self.admin_token().await;
        self.create_user(&admin, username, role).await;
        self.login(username, "password123").await
    }

    /// Generate an image and return the response body.
    pub async fn generate_image(&self, token: &str, prompt: &str) -> Value {
        let res = self
            .post_with_token(routes::IMAGES, &serde_json::json!({"prompt": prompt}), token)
            .await;
        assert_eq!(res.status, 201, "generate_image failed: {}", res.text);
        res.body
    }

    /// Edit text and return the created history entry `id`.
    pub async fn edit_text(&self, token: &str, text: &str, instruction: &str) -> i32 {
        let res = self
            .post_with_token(
                routes::TEXT_EDITS,
                &serde_json::json!({"text": text, "instruction": instruction}),
                token,
            )
            .await;
        assert_eq!(res.status, 201, "edit_text failed: {}", res.text);
        res.body["history_id"]
            .as_i64()
            .expect("response should contain 'history_id'") as i32
    }

    pub async fn history_rows(&self) -> u64 {
        content_history::Entity::find()
            .count(&self.db)
            .await
            .expect("Failed to count history rows")
    }
}

impl TestResponse {
    pub async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let text = res.text().await.unwrap_or_default();
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        Self { status, text, body }
    }

    pub fn id(&self) -> i32 {
        self.body["id"]
            .as_i64()
            .expect("response body should contain 'id'") as i32
    }
}
