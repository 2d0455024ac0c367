use std::path::PathBuf;

use config::{Config, ConfigError, Environment, File};
use gateway::GatewayConfig;
use serde::Deserialize;

/// Default location of the optional config file, without extension.
const DEFAULT_CONFIG_FILE: &str = "config/portal";

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub max_age: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

/// Admin account created at startup when no user with that name exists.
#[derive(Debug, Deserialize, Clone)]
pub struct BootstrapAdmin {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Directory holding generated images.
    pub images_dir: PathBuf,
    pub max_image_bytes: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let file = std::env::var("PORTAL_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.into());
        let env = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.cors.allow_origins", Vec::<String>::new())?
            .set_default("server.cors.max_age", 3600)?
            .set_default("database.url", "sqlite://portal.db?mode=rwc")?
            .set_default("storage.images_dir", "./static/generated")?
            .set_default("storage.max_image_bytes", 20 * 1024 * 1024)?
            .add_source(File::with_name(&file).required(false))
            // e.g. PORTAL__AUTH__JWT_SECRET, PORTAL__GATEWAY__IMAGE_PROVIDER
            .add_source(Environment::with_prefix("PORTAL").separator("__"))
            .set_override_option("gateway.aws.access_key_id", env("AWS_ACCESS_KEY_ID"))?
            .set_override_option(
                "gateway.aws.secret_access_key",
                env("AWS_SECRET_ACCESS_KEY"),
            )?
            .set_override_option("gateway.aws.session_token", env("AWS_SESSION_TOKEN"))?
            .set_override_option("gateway.aws.region", env("AWS_REGION"))?
            .set_override_option("gateway.gemini.api_key", env("GEMINI_API_KEY"))?
            .build()?;

        s.try_deserialize()
    }
}
