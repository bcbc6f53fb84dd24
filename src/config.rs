//! Application configuration
//!
//! Settings are layered: built-in defaults, then `config/default.toml`,
//! then `config/{HMIS_ENV}.toml`, then `HMIS__*` environment variables.

use serde::Deserialize;

const MIN_JWT_SECRET_LEN: usize = 32;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    /// How long a writer waits for the SQLite write lock
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_minutes: i64,
    pub bootstrap_admin_username: String,
    pub bootstrap_admin_password: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
}

impl Config {
    /// Reject settings the server cannot run safely with
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.auth.jwt_secret.len() < MIN_JWT_SECRET_LEN {
            return Err(config::ConfigError::Message(format!(
                "auth.jwt_secret must be at least {} bytes",
                MIN_JWT_SECRET_LEN
            )));
        }
        if self.auth.token_ttl_minutes <= 0 {
            return Err(config::ConfigError::Message(
                "auth.token_ttl_minutes must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Configuration used by tests: in-memory database, fixed secret
    pub fn for_tests() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".into(),
                port: 0,
                cors_origins: Vec::new(),
            },
            database: DatabaseConfig {
                url: "sqlite::memory:".into(),
                max_connections: 1,
                busy_timeout_ms: default_busy_timeout_ms(),
            },
            auth: AuthConfig {
                jwt_secret: "test-secret-test-secret-test-secret!".into(),
                token_ttl_minutes: 60,
                bootstrap_admin_username: "admin".into(),
                bootstrap_admin_password: Some("admin-password".into()),
            },
            log: LogConfig {
                level: "debug".into(),
                json: false,
            },
        }
    }
}

/// Load configuration from defaults, files and the environment
pub fn load_config() -> Result<Config, config::ConfigError> {
    let env = std::env::var("HMIS_ENV").unwrap_or_else(|_| "development".into());

    let settings = config::Config::builder()
        .set_default("server.host", "127.0.0.1")?
        .set_default("server.port", 8080)?
        .set_default("database.url", "sqlite://hmis.db?mode=rwc")?
        .set_default("database.max_connections", 5)?
        .set_default("database.busy_timeout_ms", 5_000)?
        .set_default("auth.token_ttl_minutes", 480)?
        .set_default("auth.bootstrap_admin_username", "admin")?
        .set_default("log.level", "info")?
        .set_default("log.json", false)?
        // Start with default settings
        .add_source(config::File::with_name("config/default").required(false))
        // Override with environment-specific settings
        .add_source(config::File::with_name(&format!("config/{}", env)).required(false))
        // Override with environment variables, e.g. HMIS__DATABASE__URL
        .add_source(config::Environment::with_prefix("HMIS").separator("__"))
        .build()?;

    let config: Config = settings.try_deserialize()?;
    config.validate()?;
    Ok(config)
}
