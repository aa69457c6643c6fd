use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub getnet: GetnetConfig,
    #[serde(default)]
    pub callback: CallbackConfig,
    #[serde(default)]
    pub reconciliation: ReconciliationConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Public base URL of this gateway, used to build the
    /// notificationUrl sent to Getnet at session creation.
    pub base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Upstream provider credentials and endpoint. Injected into the Getnet
/// client at construction; business logic never reads ambient state.
#[derive(Debug, Deserialize, Clone)]
pub struct GetnetConfig {
    pub login: String,
    pub secret_key: String,
    pub base_url: String,
    #[serde(default = "default_session_expiration_minutes")]
    pub session_expiration_minutes: i64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CallbackConfig {
    /// Server-to-server secret mixed into each callback's secretHash.
    #[serde(default)]
    pub server_secret: String,
    #[serde(default = "default_callback_timeout_secs")]
    pub timeout_secs: u64,
    /// Maximum retry entries processed per sweep.
    #[serde(default = "default_batch_size")]
    pub batch_size: i64,
    /// Pause between attempts within one sweep.
    #[serde(default = "default_sweep_delay_ms")]
    pub sweep_delay_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReconciliationConfig {
    #[serde(default = "default_days_back")]
    pub default_days_back: i64,
    /// Pause between upstream status queries within one run.
    #[serde(default = "default_query_delay_ms")]
    pub query_delay_ms: u64,
}

fn default_session_expiration_minutes() -> i64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    15
}

fn default_callback_timeout_secs() -> u64 {
    10
}

fn default_batch_size() -> i64 {
    100
}

fn default_sweep_delay_ms() -> u64 {
    500
}

fn default_days_back() -> i64 {
    7
}

fn default_query_delay_ms() -> u64 {
    200
}

impl Default for CallbackConfig {
    fn default() -> Self {
        Self {
            server_secret: String::new(),
            timeout_secs: default_callback_timeout_secs(),
            batch_size: default_batch_size(),
            sweep_delay_ms: default_sweep_delay_ms(),
        }
    }
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            default_days_back: default_days_back(),
            query_delay_ms: default_query_delay_ms(),
        }
    }
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.base_url", "http://localhost:3000")?
            .set_default("database.url", "sqlite://getnet-gateway.db")?
            .set_default("database.max_connections", 10)?
            // Public test credentials for Getnet Chile
            .set_default("getnet.login", "7ffbb7bf1f7361b1200b2e8d74e1d76f")?
            .set_default("getnet.secret_key", "SnZP3D63n3I9dH9O")?
            .set_default("getnet.base_url", "https://checkout.test.getnet.cl")?
            // Add config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // Add environment variables (with GETNET__ prefix, double underscore separates levels)
            .add_source(Environment::with_prefix("GETNET").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
                base_url: "http://localhost:3000".to_string(),
            },
            database: DatabaseConfig {
                url: "sqlite://getnet-gateway.db".to_string(),
                max_connections: 10,
            },
            getnet: GetnetConfig {
                login: "7ffbb7bf1f7361b1200b2e8d74e1d76f".to_string(),
                secret_key: "SnZP3D63n3I9dH9O".to_string(),
                base_url: "https://checkout.test.getnet.cl".to_string(),
                session_expiration_minutes: default_session_expiration_minutes(),
                request_timeout_secs: default_request_timeout_secs(),
            },
            callback: CallbackConfig::default(),
            reconciliation: ReconciliationConfig::default(),
        }
    }
}
