use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub areas_path: PathBuf,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    /// API key for the optional NL-intent service; absent disables it.
    pub nl_api_key: Option<String>,
    pub nl_base_url: String,
    pub nl_model: String,
    pub nl_timeout_secs: u64,
    /// Whether a bare "before X" time phrase is read as a closing-time query.
    pub bare_before_is_closing: bool,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("areas_path", &self.areas_path)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("nl_api_key", &self.nl_api_key.as_ref().map(|_| "[redacted]"))
            .field("nl_base_url", &self.nl_base_url)
            .field("nl_model", &self.nl_model)
            .field("nl_timeout_secs", &self.nl_timeout_secs)
            .field("bare_before_is_closing", &self.bare_before_is_closing)
            .finish()
    }
}
