use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub state: StateConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub ranking: RankingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Origins allowed to call the API with credentials. Empty means a
    /// permissive CORS policy without credentials (local development).
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            allowed_origins: Vec::new(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    3000
}

#[derive(Debug, Deserialize, Clone)]
pub struct StateConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

fn default_db_path() -> String {
    "intouch.db".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub access_token_secret: String,
    pub refresh_token_secret: String,
    #[serde(default = "default_access_token_ttl_mins")]
    pub access_token_ttl_mins: i64,
    #[serde(default = "default_refresh_token_ttl_days")]
    pub refresh_token_ttl_days: i64,
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,
}

fn default_access_token_ttl_mins() -> i64 {
    15
}
fn default_refresh_token_ttl_days() -> i64 {
    7
}
fn default_bcrypt_cost() -> u32 {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct RankingConfig {
    /// Rows per page of the ranked listing.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Cap on name-search results (search is not paginated).
    #[serde(default = "default_search_limit")]
    pub search_limit: u32,
    /// Days-since-contact at or below which a connection maps to the inner
    /// "recent" ring.
    #[serde(default = "default_recent_days")]
    pub recent_days: i64,
    /// Days-since-contact at or above which a connection maps to the outer
    /// "stale" ring.
    #[serde(default = "default_stale_days")]
    pub stale_days: i64,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            search_limit: default_search_limit(),
            recent_days: default_recent_days(),
            stale_days: default_stale_days(),
        }
    }
}

fn default_page_size() -> u32 {
    50
}
fn default_search_limit() -> u32 {
    50
}
fn default_recent_days() -> i64 {
    14
}
fn default_stale_days() -> i64 {
    45
}

impl AppConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        anyhow::ensure!(
            !config.auth.access_token_secret.is_empty()
                && !config.auth.refresh_token_secret.is_empty(),
            "auth.access_token_secret and auth.refresh_token_secret must be set"
        );
        Ok(config)
    }
}
