//! 应用运行配置加载。

use std::env;

/// 配置加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required env: {0}")]
    Missing(String),
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
}

/// 应用运行配置。
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub http_addr: String,
    /// 为空时使用内存存储并写入演示数据。
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_access_ttl_seconds: u64,
    pub rebuild_max_retries: u64,
    pub rebuild_backoff_ms: u64,
    pub refresh_worker_enabled: bool,
}

impl AppConfig {
    /// 从环境变量读取配置。
    pub fn from_env() -> Result<Self, ConfigError> {
        let jwt_secret = read_optional("WARDEN_JWT_SECRET")
            .ok_or_else(|| ConfigError::Missing("WARDEN_JWT_SECRET".to_string()))?;
        let jwt_access_ttl_seconds = read_u64_with_default("WARDEN_JWT_ACCESS_TTL_SECONDS", 3600)?;
        let http_addr =
            env::var("WARDEN_HTTP_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
        let database_url = read_optional("WARDEN_DATABASE_URL");
        let rebuild_max_retries = read_u64_with_default("WARDEN_REBUILD_MAX_RETRIES", 2)?;
        let rebuild_backoff_ms = read_u64_with_default("WARDEN_REBUILD_BACKOFF_MS", 200)?;
        let refresh_worker_enabled = read_bool_with_default("WARDEN_REFRESH_WORKER", true);

        Ok(Self {
            http_addr,
            database_url,
            jwt_secret,
            jwt_access_ttl_seconds,
            rebuild_max_retries,
            rebuild_backoff_ms,
            refresh_worker_enabled,
        })
    }
}

fn read_u64_with_default(key: &str, default: u64) -> Result<u64, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u64>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_optional(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(value) if !value.is_empty() => Some(value),
        _ => None,
    }
}

fn read_bool_with_default(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(value) => matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "on"),
        Err(_) => default,
    }
}
