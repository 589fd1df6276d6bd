//! Application configuration loaded from environment variables and config files.
//!
//! Supports `.env` files for development and environment variables for production.
//! Config precedence: env vars > .env file > config.toml > defaults
//!
//! The loaded [`AppConfig`] is handed to the process entry point, which passes
//! the relevant sections down to each component.

use serde::Deserialize;

/// Default upper bound for a single vacation image (5 MiB).
pub const DEFAULT_MAX_IMAGE_BYTES: u64 = 5 * 1024 * 1024;

/// Load the configuration from defaults, `config.toml`, and the environment.
pub fn load() -> Result<AppConfig, config::ConfigError> {
    // Load .env file if present (development)
    let _ = dotenvy::dotenv();

    load_from(config::Environment::with_prefix("VOYAGE").separator("__").try_parsing(true))
}

/// Build the configuration with an explicit environment source.
pub fn load_from(env: config::Environment) -> Result<AppConfig, config::ConfigError> {
    config::Config::builder()
        // Defaults
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 8080)?
        .set_default("database.url", "sqlite://voyage.db?mode=rwc")?
        .set_default("database.max_connections", 20)?
        .set_default("database.min_connections", 1)?
        .set_default("database.busy_timeout_ms", 5000)?
        .set_default("auth.jwt_secret", "")?
        .set_default("storage.backend", "local")?
        .set_default("storage.data_dir", "./data/images")?
        .set_default("storage.public_base_url", "/api/v1/images")?
        .set_default("storage.endpoint", "")?
        .set_default("storage.bucket", "voyage")?
        .set_default("storage.access_key", "")?
        .set_default("storage.secret_key", "")?
        .set_default("storage.region", "us-east-1")?
        .set_default("limits.max_image_bytes", DEFAULT_MAX_IMAGE_BYTES)?
        .set_default("limits.default_page_size", 10)?
        .set_default("limits.max_page_size", 100)?
        // Optional config file
        .add_source(config::File::with_name("config").required(false))
        // Environment variables (VOYAGE__SERVER__PORT, VOYAGE__DATABASE__URL, etc.)
        .add_source(env)
        .build()?
        .try_deserialize()
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    pub limits: LimitsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// Connection URL: `postgres://…` or `sqlite://…`
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    /// How long a SQLite connection waits for the write lock before failing.
    pub busy_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// JWT verification secret (HS256)
    pub jwt_secret: String,
}

/// Where vacation images live.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Local,
    S3,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Local directory for image files (local backend).
    pub data_dir: String,
    /// Prefix used to build client-facing image URLs.
    pub public_base_url: String,
    /// S3 endpoint URL (e.g., http://localhost:9000 for MinIO).
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LimitsConfig {
    pub max_image_bytes: u64,
    pub default_page_size: u32,
    pub max_page_size: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> config::Environment {
        let source: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        config::Environment::with_prefix("VOYAGE")
            .separator("__")
            .try_parsing(true)
            .source(Some(source))
    }

    #[test]
    fn defaults_fill_every_section() {
        let cfg = load_from(env(&[])).unwrap();
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.storage.backend, StorageBackend::Local);
        assert_eq!(cfg.limits.max_image_bytes, DEFAULT_MAX_IMAGE_BYTES);
        assert_eq!(cfg.limits.default_page_size, 10);
        assert_eq!(cfg.database.busy_timeout_ms, 5000);
    }

    #[test]
    fn environment_overrides_defaults() {
        let cfg = load_from(env(&[
            ("VOYAGE__SERVER__PORT", "9090"),
            ("VOYAGE__STORAGE__BACKEND", "s3"),
            ("VOYAGE__AUTH__JWT_SECRET", "s3cr3t"),
        ]))
        .unwrap();
        assert_eq!(cfg.server.port, 9090);
        assert_eq!(cfg.storage.backend, StorageBackend::S3);
        assert_eq!(cfg.auth.jwt_secret, "s3cr3t");
    }
}
