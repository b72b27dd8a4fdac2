use anyhow::{anyhow, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure for the permits service
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct PermitsConfig {
    /// HTTP listener settings
    pub server: ServerConfig,
    /// Database settings
    pub database: DatabaseConfig,
    /// Token signing settings
    pub auth: AuthConfig,
    /// Uploaded document storage
    pub storage: StorageConfig,
    /// Logging settings
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origin for the frontend. `None` allows any origin.
    pub cors_origin: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database URL (SQLite file path or connection string)
    pub url: String,
    /// Maximum connections in pool
    pub max_connections: u32,
    /// Enable automatic migrations
    pub auto_migrate: bool,
    /// How long a writer waits for the lock before failing
    pub busy_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC secret for issued tokens. Required to serve.
    pub jwt_secret: Option<String>,
    /// Token lifetime
    pub token_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding uploaded documents
    pub upload_dir: String,
    /// Largest accepted document, in bytes
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level used when RUST_LOG is unset
    pub log_level: String,
    /// Emit JSON lines instead of human-readable logs
    pub json_logs: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            cors_origin: None,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://permits.db".to_string(),
            max_connections: 5,
            auto_migrate: true,
            busy_timeout_secs: 5,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            token_ttl_minutes: 8 * 60, // one working day
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: "uploads".to_string(),
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: true,
        }
    }
}

impl PermitsConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration file (permits.toml)
    /// 3. Environment variables (PERMITS_SECTION__KEY)
    pub fn load() -> Result<Self> {
        let mut builder = Config::builder();

        if Path::new("permits.toml").exists() {
            builder = builder.add_source(File::with_name("permits"));
        }

        builder = builder.add_source(
            Environment::with_prefix("PERMITS")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        let mut permits_config: PermitsConfig = config.try_deserialize()?;

        // Conventional variable name used by deployment scripts
        if permits_config.auth.jwt_secret.is_none() {
            if let Ok(secret) = std::env::var("JWT_SECRET") {
                permits_config.auth.jwt_secret = Some(secret);
            }
        }

        Ok(permits_config)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }

    pub fn jwt_secret(&self) -> Result<&str> {
        self.auth
            .jwt_secret
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow!("auth.jwt_secret is not set (PERMITS_AUTH__JWT_SECRET or JWT_SECRET)"))
    }
}

/// Global configuration instance
static CONFIG: std::sync::LazyLock<Result<PermitsConfig, anyhow::Error>> =
    std::sync::LazyLock::new(|| {
        // Load .env file first
        let _ = PermitsConfig::load_env_file();
        PermitsConfig::load()
    });

/// Get the global configuration
pub fn config() -> Result<&'static PermitsConfig> {
    CONFIG
        .as_ref()
        .map_err(|e| anyhow!("Failed to load configuration: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PermitsConfig::default();
        assert_eq!(config.server.port, 3000);
        assert!(config.database.auto_migrate);
        assert_eq!(config.auth.token_ttl_minutes, 480);
        assert!(config.jwt_secret().is_err());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let parsed: PermitsConfig = toml::from_str(
            r#"
            [server]
            port = 8080

            [auth]
            jwt_secret = "s3cret"
            "#,
        )
        .unwrap();
        assert_eq!(parsed.server.port, 8080);
        assert_eq!(parsed.server.host, "0.0.0.0");
        assert_eq!(parsed.jwt_secret().unwrap(), "s3cret");
        assert_eq!(parsed.storage.upload_dir, "uploads");
    }

    #[test]
    fn test_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("permits.toml");
        let mut config = PermitsConfig::default();
        config.database.max_connections = 12;
        config.save_to_file(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let loaded: PermitsConfig = toml::from_str(&text).unwrap();
        assert_eq!(loaded.database.max_connections, 12);
    }
}
