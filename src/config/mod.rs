use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;

/// Values that have shipped as sample secrets and must never reach production.
const PLACEHOLDER_SECRETS: [&str; 4] = ["mock_api_key", "mock_webhook_secret", "changeme", "secret"];
const MIN_SECRET_LEN: usize = 16;

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub payments: PaymentsConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub withdrawals: WithdrawalConfig,
}

impl ApiConfig {
    pub fn load() -> Result<Self> {
        let configured_path =
            std::env::var("NGO_LEDGER_CONFIG").unwrap_or_else(|_| "config/api.toml".to_string());
        assert!(
            !configured_path.is_empty(),
            "Configuration path must be non-empty"
        );
        assert!(
            configured_path.len() < 4096,
            "Configuration path length exceeds hard limit"
        );

        let mut builder = Config::builder()
            .add_source(File::new(&configured_path, FileFormat::Toml).required(true));

        if let Ok(env_override) = std::env::var("NGO_LEDGER_ENV") {
            if !env_override.is_empty() {
                let env_file = format!("config/api.{}.toml", env_override);
                if Path::new(&env_file).exists() {
                    builder = builder.add_source(File::new(&env_file, FileFormat::Toml));
                }
            }
        }

        // Secrets are expected to arrive this way, e.g. NGO_LEDGER__PAYMENTS__WEBHOOK_SECRET
        builder = builder.add_source(Environment::with_prefix("NGO_LEDGER").separator("__"));

        let settings = builder
            .build()
            .map_err(|err| map_config_error(err, &configured_path))?;
        let mut config: Self = settings
            .try_deserialize()
            .context("Failed to deserialize API configuration")?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&mut self) -> Result<()> {
        assert!(
            !self.database.url.is_empty(),
            "Database URL must be specified"
        );
        assert!(
            self.server.port > 0,
            "Server port must be greater than zero"
        );
        assert!(
            self.database.max_connections >= self.database.min_connections.unwrap_or(1),
            "Max connections must be >= min connections"
        );
        self.payments.ensure_secrets()?;
        self.auth.ensure_bounds()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: Option<IpAddr>,
    pub port: u16,
}

impl ServerConfig {
    pub fn address(&self) -> SocketAddr {
        let host = self.host.unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert!(self.port != 0, "HTTP port cannot be zero");
        SocketAddr::new(host, self.port)
    }
}

#[derive(Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: Option<u32>,
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &redact_url_credentials(&self.url))
            .field("max_connections", &self.max_connections)
            .field("min_connections", &self.min_connections)
            .finish()
    }
}

/// Replaces the userinfo part of a connection URL.
fn redact_url_credentials(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let authority_end = rest.find('/').unwrap_or(rest.len());
    match rest[..authority_end].rfind('@') {
        Some(at) => format!("{scheme}://<redacted>{}", &rest[at..]),
        None => url.to_string(),
    }
}

#[derive(Clone, Deserialize)]
pub struct PaymentsConfig {
    pub api_url: String,
    pub api_key: String,
    pub webhook_secret: String,
    #[serde(default = "PaymentsConfig::default_api_version")]
    pub api_version: String,
    pub request_timeout_ms: Option<u64>,
}

impl PaymentsConfig {
    pub fn request_timeout(&self) -> Duration {
        let millis = self.request_timeout_ms.unwrap_or(10_000);
        assert!(millis >= 100, "Payment timeout must be at least 100ms");
        assert!(millis <= 60_000, "Payment timeout cannot exceed 60 seconds");
        Duration::from_millis(millis)
    }

    fn ensure_secrets(&self) -> Result<()> {
        ensure!(!self.api_url.is_empty(), "payments.api_url must be set");
        if let Some(millis) = self.request_timeout_ms {
            ensure!(
                (100..=60_000).contains(&millis),
                "payments.request_timeout_ms must be between 100 and 60000"
            );
        }
        check_secret("payments.api_key", &self.api_key)?;
        check_secret("payments.webhook_secret", &self.webhook_secret)?;
        Ok(())
    }

    fn default_api_version() -> String {
        "2018-03-22".to_string()
    }
}

// Secrets are redacted.
impl std::fmt::Debug for PaymentsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentsConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &"<redacted>")
            .field("webhook_secret", &"<redacted>")
            .field("api_version", &self.api_version)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .finish()
    }
}

#[derive(Clone, Deserialize)]
pub struct AuthConfig {
    pub session_ttl_seconds: u64,
    pub session_max_capacity: u64,
    pub password_pepper: Option<String>,
}

impl AuthConfig {
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_seconds)
    }

    fn ensure_bounds(&self) -> Result<()> {
        assert!(
            self.session_ttl_seconds >= 60,
            "Session TTL must be at least one minute"
        );
        assert!(
            self.session_ttl_seconds <= 604_800,
            "Session TTL cannot exceed one week"
        );
        assert!(
            self.session_max_capacity >= 100,
            "Session capacity must be at least 100"
        );
        if let Some(pepper) = &self.password_pepper {
            ensure!(!pepper.is_empty(), "auth.password_pepper must not be empty when set");
        }
        Ok(())
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("session_ttl_seconds", &self.session_ttl_seconds)
            .field("session_max_capacity", &self.session_max_capacity)
            .field("password_pepper", &self.password_pepper.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WithdrawalConfig {
    #[serde(default = "WithdrawalConfig::default_enforce_balance")]
    pub enforce_balance: bool,
}

impl WithdrawalConfig {
    const fn default_enforce_balance() -> bool {
        true
    }
}

impl Default for WithdrawalConfig {
    fn default() -> Self {
        Self {
            enforce_balance: Self::default_enforce_balance(),
        }
    }
}

fn check_secret(name: &str, value: &str) -> Result<()> {
    let trimmed = value.trim();
    ensure!(!trimmed.is_empty(), "{name} must be configured");
    ensure!(
        trimmed.len() >= MIN_SECRET_LEN,
        "{name} must be at least {MIN_SECRET_LEN} bytes"
    );
    ensure!(
        !PLACEHOLDER_SECRETS.contains(&trimmed),
        "{name} is set to a placeholder value"
    );
    Ok(())
}

fn map_config_error(err: ConfigError, path: &str) -> ConfigError {
    match err {
        ConfigError::NotFound(_) => ConfigError::NotFound(path.to_string()),
        other => other,
    }
}
