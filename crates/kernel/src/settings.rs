use std::path::PathBuf;

use anyhow::{anyhow, bail, Context};
use serde::Deserialize;

const DEFAULT_ENV: &str = "local";
const ENV_VAR_NAME: &str = "BIBLIO_ENV";
const CONFIG_DIR_ENV: &str = "BIBLIO_CONFIG_DIR";

const INSECURE_SECRET_KEY: &str = "insecure-dev-secret-key";
const INSECURE_PASSWORD_SALT: &str = "insecure-dev-password-salt";

/// Longest accepted session lifetime: ten years.
pub const MAX_SESSION_TTL_HOURS: u64 = 24 * 365 * 10;

/// Deployment environment the application is running in.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Local,
    Staging,
    Production,
}

/// Top-level configuration structure loaded from layered sources.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
    #[serde(default)]
    pub auth: AuthSettings,
}

impl Settings {
    /// Load configuration by layering `.env`, base file, environment overlay and
    /// environment variables. Call [`Settings::validate`] once logging is up.
    pub fn load() -> anyhow::Result<Self> {
        // Allow missing `.env` files without failing.
        let _ = dotenvy::dotenv();

        let environment = std::env::var(ENV_VAR_NAME).unwrap_or_else(|_| DEFAULT_ENV.to_string());
        let config_dir = match std::env::var(CONFIG_DIR_ENV) {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => std::env::current_dir()
                .with_context(|| "unable to resolve current directory")?
                .join("config"),
        };

        let base_path = config_dir.join("base.toml");
        let environment_path = config_dir.join(format!("{}.toml", environment));

        let builder = config::Config::builder()
            .add_source(config::File::from(base_path).required(false))
            .add_source(config::File::from(environment_path).required(false))
            .add_source(
                config::Environment::with_prefix("BIBLIO")
                    .prefix_separator("_")
                    .separator("__"),
            );

        let cfg = builder
            .build()
            .with_context(|| "failed to build configuration")?;

        let mut settings: Settings = cfg
            .try_deserialize()
            .with_context(|| "failed to deserialize configuration")?;

        // Override environment field with parsed enum variant.
        settings.environment = match environment.as_str() {
            "local" => Environment::Local,
            "staging" => Environment::Staging,
            "production" => Environment::Production,
            other => {
                return Err(anyhow!(
                    "unsupported environment '{}'; expected local/staging/production",
                    other
                ));
            }
        };

        settings.apply_overrides(|key| std::env::var(key).ok());

        Ok(settings)
    }

    /// Apply the conventional unprefixed variables (`DATABASE_URL`, `SECRET_KEY`,
    /// `SECURITY_PASSWORD_SALT`). They take precedence over every other layer.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(secret) = lookup("SECRET_KEY") {
            self.auth.secret_key = secret;
        }
        if let Some(salt) = lookup("SECURITY_PASSWORD_SALT") {
            self.auth.password_salt = salt;
        }
    }

    /// Names of security-sensitive settings still holding their development defaults.
    pub fn insecure_defaults(&self) -> Vec<&'static str> {
        let mut insecure = Vec::new();
        if self.auth.secret_key == INSECURE_SECRET_KEY {
            insecure.push("auth.secret_key");
        }
        if self.auth.password_salt.is_empty() || self.auth.password_salt == INSECURE_PASSWORD_SALT {
            insecure.push("auth.password_salt");
        }
        insecure
    }

    /// Reject configurations that must not run. Development defaults are only
    /// a warning outside production.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.auth.secret_key.is_empty() {
            bail!("auth.secret_key must not be empty");
        }
        if self.auth.session_ttl_hours == 0 {
            bail!("auth.session_ttl_hours must be positive");
        }
        if self.auth.session_ttl_hours > MAX_SESSION_TTL_HOURS {
            bail!(
                "auth.session_ttl_hours must be at most {} (ten years)",
                MAX_SESSION_TTL_HOURS
            );
        }

        let insecure = self.insecure_defaults();
        if insecure.is_empty() {
            return Ok(());
        }
        if self.environment == Environment::Production {
            bail!(
                "refusing to start in production with development defaults for {:?}",
                insecure
            );
        }
        tracing::warn!(
            settings = ?insecure,
            "using insecure development defaults; override them before deploying"
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "ServerSettings::default_host")]
    pub host: String,
    #[serde(default = "ServerSettings::default_port")]
    pub port: u16,
    #[serde(default = "ServerSettings::default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl ServerSettings {
    fn default_host() -> String {
        "0.0.0.0".to_string()
    }

    fn default_port() -> u16 {
        5000
    }

    fn default_request_timeout_ms() -> u64 {
        15000
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            request_timeout_ms: Self::default_request_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "DatabaseSettings::default_url")]
    pub url: String,
    #[serde(default = "DatabaseSettings::default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "DatabaseSettings::default_acquire_timeout_ms")]
    pub acquire_timeout_ms: u64,
}

impl DatabaseSettings {
    fn default_url() -> String {
        "sqlite://biblioteka.db?mode=rwc".to_string()
    }

    fn default_max_connections() -> u32 {
        5
    }

    fn default_acquire_timeout_ms() -> u64 {
        3000
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: Self::default_url(),
            max_connections: Self::default_max_connections(),
            acquire_timeout_ms: Self::default_acquire_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelemetrySettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "TelemetrySettings::default_filter")]
    pub filter: String,
    #[serde(default)]
    pub log_format: LogFormat,
}

impl TelemetrySettings {
    fn default_filter() -> String {
        "info,sqlx=warn".to_string()
    }
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            filter: Self::default_filter(),
            log_format: LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    /// Signs session tokens.
    #[serde(default = "AuthSettings::default_secret_key")]
    pub secret_key: String,
    /// Keys every password hash; changing it invalidates all stored passwords.
    #[serde(default = "AuthSettings::default_password_salt")]
    pub password_salt: String,
    #[serde(default = "AuthSettings::default_session_cookie")]
    pub session_cookie: String,
    #[serde(default = "AuthSettings::default_session_ttl_hours")]
    pub session_ttl_hours: u64,
    #[serde(default)]
    pub secure_cookie: bool,
    #[serde(default = "AuthSettings::default_registerable")]
    pub registerable: bool,
    #[serde(default = "AuthSettings::default_password_min_length")]
    pub password_min_length: usize,
}

impl AuthSettings {
    fn default_secret_key() -> String {
        INSECURE_SECRET_KEY.to_string()
    }

    fn default_password_salt() -> String {
        INSECURE_PASSWORD_SALT.to_string()
    }

    fn default_session_cookie() -> String {
        "session".to_string()
    }

    fn default_session_ttl_hours() -> u64 {
        24 * 31
    }

    fn default_registerable() -> bool {
        true
    }

    fn default_password_min_length() -> usize {
        8
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            secret_key: Self::default_secret_key(),
            password_salt: Self::default_password_salt(),
            session_cookie: Self::default_session_cookie(),
            session_ttl_hours: Self::default_session_ttl_hours(),
            secure_cookie: false,
            registerable: Self::default_registerable(),
            password_min_length: Self::default_password_min_length(),
        }
    }
}
