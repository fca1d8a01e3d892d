use config::ConfigError;

use crate::error::ConfigError as InvalidConfig;

const DEFAULT_ACCESS_TOKEN_EXPIRY: i64 = 15 * 60;
const DEFAULT_REFRESH_TOKEN_EXPIRY: i64 = 30 * 24 * 60 * 60;

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    pub jwt: JwtSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub environment: Environment,
    #[serde(default = "default_client_url")]
    pub client_url: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_client_url() -> String {
    "http://localhost:3000".to_string()
}

impl ApplicationSettings {
    /// The client origin must be an explicit http(s) origin; wildcards and
    /// `null` cannot be combined with credentialed CORS.
    pub fn validate(&self) -> Result<(), InvalidConfig> {
        let origin = self.client_url.trim();
        if origin.is_empty() {
            return Err(InvalidConfig::MissingRequired(
                "application.client_url".to_string(),
            ));
        }
        if !(origin.starts_with("http://") || origin.starts_with("https://")) {
            return Err(InvalidConfig::InvalidValue(format!(
                "application.client_url must be an http(s) origin, got {}",
                origin
            )));
        }
        Ok(())
    }
}

/// Deployment environment; production turns on the `Secure` cookie flag
#[derive(serde::Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Local,
    Production,
}

impl Environment {
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name
        )
    }
}

/// Token signing settings
///
/// Access and refresh tokens are signed with separate secrets so that a
/// leaked key for one class cannot forge the other.
#[derive(serde::Deserialize, Clone)]
pub struct JwtSettings {
    pub access_secret: String,
    pub refresh_secret: String,
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry: i64, // seconds
    #[serde(default = "default_refresh_token_expiry")]
    pub refresh_token_expiry: i64, // seconds
}

fn default_access_token_expiry() -> i64 {
    DEFAULT_ACCESS_TOKEN_EXPIRY
}

fn default_refresh_token_expiry() -> i64 {
    DEFAULT_REFRESH_TOKEN_EXPIRY
}

impl JwtSettings {
    /// Settings with the standard 15 minute / 30 day lifetimes
    pub fn new(access_secret: impl Into<String>, refresh_secret: impl Into<String>) -> Self {
        Self {
            access_secret: access_secret.into(),
            refresh_secret: refresh_secret.into(),
            access_token_expiry: DEFAULT_ACCESS_TOKEN_EXPIRY,
            refresh_token_expiry: DEFAULT_REFRESH_TOKEN_EXPIRY,
        }
    }

    /// Reject settings the token codec cannot work with safely
    pub fn validate(&self) -> Result<(), InvalidConfig> {
        if self.access_secret.is_empty() {
            return Err(InvalidConfig::MissingRequired("jwt.access_secret".to_string()));
        }
        if self.refresh_secret.is_empty() {
            return Err(InvalidConfig::MissingRequired("jwt.refresh_secret".to_string()));
        }
        if self.access_secret == self.refresh_secret {
            return Err(InvalidConfig::InvalidValue(
                "jwt.access_secret and jwt.refresh_secret must differ".to_string(),
            ));
        }
        if self.access_token_expiry <= 0 || self.refresh_token_expiry <= 0 {
            return Err(InvalidConfig::InvalidValue(
                "token expiry must be a positive number of seconds".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load settings from `configuration.yaml` (optional) and `APP_*` env vars.
///
/// Nested keys use `__`, e.g. `APP_JWT__ACCESS_SECRET`.
pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;
    settings.try_deserialize::<Settings>()
}
