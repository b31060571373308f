//! Configuration types.
//!
//! Everything the service needs is read once at startup into an explicit
//! `Config` — no module reads the environment after boot. Secrets live in
//! `SecretString` so they never show up in debug output.

use secrecy::SecretString;

use crate::classify::gemini::DEFAULT_MODEL;
use crate::error::ConfigError;

/// Default name of the label applied to hidden messages.
pub const DEFAULT_IGNORED_LABEL: &str = "mailsweep";

/// Default recency window for the unread-message query, in hours.
pub const DEFAULT_LOOKBACK_HOURS: i64 = 24;

/// Service configuration, built from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Google OAuth client id.
    pub google_client_id: String,
    /// Google OAuth client secret.
    pub google_client_secret: SecretString,
    /// Long-lived refresh token obtained during offline setup.
    pub google_refresh_token: SecretString,
    /// Classifier API key. Required — the service refuses to start without it.
    pub classifier_api_key: SecretString,
    /// Classifier model identifier.
    pub classifier_model: String,
    /// Override for the classifier endpoint base URL (tests point this at a fake).
    pub classifier_base_url: Option<String>,
    /// Override for the classification system prompt.
    pub system_prompt: Option<String>,
    /// Shared secret the scheduler must present as a bearer token.
    pub cron_secret: SecretString,
    /// Name of the ignored label.
    pub ignored_label: String,
    /// How far back the unread query reaches, in hours.
    pub lookback_hours: i64,
    /// Address the HTTP server binds to.
    pub bind_addr: String,
}

impl Config {
    /// Build config from environment variables.
    ///
    /// Fails fast on any missing credential so no provider call is ever
    /// attempted with a partial configuration.
    pub fn from_env() -> Result<Self, ConfigError> {
        let port: u16 = match std::env::var("MAILSWEEP_PORT") {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: "MAILSWEEP_PORT".into(),
                message: format!("not a valid port: {raw}"),
            })?,
            Err(_) => 8080,
        };

        let lookback_hours: i64 = match std::env::var("MAILSWEEP_LOOKBACK_HOURS") {
            Ok(raw) => {
                let hours = raw.parse().map_err(|_| ConfigError::InvalidValue {
                    key: "MAILSWEEP_LOOKBACK_HOURS".into(),
                    message: format!("not a number: {raw}"),
                })?;
                if hours <= 0 {
                    return Err(ConfigError::InvalidValue {
                        key: "MAILSWEEP_LOOKBACK_HOURS".into(),
                        message: "must be positive".into(),
                    });
                }
                hours
            }
            Err(_) => DEFAULT_LOOKBACK_HOURS,
        };

        Ok(Self {
            google_client_id: required("GOOGLE_CLIENT_ID")?,
            google_client_secret: required_secret("GOOGLE_CLIENT_SECRET")?,
            google_refresh_token: required_secret("GOOGLE_REFRESH_TOKEN")?,
            classifier_api_key: required_secret("GEMINI_API_KEY")?,
            classifier_model: std::env::var("MAILSWEEP_MODEL")
                .unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            classifier_base_url: std::env::var("MAILSWEEP_CLASSIFIER_URL").ok(),
            system_prompt: std::env::var("MAILSWEEP_SYSTEM_PROMPT").ok(),
            cron_secret: required_secret("CRON_SECRET")?,
            ignored_label: std::env::var("MAILSWEEP_LABEL")
                .unwrap_or_else(|_| DEFAULT_IGNORED_LABEL.to_string()),
            lookback_hours,
            bind_addr: format!("0.0.0.0:{port}"),
        })
    }
}

fn required(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

fn required_secret(key: &str) -> Result<SecretString, ConfigError> {
    required(key).map(SecretString::from)
}
