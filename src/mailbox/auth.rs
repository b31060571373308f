//! OAuth2 access-token acquisition from a long-lived refresh token.
//!
//! The interactive consent flow that produces the refresh token is a
//! one-time offline step and lives outside this service. At runtime we
//! only ever exchange the refresh token for short-lived access tokens,
//! caching each one until shortly before it expires.

use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::MailboxError;

/// Google's OAuth2 token endpoint.
const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";

/// Refresh the access token this long before its actual expiry.
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at - Duration::seconds(EXPIRY_MARGIN_SECS)
    }
}

/// Exchanges the refresh token for access tokens and caches the result.
pub struct TokenProvider {
    client: reqwest::Client,
    endpoint: String,
    client_id: String,
    client_secret: SecretString,
    refresh_token: SecretString,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenProvider {
    pub fn new(
        client: reqwest::Client,
        client_id: String,
        client_secret: SecretString,
        refresh_token: SecretString,
    ) -> Self {
        Self::with_endpoint(client, client_id, client_secret, refresh_token, TOKEN_ENDPOINT)
    }

    /// Construct with a custom token endpoint (for tests).
    pub fn with_endpoint(
        client: reqwest::Client,
        client_id: String,
        client_secret: SecretString,
        refresh_token: SecretString,
        endpoint: &str,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.to_string(),
            client_id,
            client_secret,
            refresh_token,
            cached: Mutex::new(None),
        }
    }

    /// Return a valid access token, refreshing if the cached one is
    /// expired or missing.
    pub async fn access_token(&self) -> Result<String, MailboxError> {
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref() {
            if token.is_fresh(Utc::now()) {
                return Ok(token.access_token.clone());
            }
        }

        debug!("Access token missing or expired, refreshing");
        let token = self.refresh().await?;
        let access_token = token.access_token.clone();
        *cached = Some(token);
        Ok(access_token)
    }

    async fn refresh(&self) -> Result<CachedToken, MailboxError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.expose_secret()),
                ("refresh_token", self.refresh_token.expose_secret()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            let detail: serde_json::Value = serde_json::from_str(&body).unwrap_or_default();
            let reason = detail
                .get("error_description")
                .or_else(|| detail.get("error"))
                .and_then(|v| v.as_str())
                .unwrap_or("unknown error");
            return Err(MailboxError::TokenRefresh(format!("{status}: {reason}")));
        }

        let token: TokenResponse = serde_json::from_str(&body)?;
        Ok(CachedToken {
            access_token: token.access_token,
            expires_at: Utc::now() + Duration::seconds(token.expires_in),
        })
    }
}
