//! Gmail REST implementation of the [`Mailbox`] trait.

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::SecretString;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::error::MailboxError;
use crate::mailbox::auth::TokenProvider;
use crate::mailbox::{Label, Mailbox, Message, Profile};

/// Gmail API base for the authenticated user.
const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1/users/me";

#[derive(Debug, Deserialize)]
struct ListMessagesResponse {
    #[serde(default)]
    messages: Vec<MessageRef>,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ListLabelsResponse {
    #[serde(default)]
    labels: Vec<Label>,
}

/// Gmail mailbox client. Token refresh happens transparently on each
/// call through the shared [`TokenProvider`].
pub struct GmailMailbox {
    client: reqwest::Client,
    tokens: TokenProvider,
    base_url: String,
}

impl GmailMailbox {
    pub fn new(
        client_id: String,
        client_secret: SecretString,
        refresh_token: SecretString,
    ) -> Self {
        let client = reqwest::Client::new();
        let tokens = TokenProvider::new(
            client.clone(),
            client_id,
            client_secret,
            refresh_token,
        );
        Self {
            client,
            tokens,
            base_url: GMAIL_API_BASE.to_string(),
        }
    }

    /// Construct against a custom API base (for tests).
    pub fn with_base_url(
        client: reqwest::Client,
        tokens: TokenProvider,
        base_url: &str,
    ) -> Self {
        Self {
            client,
            tokens,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, MailboxError> {
        let token = self.tokens.access_token().await?;
        let resp = self
            .client
            .get(format!("{}{path}", self.base_url))
            .bearer_auth(token)
            .query(query)
            .send()
            .await?;
        read_json(resp).await
    }

    async fn post_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T, MailboxError> {
        let token = self.tokens.access_token().await?;
        let resp = self
            .client
            .post(format!("{}{path}", self.base_url))
            .bearer_auth(token)
            .json(body)
            .send()
            .await?;
        read_json(resp).await
    }
}

/// Decode a provider response, mapping non-2xx statuses to errors.
/// 409 becomes `Conflict` so label creation can recover.
async fn read_json<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, MailboxError> {
    let status = resp.status();
    if status == StatusCode::CONFLICT {
        return Err(MailboxError::Conflict);
    }
    let body = resp.text().await?;
    if !status.is_success() {
        return Err(MailboxError::Api {
            status: status.as_u16(),
            body,
        });
    }
    Ok(serde_json::from_str(&body)?)
}

#[async_trait]
impl Mailbox for GmailMailbox {
    async fn list_message_ids(&self, query: &str) -> Result<Vec<String>, MailboxError> {
        debug!(query, "Listing messages");
        let list: ListMessagesResponse = self.get_json("/messages", &[("q", query)]).await?;
        Ok(list.messages.into_iter().map(|m| m.id).collect())
    }

    async fn get_message(&self, id: &str) -> Result<Message, MailboxError> {
        self.get_json(&format!("/messages/{id}"), &[("format", "full")])
            .await
    }

    async fn list_labels(&self) -> Result<Vec<Label>, MailboxError> {
        let list: ListLabelsResponse = self.get_json("/labels", &[]).await?;
        Ok(list.labels)
    }

    async fn create_label(&self, name: &str) -> Result<Label, MailboxError> {
        self.post_json(
            "/labels",
            &json!({
                "name": name,
                "labelListVisibility": "labelShow",
                "messageListVisibility": "show",
            }),
        )
        .await
    }

    async fn modify_message(
        &self,
        id: &str,
        add: &[String],
        remove: &[String],
    ) -> Result<(), MailboxError> {
        let _: serde_json::Value = self
            .post_json(
                &format!("/messages/{id}/modify"),
                &json!({
                    "addLabelIds": add,
                    "removeLabelIds": remove,
                }),
            )
            .await?;
        debug!(id, "Modified message labels");
        Ok(())
    }

    async fn get_profile(&self) -> Result<Profile, MailboxError> {
        self.get_json("/profile", &[]).await
    }
}
