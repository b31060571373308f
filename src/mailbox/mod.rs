//! Mailbox provider abstraction — pure I/O, no triage logic.
//!
//! `Mailbox` is the seam between the pipeline and the remote mail
//! service: list/get messages, list/create labels, mutate label state.
//! The production implementation is [`gmail::GmailMailbox`]; tests
//! substitute an in-memory fake.

pub mod auth;
pub mod gmail;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::MailboxError;

/// Subject used when a message carries no `Subject` header.
pub const DEFAULT_SUBJECT: &str = "No Subject";

/// Body placeholder used when a message carries no snippet.
pub const DEFAULT_BODY: &str = "No content available";

/// Provider-side marker for unread messages.
pub const UNREAD_LABEL: &str = "UNREAD";

// ── Wire types ──────────────────────────────────────────────────────

/// A full message as returned by the provider's get-message call.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Opaque provider-assigned identifier.
    pub id: String,
    /// Short plain-text preview of the body.
    #[serde(default)]
    pub snippet: Option<String>,
    /// MIME envelope; only the headers are of interest here.
    #[serde(default)]
    pub payload: Option<MessagePayload>,
}

/// Payload section of a message — headers only.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessagePayload {
    #[serde(default)]
    pub headers: Vec<Header>,
}

/// A single message header.
#[derive(Debug, Clone, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

impl Message {
    /// Subject line, or [`DEFAULT_SUBJECT`] when the header is absent.
    pub fn subject(&self) -> &str {
        self.payload
            .as_ref()
            .and_then(|p| {
                p.headers
                    .iter()
                    .find(|h| h.name.eq_ignore_ascii_case("Subject"))
            })
            .map(|h| h.value.as_str())
            .unwrap_or(DEFAULT_SUBJECT)
    }

    /// Snippet text, or [`DEFAULT_BODY`] when absent or empty.
    pub fn body(&self) -> &str {
        self.snippet
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_BODY)
    }
}

/// A mailbox label.
#[derive(Debug, Clone, Deserialize)]
pub struct Label {
    pub id: String,
    pub name: String,
}

/// Mailbox profile summary, used by the status endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub email_address: String,
    #[serde(default)]
    pub messages_total: u64,
}

// ── Provider trait ──────────────────────────────────────────────────

/// Operations the triage pipeline needs from the mail provider.
#[async_trait]
pub trait Mailbox: Send + Sync {
    /// List identifiers of messages matching a provider query string.
    async fn list_message_ids(&self, query: &str) -> Result<Vec<String>, MailboxError>;

    /// Fetch the full message for an identifier.
    async fn get_message(&self, id: &str) -> Result<Message, MailboxError>;

    /// List all labels in the mailbox.
    async fn list_labels(&self) -> Result<Vec<Label>, MailboxError>;

    /// Create a label with the given name.
    ///
    /// Returns `MailboxError::Conflict` if a label with that name
    /// already exists.
    async fn create_label(&self, name: &str) -> Result<Label, MailboxError>;

    /// Add and remove labels on a message in one call.
    async fn modify_message(
        &self,
        id: &str,
        add: &[String],
        remove: &[String],
    ) -> Result<(), MailboxError>;

    /// Fetch the mailbox profile (address, message count).
    async fn get_profile(&self) -> Result<Profile, MailboxError>;
}
