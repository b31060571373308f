//! The email-triage decision pipeline: fetch → classify → relabel.
//!
//! One [`TriagePipeline::run`] call per cron trigger. Three stages, no
//! state carried between invocations:
//!
//! 1. Resolve the ignored label (create once, look up thereafter).
//! 2. Fetch recent unread messages (concurrent detail fan-out).
//! 3. Classify each message and relabel the ones the user should not
//!    see — sequential and awaited, so every relabel completes before
//!    the response goes out.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use futures::future::try_join_all;
use serde::Serialize;
use tracing::{info, warn};

use crate::classify::{Classifier, Decision};
use crate::error::{FetchError, LabelError, MailboxError, Result};
use crate::mailbox::{Mailbox, Message, UNREAD_LABEL};

/// Triage tuning knobs, from [`crate::config::Config`].
#[derive(Debug, Clone)]
pub struct TriageSettings {
    /// Name of the label applied to hidden messages.
    pub ignored_label: String,
    /// How far back the unread query reaches.
    pub lookback_hours: i64,
}

/// Per-message verdict included in the invocation's response payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriageOutcome {
    pub should_see: bool,
    pub subject: String,
}

/// What one invocation did.
#[derive(Debug)]
pub struct TriageSummary {
    /// Verdicts for every message that produced a valid decision.
    pub outcomes: Vec<TriageOutcome>,
    /// How many messages were fetched (skipped ones included).
    pub fetched: usize,
}

/// The triage pipeline with its injected collaborators.
pub struct TriagePipeline {
    mailbox: Arc<dyn Mailbox>,
    classifier: Arc<dyn Classifier>,
    settings: TriageSettings,
}

impl TriagePipeline {
    pub fn new(
        mailbox: Arc<dyn Mailbox>,
        classifier: Arc<dyn Classifier>,
        settings: TriageSettings,
    ) -> Self {
        Self {
            mailbox,
            classifier,
            settings,
        }
    }

    /// The mailbox client, for callers outside the pipeline (status endpoint).
    pub fn mailbox(&self) -> &dyn Mailbox {
        self.mailbox.as_ref()
    }

    /// Run one full triage invocation.
    pub async fn run(&self) -> Result<TriageSummary> {
        let label_id = self.resolve_ignored_label().await?;
        let messages = self.fetch_recent_unread(&label_id).await?;
        let fetched = messages.len();
        info!(fetched, "Fetched recent unread messages");

        let mut outcomes = Vec::with_capacity(fetched);
        for message in &messages {
            match self
                .classifier
                .classify(message.subject(), message.body())
                .await?
            {
                Decision::ShouldSee(should_see) => {
                    if !should_see {
                        self.hide_message(&message.id, &label_id).await?;
                    }
                    outcomes.push(TriageOutcome {
                        should_see,
                        subject: message.subject().to_string(),
                    });
                }
                Decision::Indeterminate => {
                    // No verdict, no mutation, no result entry.
                    warn!(id = %message.id, "Skipping message: classifier gave no verdict");
                }
            }
        }

        Ok(TriageSummary { outcomes, fetched })
    }

    /// Ensure the ignored label exists and return its identifier.
    ///
    /// Creates the label on first run; on a conflict, looks the existing
    /// one up by name. Creates at most one label per mailbox, ever.
    pub async fn resolve_ignored_label(&self) -> std::result::Result<String, LabelError> {
        let name = &self.settings.ignored_label;
        match self.mailbox.create_label(name).await {
            Ok(label) => {
                info!(name, id = %label.id, "Created ignored label");
                Ok(label.id)
            }
            Err(MailboxError::Conflict) => {
                let labels = self.mailbox.list_labels().await.map_err(LabelError::List)?;
                labels
                    .into_iter()
                    .find(|l| &l.name == name)
                    .map(|l| l.id)
                    .ok_or_else(|| LabelError::NotFoundAfterConflict { name: name.clone() })
            }
            Err(source) => Err(LabelError::Create {
                name: name.clone(),
                source,
            }),
        }
    }

    /// List recent unread messages and fetch their full details
    /// concurrently. Any single failure aborts the whole batch.
    pub async fn fetch_recent_unread(
        &self,
        ignored_label_id: &str,
    ) -> std::result::Result<Vec<Message>, FetchError> {
        let after = Utc::now() - Duration::hours(self.settings.lookback_hours);
        let query = build_query(ignored_label_id, after);

        let ids = self
            .mailbox
            .list_message_ids(&query)
            .await
            .map_err(FetchError::List)?;

        let details = ids.iter().map(|id| async move {
            self.mailbox
                .get_message(id)
                .await
                .map_err(|source| FetchError::Detail {
                    id: id.clone(),
                    source,
                })
        });

        try_join_all(details).await
    }

    async fn hide_message(&self, id: &str, label_id: &str) -> std::result::Result<(), MailboxError> {
        self.mailbox
            .modify_message(id, &[label_id.to_string()], &[UNREAD_LABEL.to_string()])
            .await?;
        info!(id, "Marked message read and applied ignored label");
        Ok(())
    }
}

/// Build the provider query for recent unread messages: unread, not
/// already swept, in the inbox or flagged important, newer than `after`
/// (epoch seconds — the provider's expected unit).
fn build_query(ignored_label_id: &str, after: DateTime<Utc>) -> String {
    format!(
        "is:unread -label:{ignored_label_id} (in:inbox OR is:important) after:{}",
        after.timestamp()
    )
}
