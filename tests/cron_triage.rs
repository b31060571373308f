//! Integration tests for the cron trigger endpoint.
//!
//! Each test spins up an Axum server on a random port with fake mailbox
//! and classifier clients, then exercises the real HTTP contract with
//! reqwest.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use secrecy::SecretString;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::time::timeout;

use mailsweep::classify::{Classifier, Decision};
use mailsweep::error::{ClassifyError, MailboxError};
use mailsweep::mailbox::{Header, Label, Mailbox, Message, MessagePayload, Profile, UNREAD_LABEL};
use mailsweep::pipeline::{TriagePipeline, TriageSettings};
use mailsweep::server::{AppState, CRON_HEADER, cron_routes};

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

const SECRET: &str = "test-cron-secret";

// ── Fakes ───────────────────────────────────────────────────────────

/// In-memory mailbox with a pre-existing ignored label.
struct FakeMailbox {
    messages: Vec<Message>,
    modify_calls: Mutex<Vec<(String, Vec<String>, Vec<String>)>>,
}

impl FakeMailbox {
    fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            modify_calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Mailbox for FakeMailbox {
    async fn list_message_ids(&self, _query: &str) -> Result<Vec<String>, MailboxError> {
        Ok(self.messages.iter().map(|m| m.id.clone()).collect())
    }

    async fn get_message(&self, id: &str) -> Result<Message, MailboxError> {
        self.messages
            .iter()
            .find(|m| m.id == id)
            .cloned()
            .ok_or(MailboxError::Api {
                status: 404,
                body: format!("no message {id}"),
            })
    }

    async fn list_labels(&self) -> Result<Vec<Label>, MailboxError> {
        Ok(vec![Label {
            id: "Label_sweep".into(),
            name: "mailsweep".into(),
        }])
    }

    async fn create_label(&self, _name: &str) -> Result<Label, MailboxError> {
        Err(MailboxError::Conflict)
    }

    async fn modify_message(
        &self,
        id: &str,
        add: &[String],
        remove: &[String],
    ) -> Result<(), MailboxError> {
        self.modify_calls
            .lock()
            .unwrap()
            .push((id.to_string(), add.to_vec(), remove.to_vec()));
        Ok(())
    }

    async fn get_profile(&self) -> Result<Profile, MailboxError> {
        Ok(Profile {
            email_address: "user@example.com".into(),
            messages_total: 1234,
        })
    }
}

/// Classifier scripted by subject line.
struct FakeClassifier {
    decisions: Vec<(String, Decision)>,
    fail: bool,
}

impl FakeClassifier {
    fn scripted(decisions: Vec<(&str, Decision)>) -> Self {
        Self {
            decisions: decisions
                .into_iter()
                .map(|(s, d)| (s.to_string(), d))
                .collect(),
            fail: false,
        }
    }

    fn failing() -> Self {
        Self {
            decisions: Vec::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl Classifier for FakeClassifier {
    async fn classify(&self, subject: &str, _body: &str) -> Result<Decision, ClassifyError> {
        if self.fail {
            return Err(ClassifyError::Api {
                status: 503,
                body: "model overloaded".into(),
            });
        }
        self.decisions
            .iter()
            .find(|(s, _)| s == subject)
            .map(|(_, d)| *d)
            .ok_or(ClassifyError::MissingFunctionCall {
                function: "shouldUserSeeEmail".into(),
            })
    }
}

fn message(id: &str, subject: &str) -> Message {
    Message {
        id: id.into(),
        snippet: Some(format!("snippet for {subject}")),
        payload: Some(MessagePayload {
            headers: vec![Header {
                name: "Subject".into(),
                value: subject.into(),
            }],
        }),
    }
}

// ── Server harness ──────────────────────────────────────────────────

/// Start the server on a random port; return its base URL and the fake
/// mailbox for post-request assertions.
async fn start_server(mailbox: FakeMailbox, classifier: FakeClassifier) -> (String, Arc<FakeMailbox>) {
    let mailbox = Arc::new(mailbox);
    let pipeline = Arc::new(TriagePipeline::new(
        Arc::clone(&mailbox) as Arc<dyn Mailbox>,
        Arc::new(classifier),
        TriageSettings {
            ignored_label: "mailsweep".into(),
            lookback_hours: 24,
        },
    ));
    let app = cron_routes(AppState {
        pipeline,
        cron_secret: SecretString::from(SECRET),
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://127.0.0.1:{port}"), mailbox)
}

fn trigger(base: &str) -> reqwest::RequestBuilder {
    reqwest::Client::new()
        .post(format!("{base}/api/cron/triage"))
        .header(CRON_HEADER, "true")
        .header("authorization", format!("Bearer {SECRET}"))
}

async fn trigger_json(base: &str) -> (reqwest::StatusCode, Value) {
    let resp = trigger(base).send().await.unwrap();
    let status = resp.status();
    let body: Value = resp.json().await.unwrap();
    (status, body)
}

// ── Empty mailbox ───────────────────────────────────────────────────

#[tokio::test]
async fn empty_mailbox_returns_empty_results() {
    timeout(TEST_TIMEOUT, async {
        let (base, _) = start_server(
            FakeMailbox::new(vec![]),
            FakeClassifier::scripted(vec![]),
        )
        .await;

        let (status, body) = trigger_json(&base).await;

        assert_eq!(status, reqwest::StatusCode::OK);
        assert!(body["results"].as_array().unwrap().is_empty());
        assert_eq!(body["message"], "Successfully processed 0 unread messages");
    })
    .await
    .expect("test timed out");
}

// ── Visible message ─────────────────────────────────────────────────

#[tokio::test]
async fn visible_message_is_reported_and_untouched() {
    timeout(TEST_TIMEOUT, async {
        let (base, mailbox) = start_server(
            FakeMailbox::new(vec![message("m1", "Interview invitation")]),
            FakeClassifier::scripted(vec![("Interview invitation", Decision::ShouldSee(true))]),
        )
        .await;

        let (status, body) = trigger_json(&base).await;

        assert_eq!(status, reqwest::StatusCode::OK);
        let results = body["results"].as_array().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["shouldSee"], true);
        assert_eq!(results[0]["subject"], "Interview invitation");
        assert!(mailbox.modify_calls.lock().unwrap().is_empty());
    })
    .await
    .expect("test timed out");
}

// ── Hidden message ──────────────────────────────────────────────────

#[tokio::test]
async fn hidden_message_is_relabeled_exactly_once() {
    timeout(TEST_TIMEOUT, async {
        let (base, mailbox) = start_server(
            FakeMailbox::new(vec![message("m2", "50% off everything!")]),
            FakeClassifier::scripted(vec![("50% off everything!", Decision::ShouldSee(false))]),
        )
        .await;

        let (status, body) = trigger_json(&base).await;

        assert_eq!(status, reqwest::StatusCode::OK);
        let results = body["results"].as_array().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["shouldSee"], false);
        assert_eq!(results[0]["subject"], "50% off everything!");

        let calls = mailbox.modify_calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let (id, add, remove) = &calls[0];
        assert_eq!(id, "m2");
        assert_eq!(add, &vec!["Label_sweep".to_string()]);
        assert_eq!(remove, &vec![UNREAD_LABEL.to_string()]);
    })
    .await
    .expect("test timed out");
}

// ── Skipped verdict in a mixed batch ────────────────────────────────

#[tokio::test]
async fn indeterminate_message_is_skipped_but_batch_succeeds() {
    timeout(TEST_TIMEOUT, async {
        let (base, mailbox) = start_server(
            FakeMailbox::new(vec![
                message("m3", "Garbled"),
                message("m4", "Project update"),
            ]),
            FakeClassifier::scripted(vec![
                ("Garbled", Decision::Indeterminate),
                ("Project update", Decision::ShouldSee(true)),
            ]),
        )
        .await;

        let (status, body) = trigger_json(&base).await;

        assert_eq!(status, reqwest::StatusCode::OK);
        let results = body["results"].as_array().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["subject"], "Project update");
        // Skipped message must not be mutated.
        assert!(mailbox.modify_calls.lock().unwrap().is_empty());
        // The processed count still reflects everything fetched.
        assert_eq!(body["message"], "Successfully processed 2 unread messages");
    })
    .await
    .expect("test timed out");
}

// ── Failure propagation ─────────────────────────────────────────────

#[tokio::test]
async fn classifier_failure_returns_500() {
    timeout(TEST_TIMEOUT, async {
        let (base, mailbox) = start_server(
            FakeMailbox::new(vec![message("m5", "Anything")]),
            FakeClassifier::failing(),
        )
        .await;

        let (status, body) = trigger_json(&base).await;

        assert_eq!(status, reqwest::StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to process emails");
        assert!(body["details"].as_str().unwrap().contains("503"));
        assert!(mailbox.modify_calls.lock().unwrap().is_empty());
    })
    .await
    .expect("test timed out");
}

// ── Authorization ───────────────────────────────────────────────────

#[tokio::test]
async fn missing_cron_header_is_unauthorized() {
    timeout(TEST_TIMEOUT, async {
        let (base, _) = start_server(
            FakeMailbox::new(vec![]),
            FakeClassifier::scripted(vec![]),
        )
        .await;

        let resp = reqwest::Client::new()
            .post(format!("{base}/api/cron/triage"))
            .header("authorization", format!("Bearer {SECRET}"))
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"], "Unauthorized origin");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn wrong_secret_is_unauthorized() {
    timeout(TEST_TIMEOUT, async {
        let (base, _) = start_server(
            FakeMailbox::new(vec![]),
            FakeClassifier::scripted(vec![]),
        )
        .await;

        let resp = reqwest::Client::new()
            .post(format!("{base}/api/cron/triage"))
            .header(CRON_HEADER, "true")
            .header("authorization", "Bearer nope")
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"], "Failed to provide correct cron job secret");
    })
    .await
    .expect("test timed out");
}

// ── Status endpoint ─────────────────────────────────────────────────

#[tokio::test]
async fn status_reports_mailbox_profile() {
    timeout(TEST_TIMEOUT, async {
        let (base, _) = start_server(
            FakeMailbox::new(vec![]),
            FakeClassifier::scripted(vec![]),
        )
        .await;

        let resp = reqwest::Client::new()
            .get(format!("{base}/api/cron/status"))
            .header(CRON_HEADER, "true")
            .header("authorization", format!("Bearer {SECRET}"))
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["emailAddress"], "user@example.com");
        assert_eq!(body["messagesTotal"], 1234);
        assert!(body["timestamp"].is_string());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn status_requires_authorization() {
    timeout(TEST_TIMEOUT, async {
        let (base, _) = start_server(
            FakeMailbox::new(vec![]),
            FakeClassifier::scripted(vec![]),
        )
        .await;

        let resp = reqwest::Client::new()
            .get(format!("{base}/api/cron/status"))
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);
    })
    .await
    .expect("test timed out");
}
