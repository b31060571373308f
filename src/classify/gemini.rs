//! Gemini implementation of the [`Classifier`] trait.
//!
//! Sends a `generateContent` request with a single function declaration
//! and reads the verdict out of the function-call part of the response.
//! The model never free-texts an answer — the tool schema forces a
//! boolean.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error};

use crate::classify::{Classifier, Decision};
use crate::error::ClassifyError;

/// Default classifier model.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-preview-04-17";

/// Default endpoint base.
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Function the model is asked to call with its verdict.
const FUNCTION_NAME: &str = "shouldUserSeeEmail";

/// The single boolean argument of that function.
const ARGUMENT_NAME: &str = "shouldSee";

/// Default classification instruction.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"
You are a helpful assistant for a busy professional. Your task is to analyze an email and determine if it's important enough for the user to see.

The user is looking for emails that are:
1.  **Urgent**: Requiring immediate attention.
2.  **Important**: Related to work, personal finance, or critical projects.
3.  **From key contacts**: From their boss, family, or important clients.
4.  **Job applications**: Interview invitations, assessments, or updates on active applications.

The user wants to IGNORE emails that are:
1.  **Spam/Junk**: Unsolicited marketing or promotional content.
2.  **Newsletters**: Automated updates that are not time-sensitive.
3.  **Social media notifications**: Updates from platforms like LinkedIn, Twitter, etc.
4.  **Automated emails**: Messages sent by 3rd party systems, like account verifications, password resets, or application confirmations.

Analyze the following email and decide if the user should see it. Call the `shouldUserSeeEmail` function with your decision."#;

// ── Response wire types ─────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default)]
    function_call: Option<FunctionCall>,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    args: serde_json::Value,
}

// ── Client ──────────────────────────────────────────────────────────

/// Gemini `generateContent` classifier.
pub struct GeminiClassifier {
    client: reqwest::Client,
    api_key: SecretString,
    model: String,
    base_url: String,
    system_prompt: String,
}

impl GeminiClassifier {
    pub fn new(api_key: SecretString, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            base_url: DEFAULT_BASE_URL.to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.trim().to_string(),
        }
    }

    /// Point the client at a different endpoint base (tests use a fake).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Replace the default classification instruction.
    pub fn with_system_prompt(mut self, prompt: String) -> Self {
        self.system_prompt = prompt;
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url,
            self.model,
            self.api_key.expose_secret(),
        )
    }

    /// Build the `generateContent` request body for one message.
    fn request_body(&self, subject: &str, body: &str) -> serde_json::Value {
        json!({
            "system_instruction": {
                "parts": [{ "text": self.system_prompt }],
            },
            "contents": [
                {
                    "role": "user",
                    "parts": [{ "text": format!("Subject: {subject}\nBody: {body}") }],
                }
            ],
            "tools": [
                {
                    "functionDeclarations": [
                        {
                            "name": FUNCTION_NAME,
                            "description": "Determine if the user needs to see this email",
                            "parameters": {
                                "type": "object",
                                "properties": {
                                    ARGUMENT_NAME: {
                                        "type": "boolean",
                                        "description": "Whether the user needs to see this email",
                                    },
                                },
                                "required": [ARGUMENT_NAME],
                            },
                        }
                    ],
                }
            ],
        })
    }
}

/// Pull the verdict out of a decoded response.
///
/// No candidates → `Indeterminate` (logged, message skipped upstream).
/// Candidates without the expected function call or argument are hard
/// errors — the endpoint violated the tool contract.
fn decision_from_response(resp: GenerateResponse) -> Result<Decision, ClassifyError> {
    if resp.candidates.is_empty() {
        error!(
            detail = %resp.error.unwrap_or_default(),
            "Classifier response contains no candidates"
        );
        return Ok(Decision::Indeterminate);
    }

    let parts = resp
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts)
        .unwrap_or_default();

    let call = parts
        .into_iter()
        .filter_map(|p| p.function_call)
        .find(|c| c.name == FUNCTION_NAME)
        .ok_or_else(|| ClassifyError::MissingFunctionCall {
            function: FUNCTION_NAME.to_string(),
        })?;

    let should_see = call
        .args
        .get(ARGUMENT_NAME)
        .and_then(serde_json::Value::as_bool)
        .ok_or_else(|| ClassifyError::MissingArgument {
            argument: ARGUMENT_NAME.to_string(),
        })?;

    Ok(Decision::ShouldSee(should_see))
}

#[async_trait::async_trait]
impl Classifier for GeminiClassifier {
    async fn classify(&self, subject: &str, body: &str) -> Result<Decision, ClassifyError> {
        debug!(subject, "Classifying message");

        let resp = self
            .client
            .post(self.endpoint())
            .json(&self.request_body(subject, body))
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(ClassifyError::Api {
                status: status.as_u16(),
                body: text,
            });
        }

        let decoded: GenerateResponse = serde_json::from_str(&text)?;
        decision_from_response(decoded)
    }
}
