//! Triage classifier abstraction.
//!
//! The classifier answers one question per message: should the user see
//! it? The production implementation is [`gemini::GeminiClassifier`];
//! tests substitute a scripted fake.

pub mod gemini;

use async_trait::async_trait;

use crate::error::ClassifyError;

/// Outcome of one classification call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The model returned a verdict.
    ShouldSee(bool),
    /// The endpoint answered but produced no candidates. The message is
    /// skipped — never relabeled on a non-answer.
    Indeterminate,
}

/// One-shot boolean triage of a message.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, subject: &str, body: &str) -> Result<Decision, ClassifyError>;
}
