//! Error types for mailsweep.

/// Top-level error type for the triage service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Mailbox error: {0}")]
    Mailbox(#[from] MailboxError),

    #[error("Label resolution error: {0}")]
    Label(#[from] LabelError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Classification error: {0}")]
    Classify(#[from] ClassifyError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors talking to the mailbox provider.
#[derive(Debug, thiserror::Error)]
pub enum MailboxError {
    #[error("Token refresh failed: {0}")]
    TokenRefresh(String),

    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Failed to decode provider response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Resource already exists")]
    Conflict,
}

/// Errors resolving the ignored label.
#[derive(Debug, thiserror::Error)]
pub enum LabelError {
    #[error("Failed to create label {name}: {source}")]
    Create { name: String, source: MailboxError },

    #[error("Failed to list labels: {0}")]
    List(MailboxError),

    #[error("Label {name} exists but was not found on lookup")]
    NotFoundAfterConflict { name: String },
}

/// Errors fetching recent unread messages.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Failed to list messages: {0}")]
    List(MailboxError),

    #[error("Failed to fetch message {id}: {source}")]
    Detail { id: String, source: MailboxError },
}

/// Errors calling the classifier endpoint.
///
/// Each failure mode gets its own variant so logs can tell a transport
/// failure apart from a response that decoded but was missing the
/// expected function call. A response with no candidates at all is not
/// an error: the classifier reports `Decision::Indeterminate` and the
/// pipeline skips the message.
#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Classifier returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Failed to decode classifier response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Classifier response has no {function} function call")]
    MissingFunctionCall { function: String },

    #[error("Function call is missing boolean argument {argument}")]
    MissingArgument { argument: String },
}

/// Result type alias for the service.
pub type Result<T> = std::result::Result<T, Error>;
