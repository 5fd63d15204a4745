use thiserror::Error;
use xl_game::GameError;

/// Login and session negotiation error types
#[derive(Error, Debug)]
pub enum XlAuthError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP error {status}: {body_snippet}")]
    Http {
        status: reqwest::StatusCode,
        body_snippet: String,
    },

    /// The login reply did not contain the success callback. The raw reply is
    /// kept for support diagnostics.
    #[error("OAuth login failed - credentials rejected or login page changed")]
    OauthLoginFailure { reply: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Local game install error: {0}")]
    Game(#[from] GameError),

    #[error("Login was cancelled")]
    Cancelled,

    #[error("JSON serialization/deserialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl XlAuthError {
    /// Whether a caller may reasonably retry the same operation.
    ///
    /// Transport failures and cancellation are transient; protocol and
    /// credential failures are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Http { status, .. } => status.is_server_error(),
            Self::Cancelled => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, XlAuthError>;
