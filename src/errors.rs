use thiserror::Error;

#[derive(Debug, Error)]
pub enum HuddleError {
    #[error("No identity could be established: {0}")]
    IdentityUnavailable(String),

    #[error("Failed to exchange custom token: {0}")]
    TokenExchange(String),

    #[error("Feed subscription error: {0}")]
    Subscription(String),

    #[error("Failed to access message store: {0}")]
    Store(String),

    #[error("Failed to access summarizer API: {0}")]
    Summarizer(String),

    #[error("Malformed summarizer response: {0}")]
    MalformedResponse(String),

    #[error("Failed to send HTTP request: {0}")]
    HttpError(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<reqwest::Error> for HuddleError {
    fn from(error: reqwest::Error) -> Self {
        HuddleError::HttpError(error.to_string())
    }
}

impl From<serde_json::Error> for HuddleError {
    fn from(error: serde_json::Error) -> Self {
        HuddleError::MalformedResponse(error.to_string())
    }
}

impl From<url::ParseError> for HuddleError {
    fn from(error: url::ParseError) -> Self {
        HuddleError::Config(format!("invalid URL: {error}"))
    }
}
