use thiserror::Error;

/// Longest slice of an error message that is ever echoed back to a chat caller.
pub const ERROR_SNIPPET_LEN: usize = 50;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("{0}")]
    Validation(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("service error: {0}")]
    Service(String),
}

impl From<rusqlite::Error> for RelayError {
    fn from(err: rusqlite::Error) -> Self {
        RelayError::Storage(err.to_string())
    }
}

impl From<tokio::task::JoinError> for RelayError {
    fn from(err: tokio::task::JoinError) -> Self {
        RelayError::Storage(format!("store task failed: {}", err))
    }
}

impl From<reqwest::Error> for RelayError {
    fn from(err: reqwest::Error) -> Self {
        RelayError::Service(err.to_string())
    }
}

impl RelayError {
    /// First `ERROR_SNIPPET_LEN` characters of the display text.
    pub fn snippet(&self) -> String {
        self.to_string().chars().take(ERROR_SNIPPET_LEN).collect()
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("GEMINI_API_KEY environment variable not set. Please set it in your .env file.")]
    MissingApiKey,

    #[error("Invalid server address '{0}': {1}")]
    InvalidAddress(String, std::net::AddrParseError),

    #[error("Both --tls-cert-path and --tls-key-path must be provided to enable TLS.")]
    IncompleteTls,
}
