use thiserror::Error;

/// Failures of the language-model backend. Callers in the quiz pipeline turn
/// these into a skipped tier; they never reach the user.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Missing API key or unusable settings
    #[error("configuration error: {0}")]
    Config(String),

    /// Connection failed or timed out
    #[error("network error: {0}")]
    Network(String),

    /// Non-2xx response from the API
    #[error("api error: {0}")]
    Api(String),

    /// Reply was not the JSON we asked for
    #[error("parse error: {0}")]
    Parse(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("session {0} not found")]
    NotFound(String),

    #[error("block {0} not found")]
    BlockNotFound(String),

    #[error("a session named {0:?} already exists")]
    DuplicateName(String),

    #[error("session name is empty")]
    EmptyName,

    #[error("no usable content in the uploaded notes")]
    NoUsableContent,
}
