/// Result alias that carries the custom [`SmoothPageError`] type.
pub type Result<T> = std::result::Result<T, SmoothPageError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum SmoothPageError {
    /// Invalid engine or device parameters. Rejects construction.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// An event bus subscriber failed while handling `event`.
    #[error("handler for `{event}` failed: {message}")]
    Handler { event: String, message: String },
    /// A trigger refresh arrived before the scroll engine exists.
    #[error("trigger refresh requested before the scroll engine was constructed")]
    StaleRefresh,
    /// Malformed trigger condition notation.
    #[error("cannot parse trigger condition `{0}`")]
    Parse(String),
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

impl SmoothPageError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    pub fn config<T: Into<String>>(msg: T) -> Self {
        Self::Config(msg.into())
    }

    pub fn handler(event: &str, message: impl Into<String>) -> Self {
        Self::Handler {
            event: event.to_string(),
            message: message.into(),
        }
    }
}

impl From<&str> for SmoothPageError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for SmoothPageError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
