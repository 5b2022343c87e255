/// Result alias that carries the custom [`VisualiserError`] type.
pub type Result<T> = std::result::Result<T, VisualiserError>;

/// Common error type for the core crate.
///
/// Nothing in the crate treats these as fatal. Operations that fail log a
/// diagnostic and hand the error back so callers can decide whether to care.
#[derive(Debug, thiserror::Error)]
pub enum VisualiserError {
    /// Free-form message for failures without a dedicated variant.
    #[error("{0}")]
    Message(String),
    #[error("invalid aspect ratio {width}:{height}, both sides must be finite and positive")]
    InvalidAspectRatio { width: f64, height: f64 },
    #[error("invalid frame rate {0}, must be finite and positive")]
    InvalidFrameRate(f64),
    #[error("invalid fft size {0}, must be a power of two between 16 and 32768")]
    InvalidFftSize(u32),
    #[error("event name is empty")]
    EmptyEventName,
    #[error("this visualiser does not support the event `{0}`")]
    UnsupportedEvent(String),
    #[error("colour list is empty")]
    EmptyColorList,
    #[error("unrecognised colour `{0}`")]
    InvalidColor(String),
    /// Malformed JSON configuration.
    #[error("{0}")]
    Config(#[from] serde_json::Error),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

impl VisualiserError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}

impl From<&str> for VisualiserError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for VisualiserError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
