/// Result alias that carries the custom [`TimingError`] type.
pub type Result<T> = std::result::Result<T, TimingError>;

/// Common error type for the core crate.
///
/// Only configuration problems are errors. Input that misses every window,
/// ticks before a trigger starts and cancels of unknown ids are silent no-ops.
#[derive(Debug, thiserror::Error)]
pub enum TimingError {
    /// A judgment window was registered with a zero, negative or non-finite
    /// length.
    #[error("window duration must be a positive number of beats, got {0}")]
    InvalidDuration(f64),
    /// A periodic trigger was started with a zero, negative or non-finite
    /// interval.
    #[error("trigger interval must be a positive number of beats, got {0}")]
    InvalidInterval(f64),
    /// A clock was given a zero, negative or non-finite tempo.
    #[error("tempo must be a positive number of beats per minute, got {0}")]
    InvalidTempo(f64),
    /// Text that does not name any known input signal.
    #[error("unknown signal kind `{0}`")]
    UnknownSignalKind(String),
    /// Free-form error for conditions without a dedicated variant.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Malformed configuration, script or judgment log.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

impl TimingError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}

impl From<&str> for TimingError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for TimingError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
