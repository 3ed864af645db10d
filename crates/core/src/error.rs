use std::path::PathBuf;

/// Result alias that carries the custom [`MetronomeError`] type.
pub type Result<T> = std::result::Result<T, MetronomeError>;

/// Common error type for the metronome crates.
///
/// Every variant is a start-up failure. Once the frame loop is running no
/// error crosses it.
#[derive(Debug, thiserror::Error)]
pub enum MetronomeError {
    /// Free-form failure that does not warrant its own variant.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// A configuration file could not be parsed.
    #[error("invalid configuration in `{}`: {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// One of the click samples is missing or cannot be decoded.
    #[error("failed to load sample `{}`: {reason}", path.display())]
    SampleLoad { path: PathBuf, reason: String },
    /// No audio output could be opened.
    #[error("audio output unavailable: {0}")]
    AudioDevice(String),
}

impl MetronomeError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    /// Process exit status reported for this error.
    ///
    /// Sample failures get their own code so packaging problems can be told
    /// apart from a missing sound card.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Message(_) | Self::Io(_) => 1,
            Self::SampleLoad { .. } => 2,
            Self::AudioDevice(_) => 3,
            Self::Config { .. } => 4,
        }
    }
}

impl From<&str> for MetronomeError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for MetronomeError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
