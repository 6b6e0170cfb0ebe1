//! Error types for autopark

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// autopark error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration could not be read, parsed or validated
    #[error("Configuration error: {0}")]
    Config(String),

    /// A call that is illegal in the current state (starting a maneuver while
    /// one is active, feeding a reading to the wrong engine, ...)
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Recorded trace could not be replayed
    #[error("Replay error: {0}")]
    Replay(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(e: toml::ser::Error) -> Self {
        Error::Config(e.to_string())
    }
}
