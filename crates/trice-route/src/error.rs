/// Errors raised while configuring or driving trace output.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    /// Record, buffer or encoding error.
    #[error("frame error: {0}")]
    Frame(#[from] trice_frame::FrameError),

    /// No channel with this name is configured.
    #[error("unknown channel: {0}")]
    UnknownChannel(String),

    /// Two channels share a name.
    #[error("duplicate channel: {0}")]
    DuplicateChannel(String),

    /// An admission filter admits no ID or is only half specified.
    #[error("invalid filter for channel {channel}: {reason}")]
    InvalidFilter {
        channel: String,
        reason: &'static str,
    },

    /// A configuration value is out of range.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Reading a config file failed.
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RouteError>;
