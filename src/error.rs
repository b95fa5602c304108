//! Error types for Lab Concierge.

/// Top-level error type for the bot.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Chat error: {0}")]
    Chat(#[from] ChatError),

    #[error("Org error: {0}")]
    Org(#[from] OrgError),

    #[error("Calendar error: {0}")]
    Calendar(#[from] CalendarError),

    #[error("Rewrite error: {0}")]
    Rewrite(#[from] RewriteError),

    #[error("Image error: {0}")]
    Image(#[from] ImageError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Chat platform errors.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Chat API call {method} failed: {reason}")]
    Api { method: String, reason: String },

    #[error("Failed to send via {method}: {reason}")]
    SendFailed { method: String, reason: String },

    #[error("Invalid chat event: {0}")]
    InvalidEvent(String),

    #[error("HTTP error: {0}")]
    Http(String),
}

/// Source-hosting organization errors.
#[derive(Debug, thiserror::Error)]
pub enum OrgError {
    #[error("User '{0}' not found")]
    HandleNotFound(String),

    #[error("Org API request failed ({status}): {reason}")]
    Api { status: u16, reason: String },

    #[error("HTTP error: {0}")]
    Http(String),
}

/// Shared-calendar errors.
#[derive(Debug, thiserror::Error)]
pub enum CalendarError {
    #[error("Calendar '{0}' not configured")]
    NotConfigured(String),

    #[error("Calendar API request failed for '{calendar}': {reason}")]
    Api { calendar: String, reason: String },

    #[error("HTTP error: {0}")]
    Http(String),
}

/// Bio rewriting errors.
#[derive(Debug, thiserror::Error)]
pub enum RewriteError {
    #[error("No bio text provided")]
    EmptyInput,

    #[error("Rewrite provider error: {reason}")]
    Provider { reason: String },
}

/// Photo processing errors.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("Image too small ({width}x{height}). Minimum is {min}x{min}.")]
    TooSmall { width: u32, height: u32, min: u32 },

    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Failed to encode image: {0}")]
    Encode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Request-store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("An active request already exists for '{key}'")]
    AlreadyExists { key: String },

    #[error("No request found for '{key}'")]
    NotFound { key: String },
}

/// Result type alias for the bot.
pub type Result<T> = std::result::Result<T, Error>;
