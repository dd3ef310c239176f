//! Error types for scribecast.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScribecastError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Audio errors
    #[error("Audio source error: {message}")]
    AudioSource { message: String },

    // Engine errors
    #[error("Decode model not found at {path}")]
    ModelNotFound { path: String },

    #[error("Decode failed: {message}")]
    DecodeFailed { message: String },

    #[error("No free inference context slot")]
    NoFreeSlot,

    // Transport errors
    #[error("Server bind failed on {addr}: {message}")]
    ServerBind { addr: String, message: String },

    #[error("Subscriber connection error: {message}")]
    Connection { message: String },

    // Chat side-channel errors
    #[error("Chat request failed: {0}")]
    ChatRequest(#[from] reqwest::Error),

    #[error("Chat provider error: {message}")]
    ChatProvider { message: String },

    #[error("Malformed chat response: {message}")]
    ChatResponse { message: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, ScribecastError>;
