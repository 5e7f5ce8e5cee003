use reqwest::StatusCode;
use thiserror::Error;

/// Message shown for any failed captioning round trip.
pub const GENERATE_FAILED_MESSAGE: &str = "Failed to generate caption. Please try again.";

/// Rejections raised while accepting a candidate image.
///
/// The `Display` text is exactly what the page shows the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntakeError {
    #[error("Please select a valid image file")]
    InvalidType { mime: String },
    #[error("Image size should be less than 10MB")]
    TooLarge { size: u64 },
}

/// Failures of the captioning request.
///
/// Every variant surfaces to the user as [`GENERATE_FAILED_MESSAGE`]; the
/// detail only reaches the log.
#[derive(Debug, Error)]
pub enum CaptionError {
    #[error("request to captioning endpoint failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("captioning endpoint answered {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("captioning endpoint returned a malformed body: {0}")]
    Body(#[from] serde_json::Error),
    #[error("captioning endpoint returned a non-object body")]
    NotAnObject,
    #[error("caption task stopped unexpectedly: {0}")]
    TaskFailed(String),
}

impl CaptionError {
    pub fn user_message(&self) -> &'static str {
        GENERATE_FAILED_MESSAGE
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid captioning endpoint {url:?}: {reason}")]
    Endpoint { url: String, reason: String },
    #[error("invalid log level {0:?}")]
    LogLevel(String),
}
