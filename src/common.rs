use axum::{http::StatusCode, Json};
use nanorand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Serialize)]
pub struct ErrorMessage {
    pub error: String,
}

pub type ErrorResponse = (StatusCode, Json<ErrorMessage>);

pub fn generate_image_id(len: usize) -> String {
    const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789-_";
    let mut result = String::new();
    let mut rng = nanorand::tls_rng();
    for _ in 0..len {
        result.push(char::from(CHARSET[rng.generate_range(0..CHARSET.len())]));
    }
    result
}

/// How colors are mapped to palette entries, as spelled in config files and query strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Fast,
    Exact,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Exact => "exact",
        }
    }
}

impl From<Mode> for mediancut::MappingMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Fast => Self::Fast,
            Mode::Exact => Self::Exact,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Png,
    Gif,
}

impl OutputFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Gif => "image/gif",
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Quantize(#[from] mediancut::Error),
    #[error("Upload exceeds the limit of {limit} bytes")]
    UploadTooLarge { limit: usize },
    #[error("Failed to receive upload: {0}")]
    UploadInterrupted(axum::BoxError),
    #[error("No image with ID {0:?} (it may have been evicted)")]
    ImageNotFound(String),

    #[error("Quantization job failed to complete (did the thread panic?)")]
    JobPanicked,
    #[error("Cannot send request to quantization service because it is offline")]
    QuantizeServiceOffline,
    #[error("Internal quantization job failure (did not receive result)")]
    JobExited,
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Quantize(error) if error.is_input_error() => StatusCode::BAD_REQUEST,
            Self::UploadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::UploadInterrupted(_) => StatusCode::BAD_REQUEST,
            Self::ImageNotFound(_) => StatusCode::NOT_FOUND,
            Self::Quantize(_)
            | Self::JobPanicked
            | Self::QuantizeServiceOffline
            | Self::JobExited => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        (
            self.status_code(),
            Json(ErrorMessage {
                error: self.to_string(),
            }),
        )
    }
}
