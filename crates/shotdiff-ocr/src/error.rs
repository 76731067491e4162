use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("plane data length {provided} is smaller than stride * height ({required})")]
    InsufficientPlaneData { provided: usize, required: usize },
    #[error(
        "plane dimensions overflowed while validating stride * height (stride={stride}, height={height})"
    )]
    PlaneOverflow { stride: usize, height: u32 },
    #[error("{backend} OCR engine is unavailable: {message}")]
    Unavailable {
        backend: &'static str,
        message: String,
    },
    #[error("OCR call did not finish within {timeout:?}")]
    Timeout { timeout: Duration },
    #[error("backend error: {message}")]
    Backend { message: String },
}

impl OcrError {
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    pub fn unavailable(backend: &'static str, message: impl Into<String>) -> Self {
        Self::Unavailable {
            backend,
            message: message.into(),
        }
    }
}
