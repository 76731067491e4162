use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::output::OutputError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Input,
    DimensionMismatch,
    OcrUnavailable,
    Internal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Input => "input",
            ErrorKind::DimensionMismatch => "dimension_mismatch",
            ErrorKind::OcrUnavailable => "ocr_unavailable",
            ErrorKind::Internal => "internal",
        }
    }
}

/// Failure confined to a single image pair; the batch carries on.
#[derive(Debug, Error)]
pub enum PairError {
    #[error("cannot read {}: {reason}", .path.display())]
    Input { path: PathBuf, reason: String },
    #[error(
        "image sizes differ too much: {reference_width}x{reference_height} vs {candidate_width}x{candidate_height}"
    )]
    DimensionMismatch {
        reference_width: u32,
        reference_height: u32,
        candidate_width: u32,
        candidate_height: u32,
    },
    #[error("OCR unavailable: {message}")]
    OcrUnavailable { message: String },
    #[error("worker task failed: {message}")]
    Internal { message: String },
}

impl PairError {
    pub fn input(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        PairError::Input {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            PairError::Input { .. } => ErrorKind::Input,
            PairError::DimensionMismatch { .. } => ErrorKind::DimensionMismatch,
            PairError::OcrUnavailable { .. } => ErrorKind::OcrUnavailable,
            PairError::Internal { .. } => ErrorKind::Internal,
        }
    }
}

/// Failure that stops the whole run.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("input folder {}: {reason}", .path.display())]
    Input { path: PathBuf, reason: String },
    /// Raised by the engine check (`filename` is `None`) or by the first
    /// pair that reached OCR.
    #[error("OCR engine unavailable: {message}")]
    OcrUnavailable {
        filename: Option<String>,
        message: String,
    },
    #[error("failed to write report: {0}")]
    Output(#[from] OutputError),
}
