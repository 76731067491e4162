use async_trait::async_trait;

use crate::error::OcrError;
use crate::request::OcrRequest;
use crate::response::OcrResponse;

/// Common interface for all OCR engines.
///
/// Dropping a pending `recognize` future abandons the call; engines must not
/// keep working on its behalf afterwards.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    fn name(&self) -> &'static str;

    /// Checks the engine once before a batch starts.
    async fn warm_up(&self) -> Result<(), OcrError> {
        Ok(())
    }

    async fn recognize(&self, request: &OcrRequest<'_>) -> Result<OcrResponse, OcrError>;
}
