use std::sync::Arc;

use shotdiff_ocr::{OcrEngine, OcrError};

use crate::settings::TesseractSettings;

/// Builds the OCR engine compiled into this binary.
///
/// Construction never touches the engine; whether it actually works is
/// decided by the batch runner's engine check.
#[cfg(feature = "ocr-tesseract")]
pub fn build_ocr_engine(settings: &TesseractSettings) -> Result<Arc<dyn OcrEngine>, OcrError> {
    use shotdiff_ocr::{TesseractConfig, TesseractOcrEngine};

    let mut config = TesseractConfig::default();
    if let Some(binary) = settings.binary.clone() {
        config.binary = binary;
    }
    config.tessdata_dir = settings.tessdata_dir.clone();
    config.page_segmentation = settings.page_segmentation;
    tracing::debug!(binary = %config.binary.display(), "using tesseract OCR backend");
    Ok(Arc::new(TesseractOcrEngine::with_config(config)))
}

#[cfg(not(feature = "ocr-tesseract"))]
pub fn build_ocr_engine(_settings: &TesseractSettings) -> Result<Arc<dyn OcrEngine>, OcrError> {
    Err(OcrError::unavailable(
        "none",
        "no OCR backend compiled in; rebuild with the \"ocr-tesseract\" feature",
    ))
}

#[cfg(all(test, feature = "ocr-tesseract"))]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn builds_tesseract_from_settings() {
        let engine = build_ocr_engine(&TesseractSettings {
            binary: Some(PathBuf::from("/opt/tesseract/bin/tesseract")),
            tessdata_dir: None,
            page_segmentation: Some(6),
        })
        .unwrap();
        assert_eq!(engine.name(), "tesseract");
    }
}
