mod backends;
mod engine;
mod error;
mod extractor;
mod plane;
mod request;
mod response;

#[cfg(feature = "engine-tesseract")]
pub use backends::tesseract::{TesseractConfig, TesseractOcrEngine};
pub use engine::OcrEngine;
pub use error::OcrError;
pub use extractor::{DEFAULT_LANGUAGE, DEFAULT_MIN_CONFIDENCE, ExtractorConfig, TextExtractor};
pub use plane::LumaPlane;
pub use request::OcrRequest;
pub use response::{OcrResponse, OcrText};
