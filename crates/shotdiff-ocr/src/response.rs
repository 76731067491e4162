use shotdiff_types::BoundingBox;

/// One recognized word or line, in plane coordinates.
#[derive(Debug, Clone)]
pub struct OcrText {
    pub bounding_box: BoundingBox,
    pub text: String,
    pub confidence: Option<f32>,
}

impl OcrText {
    pub fn new(bounding_box: BoundingBox, text: String) -> Self {
        Self {
            bounding_box,
            text,
            confidence: None,
        }
    }

    pub fn with_confidence(mut self, value: f32) -> Self {
        self.confidence = Some(value);
        self
    }
}

/// Collection of OCR results.
#[derive(Debug, Clone)]
pub struct OcrResponse {
    pub texts: Vec<OcrText>,
}

impl OcrResponse {
    pub fn new(texts: Vec<OcrText>) -> Self {
        Self { texts }
    }

    pub fn empty() -> Self {
        Self { texts: Vec::new() }
    }
}
