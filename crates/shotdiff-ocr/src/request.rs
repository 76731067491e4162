use crate::plane::LumaPlane;

/// OCR invocation metadata.
#[derive(Debug)]
pub struct OcrRequest<'a> {
    plane: LumaPlane<'a>,
    language: &'a str,
}

impl<'a> OcrRequest<'a> {
    pub fn new(plane: LumaPlane<'a>, language: &'a str) -> Self {
        Self { plane, language }
    }

    pub fn plane(&self) -> &LumaPlane<'a> {
        &self.plane
    }

    /// Engine language spec, e.g. `eng` or `eng+jpn`.
    pub fn language(&self) -> &'a str {
        self.language
    }
}
