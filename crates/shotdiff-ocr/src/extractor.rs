use std::sync::Arc;

use shotdiff_types::{TextBlock, TextExtraction};

use crate::{LumaPlane, OcrEngine, OcrError, OcrRequest};

pub const DEFAULT_LANGUAGE: &str = "eng";
pub const DEFAULT_MIN_CONFIDENCE: f32 = 0.0;

#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    pub language: String,
    /// Blocks below this confidence (0-100) are dropped.
    pub min_confidence: f32,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            language: DEFAULT_LANGUAGE.to_string(),
            min_confidence: DEFAULT_MIN_CONFIDENCE,
        }
    }
}

/// Runs OCR over a body region and converts the response into [`TextExtraction`].
#[derive(Clone)]
pub struct TextExtractor {
    engine: Arc<dyn OcrEngine>,
    config: ExtractorConfig,
}

impl TextExtractor {
    pub fn new(engine: Arc<dyn OcrEngine>, config: ExtractorConfig) -> Self {
        Self { engine, config }
    }

    pub fn engine(&self) -> &Arc<dyn OcrEngine> {
        &self.engine
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Recognizes text in `region`, shifting block coordinates down by
    /// `offset_y` so they are expressed in full-image space.
    ///
    /// Engine failures are returned as-is; an empty extraction is only
    /// produced when the engine itself found nothing. Blocks the engine did
    /// not score count as confidence 0.
    pub async fn extract(
        &self,
        region: &LumaPlane<'_>,
        offset_y: u32,
    ) -> Result<TextExtraction, OcrError> {
        let request = OcrRequest::new(region.clone(), &self.config.language);
        let response = self.engine.recognize(&request).await?;
        let total = response.texts.len();

        let blocks: Vec<TextBlock> = response
            .texts
            .into_iter()
            .filter_map(|entry| {
                let text = entry.text.trim();
                if text.is_empty() {
                    return None;
                }
                let confidence = entry.confidence.unwrap_or(0.0).clamp(0.0, 100.0);
                if confidence < self.config.min_confidence {
                    return None;
                }
                Some(TextBlock::new(
                    text,
                    confidence,
                    entry.bounding_box.offset_y(offset_y),
                ))
            })
            .collect();

        tracing::debug!(
            engine = self.engine.name(),
            kept = blocks.len(),
            dropped = total - blocks.len(),
            "text extracted"
        );
        Ok(TextExtraction::new(blocks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{OcrResponse, OcrText};
    use shotdiff_types::BoundingBox;

    struct FixedEngine(Vec<OcrText>);

    #[async_trait::async_trait]
    impl OcrEngine for FixedEngine {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn recognize(&self, request: &OcrRequest<'_>) -> Result<OcrResponse, OcrError> {
            assert_eq!(request.language(), "eng+jpn");
            Ok(OcrResponse::new(self.0.clone()))
        }
    }

    struct BrokenEngine;

    #[async_trait::async_trait]
    impl OcrEngine for BrokenEngine {
        fn name(&self) -> &'static str {
            "broken"
        }

        async fn recognize(&self, _: &OcrRequest<'_>) -> Result<OcrResponse, OcrError> {
            Err(OcrError::unavailable("broken", "gone"))
        }
    }

    fn word(text: &str, confidence: Option<f32>) -> OcrText {
        let entry = OcrText::new(BoundingBox::new(1, 2, 3, 4), text.to_string());
        match confidence {
            Some(value) => entry.with_confidence(value),
            None => entry,
        }
    }

    fn extractor(engine: impl OcrEngine + 'static, min_confidence: f32) -> TextExtractor {
        TextExtractor::new(
            Arc::new(engine),
            ExtractorConfig {
                language: "eng+jpn".into(),
                min_confidence,
            },
        )
    }

    #[tokio::test]
    async fn drops_low_confidence_and_blank_blocks() {
        let engine = FixedEngine(vec![
            word("Name", Some(88.0)),
            word("~", Some(12.0)),
            word("  ", Some(99.0)),
            word("Email", Some(64.0)),
        ]);
        let data = [255u8; 16];
        let plane = LumaPlane::packed(4, 4, &data).unwrap();
        let extraction = extractor(engine, 30.0).extract(&plane, 40).await.unwrap();
        let texts: Vec<&str> = extraction.blocks.iter().map(|b| b.text.as_str()).collect();
        assert_eq!(texts, vec!["Name", "Email"]);
        assert_eq!(extraction.blocks[0].bounding_box.y, 42);
        assert_eq!(extraction.blocks[1].confidence, 64.0);
    }

    #[tokio::test]
    async fn unscored_blocks_only_survive_an_open_filter() {
        let words = || FixedEngine(vec![word("Name", Some(88.0)), word("Email", None)]);
        let data = [255u8; 16];
        let plane = LumaPlane::packed(4, 4, &data).unwrap();

        let filtered = extractor(words(), 30.0).extract(&plane, 0).await.unwrap();
        let texts: Vec<&str> = filtered.blocks.iter().map(|b| b.text.as_str()).collect();
        assert_eq!(texts, vec!["Name"]);

        let open = extractor(words(), 0.0).extract(&plane, 0).await.unwrap();
        assert_eq!(open.blocks.len(), 2);
        assert_eq!(open.blocks[1].confidence, 0.0);
    }

    #[tokio::test]
    async fn engine_errors_are_not_swallowed() {
        let extractor = TextExtractor::new(Arc::new(BrokenEngine), ExtractorConfig::default());
        let data = [0u8; 4];
        let plane = LumaPlane::packed(2, 2, &data).unwrap();
        assert!(matches!(
            extractor.extract(&plane, 0).await,
            Err(OcrError::Unavailable { .. })
        ));
    }
}
