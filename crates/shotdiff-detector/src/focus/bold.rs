use image::GrayImage;
use imageproc::distance_transform::Norm;
use imageproc::morphology::dilate;
use shotdiff_types::{FocusCandidate, FocusKind};

use super::{FocusDetectionError, FocusHeuristic, RegionRaster};
use crate::config::BoldOptions;
use crate::raster::{ComponentStats, FOREGROUND, LabelImage, label_components, median};

/// Finds words rendered noticeably heavier than the rest of the text.
///
/// Glyph strokes are merged into word blobs with a one-pixel dilation; a
/// blob whose ink density clearly exceeds the median density is bold.
pub struct BoldDetector {
    options: BoldOptions,
    max_components: usize,
}

struct WordBlob {
    ink: ComponentStats,
    density: f32,
}

impl BoldDetector {
    pub fn new(options: BoldOptions, max_components: usize) -> Self {
        Self {
            options,
            max_components,
        }
    }

    fn words(&self, mask: &GrayImage) -> Vec<WordBlob> {
        let merged = dilate(mask, Norm::LInf, 1);
        let (labels, blobs) = label_components(&merged);
        ink_per_blob(mask, &labels, blobs.len())
            .into_iter()
            .flatten()
            .filter_map(|ink| {
                let density = ink.fill();
                self.is_text_like(&ink, density)
                    .then_some(WordBlob { ink, density })
            })
            .collect()
    }

    fn is_text_like(&self, ink: &ComponentStats, density: f32) -> bool {
        let height = ink.height();
        ink.width() >= self.options.min_width
            && height >= self.options.min_height
            && height <= self.options.max_height
            && density >= self.options.min_density
            && density <= self.options.max_density
    }
}

/// Bounding box and pixel count of the original ink under each dilated blob.
fn ink_per_blob(
    mask: &GrayImage,
    labels: &LabelImage,
    blob_count: usize,
) -> Vec<Option<ComponentStats>> {
    let mut ink: Vec<Option<ComponentStats>> = Vec::with_capacity(blob_count + 1);
    for (x, y, pixel) in mask.enumerate_pixels() {
        if pixel[0] != FOREGROUND {
            continue;
        }
        let label = labels.get_pixel(x, y)[0];
        let idx = label as usize;
        if idx >= ink.len() {
            ink.resize(idx + 1, None);
        }
        ink[idx]
            .get_or_insert_with(|| ComponentStats::new(label, x, y))
            .include(x, y);
    }
    ink
}

impl FocusHeuristic for BoldDetector {
    fn kind(&self) -> FocusKind {
        FocusKind::Bold
    }

    fn detect(&self, raster: &RegionRaster<'_>) -> Result<Vec<FocusCandidate>, FocusDetectionError> {
        raster.ensure_usable(self.max_components)?;
        let words = self.words(&raster.mask);
        if words.len() < self.options.min_components {
            return Ok(Vec::new());
        }
        let densities: Vec<f32> = words.iter().map(|word| word.density).collect();
        let typical = median(&densities);
        if typical <= 0.0 {
            return Ok(Vec::new());
        }
        let threshold = typical * self.options.density_ratio;
        let mut bold: Vec<FocusCandidate> = words
            .iter()
            .filter(|word| word.density >= threshold)
            .map(|word| FocusCandidate::new(FocusKind::Bold, word.ink.bbox()))
            .collect();
        bold.sort_by_key(|candidate| (candidate.extent.y, candidate.extent.x));
        Ok(bold)
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::*;
    use crate::config::FocusDetectorConfig;
    use image::RgbImage;
    use shotdiff_types::BoundingBox;

    fn detect(image: &RgbImage) -> Vec<FocusCandidate> {
        let config = FocusDetectorConfig::default();
        let raster = RegionRaster::analyze(image, &config);
        BoldDetector::new(config.bold.clone(), config.max_components)
            .detect(&raster)
            .unwrap()
    }

    #[test]
    fn heavy_word_among_regular_text_is_bold() {
        let mut image = canvas(300, 80);
        word(&mut image, 10, 20, 6, 1, 2, 10);
        word(&mut image, 50, 20, 6, 1, 2, 10);
        word(&mut image, 90, 20, 6, 1, 2, 10);
        word(&mut image, 130, 20, 6, 2, 1, 10);
        let found = detect(&image);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].extent, BoundingBox::new(130, 20, 17, 10));
    }

    #[test]
    fn uniform_text_has_no_bold() {
        let mut image = canvas(300, 80);
        for i in 0..5 {
            word(&mut image, 10 + i * 40, 20, 6, 1, 2, 10);
        }
        assert!(detect(&image).is_empty());
    }

    #[test]
    fn too_few_words_give_no_baseline() {
        let mut image = canvas(300, 80);
        word(&mut image, 10, 20, 6, 1, 2, 10);
        word(&mut image, 50, 20, 6, 2, 1, 10);
        assert!(detect(&image).is_empty());
    }

    #[test]
    fn solid_blocks_and_outlines_do_not_count_as_text() {
        let mut image = canvas(400, 120);
        word(&mut image, 10, 20, 6, 1, 2, 10);
        word(&mut image, 50, 20, 6, 2, 1, 10);
        fill(&mut image, 100, 20, 30, 20, INK);
        outline(&mut image, 150, 15, 200, 30, 1, 0, GREY);
        assert!(detect(&image).is_empty());
    }
}
