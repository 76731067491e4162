use image::{GrayImage, RgbImage};
use shotdiff_types::{FocusCandidate, FocusExtraction, FocusKind};
use thiserror::Error;

#[cfg(feature = "detector-parallel")]
use rayon::prelude::*;

use crate::config::FocusDetectorConfig;
use crate::raster::{ComponentStats, LabelImage, foreground_mask, label_components};

pub mod bold;
pub mod border;
pub mod cursor;
mod dedup;

pub use bold::BoldDetector;
pub use border::BorderDetector;
pub use cursor::CursorDetector;

#[derive(Debug, Error)]
pub enum FocusDetectionError {
    #[error("focus search region is empty ({width}x{height})")]
    EmptyRegion { width: u32, height: u32 },
    #[error("region has {count} stroke components, more than the limit of {limit}")]
    TooManyComponents { count: usize, limit: usize },
    #[error("{kind} heuristic failed: {message}")]
    Heuristic { kind: FocusKind, message: String },
}

/// Pre-computed view of a focus-search region shared by all heuristics.
pub struct RegionRaster<'a> {
    pub image: &'a RgbImage,
    /// 255 where a pixel stands out from the dominant background colour.
    pub mask: GrayImage,
    pub labels: LabelImage,
    pub components: Vec<ComponentStats>,
}

impl<'a> RegionRaster<'a> {
    pub fn analyze(image: &'a RgbImage, config: &FocusDetectorConfig) -> Self {
        let mask = foreground_mask(image, config.foreground_threshold);
        let (labels, components) = label_components(&mask);
        Self {
            image,
            mask,
            labels,
            components,
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub(crate) fn ensure_usable(&self, limit: usize) -> Result<(), FocusDetectionError> {
        if self.width() == 0 || self.height() == 0 {
            return Err(FocusDetectionError::EmptyRegion {
                width: self.width(),
                height: self.height(),
            });
        }
        if self.components.len() > limit {
            return Err(FocusDetectionError::TooManyComponents {
                count: self.components.len(),
                limit,
            });
        }
        Ok(())
    }
}

/// One independent way of spotting a focus indicator.
pub trait FocusHeuristic: Send + Sync {
    fn kind(&self) -> FocusKind;

    /// Candidates in region coordinates. An empty vector means "nothing seen".
    fn detect(&self, raster: &RegionRaster<'_>) -> Result<Vec<FocusCandidate>, FocusDetectionError>;
}

trait HeuristicBackend: Sync {
    fn kind(&self) -> FocusKind;
    fn build(&self, config: &FocusDetectorConfig) -> Box<dyn FocusHeuristic>;
}

struct CursorBackend;

impl HeuristicBackend for CursorBackend {
    fn kind(&self) -> FocusKind {
        FocusKind::Cursor
    }

    fn build(&self, config: &FocusDetectorConfig) -> Box<dyn FocusHeuristic> {
        Box::new(CursorDetector::new(config.cursor.clone(), config.max_components))
    }
}

struct BorderBackend;

impl HeuristicBackend for BorderBackend {
    fn kind(&self) -> FocusKind {
        FocusKind::Border
    }

    fn build(&self, config: &FocusDetectorConfig) -> Box<dyn FocusHeuristic> {
        Box::new(BorderDetector::new(config.border.clone(), config.max_components))
    }
}

struct BoldBackend;

impl HeuristicBackend for BoldBackend {
    fn kind(&self) -> FocusKind {
        FocusKind::Bold
    }

    fn build(&self, config: &FocusDetectorConfig) -> Box<dyn FocusHeuristic> {
        Box::new(BoldDetector::new(config.bold.clone(), config.max_components))
    }
}

static CURSOR_BACKEND: CursorBackend = CursorBackend;
static BORDER_BACKEND: BorderBackend = BorderBackend;
static BOLD_BACKEND: BoldBackend = BoldBackend;

fn backend_for_kind(kind: FocusKind) -> &'static dyn HeuristicBackend {
    match kind {
        FocusKind::Cursor => &CURSOR_BACKEND,
        FocusKind::Border => &BORDER_BACKEND,
        FocusKind::Bold => &BOLD_BACKEND,
    }
}

/// Runs every configured heuristic over a region and merges their findings.
pub struct FocusDetector {
    config: FocusDetectorConfig,
    heuristics: Vec<Box<dyn FocusHeuristic>>,
}

impl FocusDetector {
    pub fn new(config: FocusDetectorConfig) -> Self {
        let mut kinds: Vec<FocusKind> = Vec::with_capacity(config.heuristics.len());
        for &kind in &config.heuristics {
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
        let heuristics = kinds
            .into_iter()
            .map(|kind| {
                let backend = backend_for_kind(kind);
                debug_assert_eq!(backend.kind(), kind);
                backend.build(&config)
            })
            .collect();
        Self { config, heuristics }
    }

    /// Builds a detector from explicit heuristics, bypassing the registry.
    pub fn with_heuristics(
        config: FocusDetectorConfig,
        heuristics: Vec<Box<dyn FocusHeuristic>>,
    ) -> Self {
        Self { config, heuristics }
    }

    pub fn heuristic_kinds(&self) -> Vec<FocusKind> {
        self.heuristics.iter().map(|h| h.kind()).collect()
    }

    /// Detects focus indicators in `region`, which starts `offset_y` rows below
    /// the top of a `frame_width` x `frame_height` screenshot. Returned
    /// positions are in screenshot coordinates.
    ///
    /// A failing heuristic is logged and contributes nothing; the others
    /// still run.
    pub fn detect(
        &self,
        region: &RgbImage,
        offset_y: u32,
        frame_width: u32,
        frame_height: u32,
    ) -> FocusExtraction {
        if region.width() == 0 || region.height() == 0 {
            return FocusExtraction::empty(frame_width, frame_height);
        }
        let raster = RegionRaster::analyze(region, &self.config);
        let found = self.run_heuristics(&raster);
        let candidates = dedup::resolve_overlaps(found)
            .into_iter()
            .map(|candidate| candidate.offset_y(offset_y))
            .collect();
        FocusExtraction::new(candidates, frame_width, frame_height)
    }

    #[cfg(not(feature = "detector-parallel"))]
    fn run_heuristics(&self, raster: &RegionRaster<'_>) -> Vec<FocusCandidate> {
        self.heuristics
            .iter()
            .flat_map(|heuristic| collect_soft(heuristic.as_ref(), raster))
            .collect()
    }

    #[cfg(feature = "detector-parallel")]
    fn run_heuristics(&self, raster: &RegionRaster<'_>) -> Vec<FocusCandidate> {
        let per_heuristic: Vec<Vec<FocusCandidate>> = self
            .heuristics
            .par_iter()
            .map(|heuristic| collect_soft(heuristic.as_ref(), raster))
            .collect();
        per_heuristic.into_iter().flatten().collect()
    }
}

fn collect_soft(heuristic: &dyn FocusHeuristic, raster: &RegionRaster<'_>) -> Vec<FocusCandidate> {
    match heuristic.detect(raster) {
        Ok(candidates) => {
            tracing::debug!(
                heuristic = heuristic.kind().as_str(),
                count = candidates.len(),
                "focus heuristic finished"
            );
            candidates
        }
        Err(err) => {
            tracing::warn!(
                heuristic = heuristic.kind().as_str(),
                error = %err,
                "focus heuristic skipped"
            );
            Vec::new()
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use image::{Rgb, RgbImage};

    pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
    pub const INK: Rgb<u8> = Rgb([20, 20, 20]);
    pub const RING: Rgb<u8> = Rgb([59, 130, 246]);
    pub const GREY: Rgb<u8> = Rgb([204, 204, 204]);

    pub fn canvas(width: u32, height: u32) -> RgbImage {
        RgbImage::from_pixel(width, height, WHITE)
    }

    pub fn fill(image: &mut RgbImage, x: u32, y: u32, w: u32, h: u32, color: Rgb<u8>) {
        for yy in y..y + h {
            for xx in x..x + w {
                image.put_pixel(xx, yy, color);
            }
        }
    }

    /// A fake word: `strokes` vertical bars of `stroke` px separated by `gap` px.
    pub fn word(image: &mut RgbImage, x: u32, y: u32, strokes: u32, stroke: u32, gap: u32, h: u32) {
        for i in 0..strokes {
            fill(image, x + i * (stroke + gap), y, stroke, h, INK);
        }
    }

    /// Rectangle outline `thickness` px wide. Corners within `radius` px are
    /// chamfered with a diagonal band of the same thickness.
    #[allow(clippy::too_many_arguments)]
    pub fn outline(
        image: &mut RgbImage,
        x: u32,
        y: u32,
        w: u32,
        h: u32,
        thickness: u32,
        radius: u32,
        color: Rgb<u8>,
    ) {
        for yy in y..y + h {
            for xx in x..x + w {
                let dx = (xx - x).min(x + w - 1 - xx);
                let dy = (yy - y).min(y + h - 1 - yy);
                let on = if dx < radius && dy < radius {
                    let diagonal = dx + dy;
                    diagonal >= radius && diagonal < radius + thickness
                } else {
                    dx < thickness || dy < thickness
                };
                if on {
                    image.put_pixel(xx, yy, color);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use shotdiff_types::BoundingBox;

    struct FailingHeuristic;

    impl FocusHeuristic for FailingHeuristic {
        fn kind(&self) -> FocusKind {
            FocusKind::Bold
        }

        fn detect(&self, _: &RegionRaster<'_>) -> Result<Vec<FocusCandidate>, FocusDetectionError> {
            Err(FocusDetectionError::Heuristic {
                kind: FocusKind::Bold,
                message: "boom".into(),
            })
        }
    }

    struct FixedHeuristic(FocusCandidate);

    impl FocusHeuristic for FixedHeuristic {
        fn kind(&self) -> FocusKind {
            self.0.kind
        }

        fn detect(&self, _: &RegionRaster<'_>) -> Result<Vec<FocusCandidate>, FocusDetectionError> {
            Ok(vec![self.0])
        }
    }

    fn focused_form() -> RgbImage {
        let mut image = canvas(400, 200);
        // Unfocused square field with a value.
        outline(&mut image, 20, 20, 200, 30, 1, 0, GREY);
        word(&mut image, 26, 29, 6, 1, 2, 10);
        // Focused rounded field with a value and a caret after it.
        outline(&mut image, 20, 80, 200, 30, 2, 3, RING);
        word(&mut image, 26, 89, 6, 1, 2, 10);
        fill(&mut image, 46, 87, 1, 14, INK);
        image
    }

    #[test]
    fn registry_builds_each_kind_once() {
        let config = FocusDetectorConfig {
            heuristics: vec![FocusKind::Bold, FocusKind::Cursor, FocusKind::Bold],
            ..FocusDetectorConfig::default()
        };
        let detector = FocusDetector::new(config);
        assert_eq!(
            detector.heuristic_kinds(),
            vec![FocusKind::Bold, FocusKind::Cursor]
        );
    }

    #[test]
    fn failing_heuristic_does_not_abort_the_others() {
        let cursor = FocusCandidate::new(FocusKind::Cursor, BoundingBox::new(5, 5, 1, 12));
        let detector = FocusDetector::with_heuristics(
            FocusDetectorConfig::default(),
            vec![Box::new(FailingHeuristic), Box::new(FixedHeuristic(cursor))],
        );
        let extraction = detector.detect(&canvas(50, 50), 10, 50, 60);
        assert_eq!(extraction.candidates.len(), 1);
        assert_eq!(extraction.candidates[0].extent.y, 15);
        assert_eq!(extraction.frame_height, 60);
    }

    #[test]
    fn blank_region_yields_empty_extraction() {
        let detector = FocusDetector::new(FocusDetectorConfig::default());
        let extraction = detector.detect(&canvas(300, 200), 0, 300, 200);
        assert!(extraction.is_empty());
        let empty = detector.detect(&RgbImage::new(0, 0), 0, 0, 0);
        assert!(empty.is_empty());
    }

    #[test]
    fn caret_inside_focus_ring_survives_deduplication() {
        let detector = FocusDetector::new(FocusDetectorConfig::default());
        let extraction = detector.detect(&focused_form(), 40, 400, 240);
        assert_eq!(extraction.candidates.len(), 1);
        let caret = extraction.candidates[0];
        assert_eq!(caret.kind, FocusKind::Cursor);
        assert_eq!(caret.extent, BoundingBox::new(46, 127, 1, 14));
    }

    #[test]
    fn detection_is_deterministic() {
        let detector = FocusDetector::new(FocusDetectorConfig::default());
        let image = focused_form();
        let first = detector.detect(&image, 0, 400, 200);
        for _ in 0..3 {
            assert_eq!(detector.detect(&image, 0, 400, 200), first);
        }
    }
}
