use shotdiff_types::{FocusCandidate, FocusKind};

use super::{FocusDetectionError, FocusHeuristic, RegionRaster};
use crate::config::CursorOptions;
use crate::raster::ComponentStats;

/// Finds text carets: thin, solid, upright strokes noticeably taller than
/// the glyphs beside them.
pub struct CursorDetector {
    options: CursorOptions,
    max_components: usize,
}

impl CursorDetector {
    pub fn new(options: CursorOptions, max_components: usize) -> Self {
        Self {
            options,
            max_components,
        }
    }

    fn is_caret_shaped(&self, component: &ComponentStats) -> bool {
        let width = component.width();
        let height = component.height();
        width <= self.options.max_width
            && height > self.options.min_height
            && height < self.options.max_height
            && height as f32 / width as f32 >= self.options.min_aspect
            && component.fill() >= self.options.min_fill
    }

    /// Tallest glyph-sized component sharing rows with `caret` within the
    /// horizontal search window.
    fn tallest_neighbour(&self, caret: &ComponentStats, all: &[ComponentStats]) -> Option<u32> {
        let window = (caret.height() as f32 * self.options.neighborhood).ceil() as u32;
        let left = caret.min_x.saturating_sub(window);
        let right = caret.max_x.saturating_add(window);
        all.iter()
            .filter(|other| other.label != caret.label)
            .filter(|other| other.width() <= window && other.height() < self.options.max_height)
            .filter(|other| other.min_y <= caret.max_y && caret.min_y <= other.max_y)
            .filter(|other| other.max_x >= left && other.min_x <= right)
            .map(|other| other.height())
            .max()
    }
}

impl FocusHeuristic for CursorDetector {
    fn kind(&self) -> FocusKind {
        FocusKind::Cursor
    }

    fn detect(&self, raster: &RegionRaster<'_>) -> Result<Vec<FocusCandidate>, FocusDetectionError> {
        raster.ensure_usable(self.max_components)?;
        let candidates = raster
            .components
            .iter()
            .filter(|component| self.is_caret_shaped(component))
            .filter(|component| match self.tallest_neighbour(component, &raster.components) {
                Some(tallest) => {
                    component.height() as f32 >= tallest as f32 * self.options.min_height_ratio
                }
                None => true,
            })
            .map(|component| FocusCandidate::new(FocusKind::Cursor, component.bbox()))
            .collect();
        Ok(candidates)
    }
}
