use shotdiff_types::{FocusCandidate, FocusKind};

use super::{FocusDetectionError, FocusHeuristic, RegionRaster};
use crate::config::BorderOptions;
use crate::raster::{ComponentStats, LabelImage};

// Widest outline stroke looked for along each side.
const RING_BAND: u32 = 3;

/// Finds focus rings: closed, hollow, field-sized outlines with rounded
/// corners. Square-cornered outlines are how unfocused fields are drawn and
/// are skipped.
pub struct BorderDetector {
    options: BorderOptions,
    max_components: usize,
}

impl BorderDetector {
    pub fn new(options: BorderOptions, max_components: usize) -> Self {
        Self {
            options,
            max_components,
        }
    }

    fn has_field_size(&self, component: &ComponentStats) -> bool {
        let width = component.width();
        let height = component.height();
        let aspect = width as f32 / height as f32;
        width >= self.options.min_width
            && height >= self.options.min_height
            && height <= self.options.max_height
            && aspect >= self.options.min_aspect
            && aspect <= self.options.max_aspect
    }

    fn is_ring(&self, labels: &LabelImage, component: &ComponentStats) -> bool {
        let ring = Ring { labels, component };
        let limit = component.width().min(component.height()) / 2;
        let Some(inset) = ring.corner_insets(limit) else {
            return false;
        };
        if inset.min < self.options.min_corner_inset {
            return false;
        }
        let margin = inset.max + 1;
        ring.side_coverages(margin)
            .is_some_and(|sides| sides.iter().all(|&c| c >= self.options.min_side_coverage))
            && ring
                .interior_fill()
                .is_some_and(|fill| fill <= self.options.max_interior_fill)
    }
}

impl FocusHeuristic for BorderDetector {
    fn kind(&self) -> FocusKind {
        FocusKind::Border
    }

    fn detect(&self, raster: &RegionRaster<'_>) -> Result<Vec<FocusCandidate>, FocusDetectionError> {
        raster.ensure_usable(self.max_components)?;
        Ok(raster
            .components
            .iter()
            .filter(|component| self.has_field_size(component))
            .filter(|component| self.is_ring(&raster.labels, component))
            .map(|component| FocusCandidate::new(FocusKind::Border, component.bbox()))
            .collect())
    }
}

struct CornerInsets {
    min: u32,
    max: u32,
}

struct Ring<'a> {
    labels: &'a LabelImage,
    component: &'a ComponentStats,
}

impl Ring<'_> {
    fn owns(&self, x: u32, y: u32) -> bool {
        self.labels.get_pixel(x, y)[0] == self.component.label
    }

    /// Pixels skipped along the top and bottom rows before the outline starts,
    /// measured from each of the four corners. `None` when a row has no
    /// outline within `limit` pixels of a corner.
    fn corner_insets(&self, limit: u32) -> Option<CornerInsets> {
        let c = self.component;
        let from_left = |y: u32| (0..=limit).find(|&step| self.owns(c.min_x + step, y));
        let from_right = |y: u32| (0..=limit).find(|&step| self.owns(c.max_x - step, y));
        let insets = [
            from_left(c.min_y)?,
            from_right(c.min_y)?,
            from_left(c.max_y)?,
            from_right(c.max_y)?,
        ];
        Some(CornerInsets {
            min: insets.iter().copied().min().unwrap_or(0),
            max: insets.iter().copied().max().unwrap_or(0),
        })
    }

    /// Covered share of the top, bottom, left and right sides, ignoring
    /// `margin` pixels at each end.
    fn side_coverages(&self, margin: u32) -> Option<[f32; 4]> {
        let c = self.component;
        let band = RING_BAND.min(c.height() / 2).min(c.width() / 2).max(1);
        let xs = (c.min_x + margin)..=(c.max_x.checked_sub(margin)?);
        let ys = (c.min_y + margin)..=(c.max_y.checked_sub(margin)?);
        if xs.is_empty() || ys.is_empty() {
            return None;
        }

        let coverage = |positions: std::ops::RangeInclusive<u32>, hit: &dyn Fn(u32) -> bool| {
            let total = positions.clone().count() as f32;
            positions.filter(|&p| hit(p)).count() as f32 / total
        };
        let top = coverage(xs.clone(), &|x| (0..band).any(|d| self.owns(x, c.min_y + d)));
        let bottom = coverage(xs, &|x| (0..band).any(|d| self.owns(x, c.max_y - d)));
        let left = coverage(ys.clone(), &|y| (0..band).any(|d| self.owns(c.min_x + d, y)));
        let right = coverage(ys, &|y| (0..band).any(|d| self.owns(c.max_x - d, y)));
        Some([top, bottom, left, right])
    }

    /// Share of the area inside the side bands that belongs to the outline.
    fn interior_fill(&self) -> Option<f32> {
        let c = self.component;
        if c.width() <= 2 * RING_BAND || c.height() <= 2 * RING_BAND {
            return None;
        }
        let xs = (c.min_x + RING_BAND)..=(c.max_x - RING_BAND);
        let ys = (c.min_y + RING_BAND)..=(c.max_y - RING_BAND);
        let area = xs.clone().count() * ys.clone().count();
        let inked = ys
            .flat_map(|y| xs.clone().map(move |x| (x, y)))
            .filter(|&(x, y)| self.owns(x, y))
            .count();
        Some(inked as f32 / area as f32)
    }
}
