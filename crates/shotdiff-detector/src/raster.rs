//! Raster helpers shared by the header locator and the focus heuristics.
//!
//! Every function returns a new buffer; inputs are never modified.

use std::cmp::Ordering;

use image::{GrayImage, ImageBuffer, Luma, Rgb, RgbImage};
use imageproc::region_labelling::{Connectivity, connected_components};
use shotdiff_types::BoundingBox;

pub(crate) const FOREGROUND: u8 = 255;

// 4 bits per channel.
const BUCKET_SHIFT: u32 = 4;
const BUCKETS: usize = 1 << 12;

pub type LabelImage = ImageBuffer<Luma<u32>, Vec<u32>>;

/// Reusable histogram for finding the most common colour of a pixel run.
pub(crate) struct ColorHistogram {
    counts: Vec<u32>,
    sums: Vec<[u64; 3]>,
    touched: Vec<usize>,
}

impl ColorHistogram {
    pub(crate) fn new() -> Self {
        Self {
            counts: vec![0; BUCKETS],
            sums: vec![[0; 3]; BUCKETS],
            touched: Vec::new(),
        }
    }

    /// Mean colour of the most populated bucket; ties go to the lowest bucket.
    pub(crate) fn dominant<'a, I>(&mut self, pixels: I) -> Option<[u8; 3]>
    where
        I: IntoIterator<Item = &'a Rgb<u8>>,
    {
        for &idx in &self.touched {
            self.counts[idx] = 0;
            self.sums[idx] = [0; 3];
        }
        self.touched.clear();

        for pixel in pixels {
            let [r, g, b] = pixel.0;
            let idx = ((r as usize >> BUCKET_SHIFT) << 8)
                | ((g as usize >> BUCKET_SHIFT) << 4)
                | (b as usize >> BUCKET_SHIFT);
            if self.counts[idx] == 0 {
                self.touched.push(idx);
            }
            self.counts[idx] += 1;
            let sum = &mut self.sums[idx];
            sum[0] += r as u64;
            sum[1] += g as u64;
            sum[2] += b as u64;
        }

        let best = self
            .touched
            .iter()
            .copied()
            .max_by(|&a, &b| self.counts[a].cmp(&self.counts[b]).then(b.cmp(&a)))?;
        let count = self.counts[best] as u64;
        let sum = self.sums[best];
        Some([
            (sum[0] / count) as u8,
            (sum[1] / count) as u8,
            (sum[2] / count) as u8,
        ])
    }
}

pub(crate) fn color_distance(a: [u8; 3], b: [u8; 3]) -> u32 {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| (x as i32 - y as i32).unsigned_abs())
        .sum()
}

/// Marks pixels whose colour is further than `threshold` (L1 over RGB) from
/// the region's dominant colour.
pub(crate) fn foreground_mask(image: &RgbImage, threshold: u32) -> GrayImage {
    let mut histogram = ColorHistogram::new();
    let Some(background) = histogram.dominant(image.pixels()) else {
        return GrayImage::new(image.width(), image.height());
    };
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        if color_distance(image.get_pixel(x, y).0, background) > threshold {
            Luma([FOREGROUND])
        } else {
            Luma([0])
        }
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentStats {
    pub label: u32,
    pub area: u32,
    pub min_x: u32,
    pub max_x: u32,
    pub min_y: u32,
    pub max_y: u32,
}

impl ComponentStats {
    pub(crate) fn new(label: u32, x: u32, y: u32) -> Self {
        Self {
            label,
            area: 0,
            min_x: x,
            max_x: x,
            min_y: y,
            max_y: y,
        }
    }

    pub(crate) fn include(&mut self, x: u32, y: u32) {
        self.area += 1;
        self.min_x = self.min_x.min(x);
        self.max_x = self.max_x.max(x);
        self.min_y = self.min_y.min(y);
        self.max_y = self.max_y.max(y);
    }

    pub fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    pub fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }

    pub fn bbox(&self) -> BoundingBox {
        BoundingBox::from_corners(self.min_x, self.min_y, self.max_x, self.max_y)
    }

    /// Share of the bounding box covered by the component.
    pub fn fill(&self) -> f32 {
        self.area as f32 / (self.width() as f32 * self.height() as f32)
    }
}

/// Labels 8-connected foreground regions of `mask` and summarizes each one.
///
/// Components are returned in reading order (top, then left).
pub(crate) fn label_components(mask: &GrayImage) -> (LabelImage, Vec<ComponentStats>) {
    if mask.width() == 0 || mask.height() == 0 {
        return (LabelImage::new(mask.width(), mask.height()), Vec::new());
    }
    let labels = connected_components(mask, Connectivity::Eight, Luma([0u8]));
    let mut stats: Vec<Option<ComponentStats>> = Vec::new();
    for (x, y, pixel) in labels.enumerate_pixels() {
        let label = pixel[0];
        if label == 0 {
            continue;
        }
        let idx = label as usize;
        if idx >= stats.len() {
            stats.resize(idx + 1, None);
        }
        stats[idx]
            .get_or_insert_with(|| ComponentStats::new(label, x, y))
            .include(x, y);
    }
    let mut components: Vec<ComponentStats> = stats.into_iter().flatten().collect();
    components.sort_by_key(|c| (c.min_y, c.min_x, c.label));
    (labels, components)
}

pub(crate) fn percentile_in_place(values: &mut [f32], pct: f32) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let len = values.len();
    let target = ((len - 1) as f32 * pct.clamp(0.0, 1.0)).round() as usize;
    let (_, value, _) =
        values.select_nth_unstable_by(target, |a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    *value
}

pub(crate) fn median(values: &[f32]) -> f32 {
    let mut buf = values.to_vec();
    percentile_in_place(&mut buf, 0.5)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dominant_color_ignores_minority_pixels() {
        let mut pixels = vec![Rgb([250, 250, 250]); 90];
        pixels.extend(vec![Rgb([10, 10, 10]); 10]);
        let mut histogram = ColorHistogram::new();
        assert_eq!(histogram.dominant(pixels.iter()), Some([250, 250, 250]));
        assert_eq!(histogram.dominant([].iter()), None);
    }

    #[test]
    fn components_come_back_in_reading_order() {
        let mut mask = GrayImage::new(20, 10);
        for y in 6..9 {
            mask.put_pixel(2, y, Luma([FOREGROUND]));
        }
        for x in 10..15 {
            mask.put_pixel(x, 1, Luma([FOREGROUND]));
        }
        let (_, components) = label_components(&mask);
        assert_eq!(components.len(), 2);
        assert_eq!((components[0].min_x, components[0].width()), (10, 5));
        assert_eq!((components[1].min_y, components[1].height()), (6, 3));
        assert_eq!(components[1].fill(), 1.0);
    }

    #[test]
    fn foreground_mask_of_flat_image_is_empty() {
        let image = RgbImage::from_pixel(8, 8, Rgb([30, 60, 90]));
        let mask = foreground_mask(&image, 40);
        assert!(mask.pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn median_picks_middle_value() {
        assert_eq!(median(&[5.0, 1.0, 3.0]), 3.0);
        assert_eq!(median(&[]), 0.0);
    }
}
