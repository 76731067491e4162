use image::RgbImage;
use image::imageops;
use shotdiff_types::HeaderBoundary;

use crate::config::HeaderLocatorConfig;
use crate::raster::{ColorHistogram, color_distance};

/// Finds where volatile header chrome ends and comparable content begins.
///
/// Runs as two stages: a dynamic colour-transition scan, then a fixed
/// percentage fallback when the scan finds nothing acceptable.
#[derive(Debug, Clone, Default)]
pub struct HeaderLocator {
    config: HeaderLocatorConfig,
}

impl HeaderLocator {
    pub fn new(config: HeaderLocatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HeaderLocatorConfig {
        &self.config
    }

    pub fn locate(&self, image: &RgbImage) -> HeaderBoundary {
        let height = image.height();
        if height < self.config.min_image_height.max(1) {
            return HeaderBoundary::fallback(0);
        }
        match self.scan_transition(image) {
            Some(offset) => {
                tracing::debug!(offset, height, "dynamic header boundary");
                HeaderBoundary::dynamic(offset)
            }
            None => {
                let offset = self.fallback_offset(height);
                tracing::debug!(offset, height, "header boundary fell back to fixed crop");
                HeaderBoundary::fallback(offset)
            }
        }
    }

    fn fallback_offset(&self, height: u32) -> u32 {
        let pct = self.config.default_crop_percentage.clamp(0.0, 1.0);
        let offset = (height as f64 * pct).floor() as u32;
        offset.min(height.saturating_sub(1))
    }

    fn scan_transition(&self, image: &RgbImage) -> Option<u32> {
        let (width, height) = image.dimensions();
        if width == 0 {
            return None;
        }
        let start = self.config.min_header_height.max(1);
        let scan_end = ((height as f64 * self.config.scan_ratio).floor() as u32).min(height);
        let limit = (height as f64 * self.config.max_header_ratio).floor() as u32;
        if start >= scan_end {
            return None;
        }

        let mut histogram = ColorHistogram::new();
        let mut dominant_row = |y: u32| {
            let row = (0..width).map(|x| image.get_pixel(x, y));
            histogram.dominant(row)
        };

        let mut previous = dominant_row(start - 1)?;
        for y in start..scan_end {
            let current = dominant_row(y)?;
            if color_distance(previous, current) > self.config.jump_threshold {
                let boundary = y.saturating_add(self.config.boundary_margin);
                return (boundary < limit && boundary < height).then_some(boundary);
            }
            previous = current;
        }
        None
    }
}

/// Copies the part of `image` below the header boundary into a new buffer.
pub fn crop_body(image: &RgbImage, boundary: &HeaderBoundary) -> RgbImage {
    let (width, height) = image.dimensions();
    let offset = boundary.offset_px.min(height);
    imageops::crop_imm(image, 0, offset, width, height - offset).to_image()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use shotdiff_types::BoundaryMethod;

    const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
    const BRAND: Rgb<u8> = Rgb([30, 64, 175]);

    fn page(width: u32, height: u32, header_rows: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |_, y| if y < header_rows { BRAND } else { WHITE })
    }

    #[test]
    fn short_images_have_no_header() {
        let locator = HeaderLocator::default();
        for height in [1, 10, 49] {
            let boundary = locator.locate(&page(100, height, 5));
            assert_eq!(boundary.offset_px, 0);
        }
        let empty = RgbImage::new(0, 0);
        assert_eq!(locator.locate(&empty).offset_px, 0);
    }

    #[test]
    fn solid_header_band_is_found_dynamically() {
        let locator = HeaderLocator::default();
        let image = page(200, 400, 48);
        let boundary = locator.locate(&image);
        assert_eq!(boundary.method, BoundaryMethod::Dynamic);
        assert_eq!(boundary.offset_px, 58);
    }

    #[test]
    fn uniform_page_falls_back_to_percentage() {
        let locator = HeaderLocator::default();
        let image = page(200, 333, 0);
        let boundary = locator.locate(&image);
        assert_eq!(boundary.method, BoundaryMethod::Fallback);
        assert_eq!(boundary.offset_px, (333.0f64 * 0.12).floor() as u32);
    }

    #[test]
    fn text_rows_do_not_look_like_a_header_edge() {
        let locator = HeaderLocator::default();
        let mut image = page(300, 400, 0);
        // A line of dark glyphs covering a fifth of the row.
        for y in 30..40 {
            for x in (20..80).step_by(2) {
                image.put_pixel(x, y, Rgb([0, 0, 0]));
            }
        }
        assert_eq!(locator.locate(&image).method, BoundaryMethod::Fallback);
    }

    #[test]
    fn transitions_too_deep_are_rejected() {
        let locator = HeaderLocator::new(HeaderLocatorConfig {
            scan_ratio: 0.5,
            ..HeaderLocatorConfig::default()
        });
        let image = page(100, 200, 70);
        let boundary = locator.locate(&image);
        assert_eq!(boundary.method, BoundaryMethod::Fallback);
        assert_eq!(boundary.offset_px, 24);
    }

    #[test]
    fn body_crop_starts_at_boundary() {
        let image = page(10, 100, 20);
        let body = crop_body(&image, &HeaderBoundary::dynamic(30));
        assert_eq!(body.dimensions(), (10, 70));
        assert_eq!(*body.get_pixel(0, 0), WHITE);
    }
}
