//! Pixel-level analysis of UI screenshots: where the header ends and which
//! focus indicators are visible below it.

pub mod focus;

mod config;
mod header;
mod raster;

pub use config::{
    BoldOptions, BorderOptions, CursorOptions, DEFAULT_CROP_PERCENTAGE,
    DEFAULT_FOREGROUND_THRESHOLD, DEFAULT_JUMP_THRESHOLD, DEFAULT_MIN_IMAGE_HEIGHT,
    FocusDetectorConfig, HeaderLocatorConfig,
};
pub use focus::{FocusDetectionError, FocusDetector, FocusHeuristic, RegionRaster};
pub use header::{HeaderLocator, crop_body};
pub use raster::{ComponentStats, LabelImage};
