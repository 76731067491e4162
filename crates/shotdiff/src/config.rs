use std::num::NonZeroUsize;
use std::thread;
use std::time::Duration;

use shotdiff_comparator::{
    DEFAULT_FOCUS_TOLERANCE, DEFAULT_MIN_BLOCK_CHARS, DEFAULT_SIMILARITY_THRESHOLD,
    FocusComparatorConfig, SeverityBands, TextComparatorConfig,
};
use shotdiff_detector::{DEFAULT_CROP_PERCENTAGE, FocusDetectorConfig, HeaderLocatorConfig};
use shotdiff_ocr::{DEFAULT_LANGUAGE, DEFAULT_MIN_CONFIDENCE, ExtractorConfig};

use crate::settings::ConfigError;

pub const DEFAULT_MAX_DIMENSION_DRIFT: f64 = 0.10;
pub const DEFAULT_OCR_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything that influences how a single pair is judged.
#[derive(Debug, Clone, PartialEq)]
pub struct CompareConfig {
    pub ignore_case: bool,
    pub similarity_threshold: f64,
    pub default_crop_percentage: f64,
    pub enable_focus_detection: bool,
    pub ocr_language: String,
    /// OCR blocks below this confidence (0-100) are dropped.
    pub min_ocr_confidence: f32,
    pub bands: SeverityBands,
    pub min_block_chars: usize,
    pub focus_tolerance_ratio: f32,
    /// Tuning of the cursor, border and bold heuristics.
    pub focus_detector: FocusDetectorConfig,
    /// Largest relative width or height difference still compared.
    pub max_dimension_drift: f64,
    pub ocr_timeout: Duration,
    /// Pairs processed concurrently.
    pub workers: usize,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            ignore_case: true,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            default_crop_percentage: DEFAULT_CROP_PERCENTAGE,
            enable_focus_detection: true,
            ocr_language: DEFAULT_LANGUAGE.to_string(),
            min_ocr_confidence: DEFAULT_MIN_CONFIDENCE,
            bands: SeverityBands::default(),
            min_block_chars: DEFAULT_MIN_BLOCK_CHARS,
            focus_tolerance_ratio: DEFAULT_FOCUS_TOLERANCE,
            focus_detector: FocusDetectorConfig::default(),
            max_dimension_drift: DEFAULT_MAX_DIMENSION_DRIFT,
            ocr_timeout: DEFAULT_OCR_TIMEOUT,
            workers: default_workers(),
        }
    }
}

pub fn default_workers() -> usize {
    thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

impl CompareConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        unit_interval("similarity_threshold", self.similarity_threshold)?;
        unit_interval("crop_percentage", self.default_crop_percentage)?;
        unit_interval("focus_tolerance", self.focus_tolerance_ratio as f64)?;
        unit_interval("max_dimension_drift", self.max_dimension_drift)?;
        if !(0.0..=100.0).contains(&self.min_ocr_confidence) {
            return Err(invalid("min_ocr_confidence", self.min_ocr_confidence));
        }
        if self.ocr_language.trim().is_empty() {
            return Err(invalid("ocr_language", "''"));
        }
        if self.ocr_timeout.is_zero() {
            return Err(invalid("ocr_timeout", 0));
        }
        if self.workers == 0 {
            return Err(invalid("workers", 0));
        }
        self.bands
            .validate()
            .map_err(|err| invalid("bands", err))?;
        self.validate_focus_detector()
    }

    fn validate_focus_detector(&self) -> Result<(), ConfigError> {
        let focus = &self.focus_detector;
        if focus.heuristics.is_empty() {
            return Err(invalid("focus.heuristics", "[]"));
        }
        if focus.foreground_threshold == 0 {
            return Err(invalid("focus.foreground_threshold", 0));
        }
        if focus.cursor.min_height >= focus.cursor.max_height {
            return Err(invalid(
                "focus.cursor",
                format!("{}..{}", focus.cursor.min_height, focus.cursor.max_height),
            ));
        }
        if focus.border.min_height >= focus.border.max_height {
            return Err(invalid(
                "focus.border",
                format!("{}..{}", focus.border.min_height, focus.border.max_height),
            ));
        }
        unit_interval(
            "focus.border.min_side_coverage",
            focus.border.min_side_coverage as f64,
        )?;
        let bold = &focus.bold;
        if bold.density_ratio < 1.0 {
            return Err(invalid("focus.bold.density_ratio", bold.density_ratio));
        }
        unit_interval("focus.bold.min_density", bold.min_density as f64)?;
        unit_interval("focus.bold.max_density", bold.max_density as f64)?;
        if bold.min_density >= bold.max_density {
            return Err(invalid(
                "focus.bold",
                format!("{}..{}", bold.min_density, bold.max_density),
            ));
        }
        Ok(())
    }

    pub fn header_config(&self) -> HeaderLocatorConfig {
        HeaderLocatorConfig {
            default_crop_percentage: self.default_crop_percentage,
            ..HeaderLocatorConfig::default()
        }
    }

    pub fn extractor_config(&self) -> ExtractorConfig {
        ExtractorConfig {
            language: self.ocr_language.clone(),
            min_confidence: self.min_ocr_confidence,
        }
    }

    pub fn text_config(&self) -> TextComparatorConfig {
        TextComparatorConfig {
            ignore_case: self.ignore_case,
            similarity_threshold: self.similarity_threshold,
            bands: self.bands,
            min_block_chars: self.min_block_chars,
        }
    }

    pub fn focus_detector_config(&self) -> FocusDetectorConfig {
        self.focus_detector.clone()
    }

    pub fn focus_comparator_config(&self) -> FocusComparatorConfig {
        FocusComparatorConfig {
            tolerance_ratio: self.focus_tolerance_ratio,
        }
    }
}

fn unit_interval(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(invalid(field, value))
    }
}

fn invalid(field: &'static str, value: impl ToString) -> ConfigError {
    ConfigError::InvalidValue {
        path: None,
        field,
        value: value.to_string(),
    }
}
