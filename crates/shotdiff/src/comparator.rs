use std::path::Path;
use std::sync::Arc;

use image::{GrayImage, RgbImage, imageops};
use serde::Serialize;
use shotdiff_comparator::{ExtractionComparator, FocusComparator, TextComparator};
use shotdiff_detector::{FocusDetector, HeaderLocator, crop_body};
use shotdiff_ocr::{LumaPlane, OcrEngine, OcrError, TextExtractor};
use shotdiff_types::{
    ComparisonResult, FocusExtraction, FocusVerdict, HeaderBoundary, HeaderPair, TextExtraction,
};
use tokio::task::{self, JoinError};

use crate::config::CompareConfig;
use crate::error::PairError;
use crate::pairing::ImagePair;

/// Progress of one pair through the comparison stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PairStage {
    Pending,
    Loaded,
    HeaderCropped,
    TextCompared,
    FocusCompared,
    Verdicted,
}

impl PairStage {
    pub fn as_str(self) -> &'static str {
        match self {
            PairStage::Pending => "pending",
            PairStage::Loaded => "loaded",
            PairStage::HeaderCropped => "header_cropped",
            PairStage::TextCompared => "text_compared",
            PairStage::FocusCompared => "focus_compared",
            PairStage::Verdicted => "verdicted",
        }
    }
}

/// A pair that stopped early. `stage` is the last stage it completed.
#[derive(Debug)]
pub struct PairFailure {
    pub stage: PairStage,
    pub error: PairError,
}

impl PairFailure {
    /// True once the pair got as far as asking the OCR engine for text.
    pub fn reached_ocr(&self) -> bool {
        matches!(self.error, PairError::OcrUnavailable { .. })
    }
}

struct PairRun<'a> {
    filename: &'a str,
    stage: PairStage,
}

impl<'a> PairRun<'a> {
    fn new(filename: &'a str) -> Self {
        Self {
            filename,
            stage: PairStage::Pending,
        }
    }

    fn reach(&mut self, stage: PairStage) {
        debug_assert!(stage > self.stage);
        self.stage = stage;
        tracing::debug!(pair = self.filename, stage = stage.as_str(), "stage reached");
    }

    fn fail(&self, error: PairError) -> PairFailure {
        tracing::warn!(
            pair = self.filename,
            stage = self.stage.as_str(),
            error = %error,
            "pair errored"
        );
        PairFailure {
            stage: self.stage,
            error,
        }
    }
}

/// One screenshot after header removal.
struct Body {
    boundary: HeaderBoundary,
    frame_width: u32,
    frame_height: u32,
    rgb: Arc<RgbImage>,
    luma: GrayImage,
}

/// Judges screenshot pairs: header removal, then text and focus comparison.
pub struct SmartImageComparator {
    config: CompareConfig,
    header: HeaderLocator,
    extractor: TextExtractor,
    text: TextComparator,
    focus_detector: Option<FocusDetector>,
    focus: FocusComparator,
}

impl SmartImageComparator {
    pub fn new(config: CompareConfig, engine: Arc<dyn OcrEngine>) -> Self {
        let focus_detector = config
            .enable_focus_detection
            .then(|| FocusDetector::new(config.focus_detector_config()));
        Self {
            header: HeaderLocator::new(config.header_config()),
            extractor: TextExtractor::new(engine, config.extractor_config()),
            text: TextComparator::new(config.text_config()),
            focus: FocusComparator::new(config.focus_comparator_config()),
            focus_detector,
            config,
        }
    }

    pub fn config(&self) -> &CompareConfig {
        &self.config
    }

    /// Checks that the OCR engine can be started at all.
    pub async fn check_engine(&self) -> Result<(), OcrError> {
        let timeout = self.config.ocr_timeout;
        tokio::time::timeout(timeout, self.extractor.engine().warm_up())
            .await
            .unwrap_or(Err(OcrError::Timeout { timeout }))
    }

    /// Loads both screenshots of `pair` and compares them.
    pub async fn compare_pair(
        self: &Arc<Self>,
        pair: &ImagePair,
    ) -> Result<ComparisonResult, PairFailure> {
        let run = PairRun::new(&pair.filename);
        let version1 = pair.version1.clone();
        let version2 = pair.version2.clone();
        let loaded = task::spawn_blocking(move || {
            let reference = load_image(&version1)?;
            let candidate = load_image(&version2)?;
            Ok::<_, PairError>((reference, candidate))
        })
        .await
        .map_err(|err| run.fail(internal("image decoding", err)))?;
        let (reference, candidate) = loaded.map_err(|err| run.fail(err))?;
        self.compare_loaded(run, reference, candidate).await
    }

    /// Compares two already decoded screenshots.
    pub async fn compare_images(
        self: &Arc<Self>,
        filename: &str,
        reference: RgbImage,
        candidate: RgbImage,
    ) -> Result<ComparisonResult, PairFailure> {
        self.compare_loaded(PairRun::new(filename), reference, candidate)
            .await
    }

    async fn compare_loaded(
        self: &Arc<Self>,
        mut run: PairRun<'_>,
        reference: RgbImage,
        candidate: RgbImage,
    ) -> Result<ComparisonResult, PairFailure> {
        run.reach(PairStage::Loaded);
        self.check_dimensions(&reference, &candidate)
            .map_err(|err| run.fail(err))?;

        let this = Arc::clone(self);
        let (reference, candidate) =
            task::spawn_blocking(move || (this.body(reference), this.body(candidate)))
                .await
                .map_err(|err| run.fail(internal("header detection", err)))?;
        run.reach(PairStage::HeaderCropped);

        let (reference_text, candidate_text) =
            tokio::try_join!(self.extract_text(&reference), self.extract_text(&candidate))
                .map_err(|err| run.fail(err))?;
        let text_verdict = self.text.compare(&reference_text, &candidate_text);
        run.reach(PairStage::TextCompared);

        let focus_verdict = if self.focus_detector.is_some() {
            let (reference_focus, candidate_focus) = self
                .detect_focus(&reference, &candidate)
                .await
                .map_err(|err| run.fail(err))?;
            self.focus.compare(&reference_focus, &candidate_focus)
        } else {
            FocusVerdict::disabled()
        };
        run.reach(PairStage::FocusCompared);

        let headers = HeaderPair {
            version1: reference.boundary,
            version2: candidate.boundary,
        };
        let result =
            ComparisonResult::new(run.filename, headers, text_verdict, focus_verdict);
        run.reach(PairStage::Verdicted);
        Ok(result)
    }

    fn check_dimensions(&self, reference: &RgbImage, candidate: &RgbImage) -> Result<(), PairError> {
        let (rw, rh) = reference.dimensions();
        let (cw, ch) = candidate.dimensions();
        let limit = self.config.max_dimension_drift;
        if drift(rw, cw) > limit || drift(rh, ch) > limit {
            return Err(PairError::DimensionMismatch {
                reference_width: rw,
                reference_height: rh,
                candidate_width: cw,
                candidate_height: ch,
            });
        }
        Ok(())
    }

    fn body(&self, image: RgbImage) -> Body {
        let boundary = self.header.locate(&image);
        tracing::info!(
            offset = boundary.offset_px,
            method = boundary.method.as_str(),
            "header boundary"
        );
        let rgb = crop_body(&image, &boundary);
        let luma = imageops::grayscale(&rgb);
        Body {
            boundary,
            frame_width: image.width(),
            frame_height: image.height(),
            rgb: Arc::new(rgb),
            luma,
        }
    }

    /// Runs OCR on one body. On timeout the engine call is dropped, which
    /// stops the engine's work for it.
    async fn extract_text(&self, body: &Body) -> Result<TextExtraction, PairError> {
        let luma = &body.luma;
        let plane = LumaPlane::packed(luma.width(), luma.height(), luma.as_raw())
            .map_err(ocr_unavailable)?;
        let timeout = self.config.ocr_timeout;
        match tokio::time::timeout(timeout, self.extractor.extract(&plane, body.boundary.offset_px))
            .await
        {
            Ok(Ok(extraction)) => Ok(extraction),
            Ok(Err(err)) => Err(ocr_unavailable(err)),
            Err(_) => Err(ocr_unavailable(OcrError::Timeout { timeout })),
        }
    }

    async fn detect_focus(
        self: &Arc<Self>,
        reference: &Body,
        candidate: &Body,
    ) -> Result<(FocusExtraction, FocusExtraction), PairError> {
        let this = Arc::clone(self);
        let sides = [reference, candidate].map(|body| {
            (
                Arc::clone(&body.rgb),
                body.boundary.offset_px,
                body.frame_width,
                body.frame_height,
            )
        });
        task::spawn_blocking(move || {
            let [a, b] = sides.map(|(rgb, offset, width, height)| match &this.focus_detector {
                Some(detector) => detector.detect(&rgb, offset, width, height),
                None => FocusExtraction::empty(width, height),
            });
            (a, b)
        })
        .await
        .map_err(|err| internal("focus detection", err))
    }
}

fn load_image(path: &Path) -> Result<RgbImage, PairError> {
    let metadata = std::fs::metadata(path).map_err(|err| PairError::input(path, err.to_string()))?;
    if metadata.len() == 0 {
        return Err(PairError::input(path, "file is empty"));
    }
    let image = image::open(path).map_err(|err| PairError::input(path, err.to_string()))?;
    Ok(image.to_rgb8())
}

fn drift(a: u32, b: u32) -> f64 {
    let largest = a.max(b);
    if largest == 0 {
        return 0.0;
    }
    a.abs_diff(b) as f64 / largest as f64
}

fn ocr_unavailable(err: OcrError) -> PairError {
    PairError::OcrUnavailable {
        message: err.to_string(),
    }
}

fn internal(task: &str, err: JoinError) -> PairError {
    PairError::Internal {
        message: format!("{task}: {err}"),
    }
}
