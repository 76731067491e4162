//! Shared value objects for the shotdiff workspace.
//!
//! This crate centralizes the lightweight data structures passed between the
//! detector, OCR, comparator, and CLI crates. Keep it free of imaging and
//! runtime dependencies so every crate can depend on it cheaply.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

/// Axis-aligned pixel rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Builds a box from inclusive corner coordinates.
    pub fn from_corners(min_x: u32, min_y: u32, max_x: u32, max_y: u32) -> Self {
        Self {
            x: min_x,
            y: min_y,
            width: max_x.saturating_sub(min_x) + 1,
            height: max_y.saturating_sub(min_y) + 1,
        }
    }

    pub fn right(&self) -> u32 {
        self.x.saturating_add(self.width)
    }

    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.height)
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn center(&self) -> Point {
        Point {
            x: self.x as f32 + self.width as f32 / 2.0,
            y: self.y as f32 + self.height as f32 / 2.0,
        }
    }

    /// True when the two boxes share at least one pixel.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    pub fn offset_y(self, dy: u32) -> BoundingBox {
        BoundingBox {
            y: self.y.saturating_add(dy),
            ..self
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryMethod {
    Dynamic,
    Fallback,
}

impl BoundaryMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            BoundaryMethod::Dynamic => "dynamic",
            BoundaryMethod::Fallback => "fallback",
        }
    }
}

/// Vertical split between volatile header chrome and the comparable body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HeaderBoundary {
    pub offset_px: u32,
    pub method: BoundaryMethod,
}

impl HeaderBoundary {
    pub fn dynamic(offset_px: u32) -> Self {
        Self {
            offset_px,
            method: BoundaryMethod::Dynamic,
        }
    }

    pub fn fallback(offset_px: u32) -> Self {
        Self {
            offset_px,
            method: BoundaryMethod::Fallback,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextBlock {
    pub text: String,
    /// Engine confidence in `[0, 100]`.
    pub confidence: f32,
    pub bounding_box: BoundingBox,
}

impl TextBlock {
    pub fn new(text: impl Into<String>, confidence: f32, bounding_box: BoundingBox) -> Self {
        Self {
            text: text.into(),
            confidence,
            bounding_box,
        }
    }
}

/// OCR output for one body region, already filtered by confidence.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TextExtraction {
    pub blocks: Vec<TextBlock>,
}

impl TextExtraction {
    pub fn new(blocks: Vec<TextBlock>) -> Self {
        Self { blocks }
    }

    pub fn empty() -> Self {
        Self { blocks: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffSeverity {
    Minor,
    Moderate,
    Major,
    Severe,
}

impl DiffSeverity {
    pub fn message(self) -> &'static str {
        match self {
            DiffSeverity::Minor => "minor differences",
            DiffSeverity::Moderate => "differs in several fields",
            DiffSeverity::Major => "significant differences",
            DiffSeverity::Severe => "major content differences detected",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextVerdict {
    /// Normalized similarity in `[0, 1]`.
    pub similarity: f64,
    pub matched: bool,
    pub reason: String,
    pub severity: Option<DiffSeverity>,
    pub reference_text: String,
    pub candidate_text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FocusKind {
    Bold,
    Border,
    Cursor,
}

impl FocusKind {
    /// All kinds, strongest indicator first.
    pub const BY_PRIORITY: [FocusKind; 3] = [FocusKind::Cursor, FocusKind::Border, FocusKind::Bold];

    pub fn as_str(self) -> &'static str {
        match self {
            FocusKind::Cursor => "cursor",
            FocusKind::Border => "border",
            FocusKind::Bold => "bold",
        }
    }

    /// Higher wins when candidates of different kinds overlap.
    pub fn priority(self) -> u8 {
        match self {
            FocusKind::Cursor => 3,
            FocusKind::Border => 2,
            FocusKind::Bold => 1,
        }
    }
}

impl fmt::Display for FocusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown focus kind '{0}' (expected cursor, border or bold)")]
pub struct ParseFocusKindError(pub String);

impl FromStr for FocusKind {
    type Err = ParseFocusKindError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "cursor" | "caret" => Ok(FocusKind::Cursor),
            "border" | "ring" => Ok(FocusKind::Border),
            "bold" => Ok(FocusKind::Bold),
            other => Err(ParseFocusKindError(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FocusCandidate {
    pub kind: FocusKind,
    pub position: Point,
    pub extent: BoundingBox,
}

impl FocusCandidate {
    /// Candidate positioned at the center of its extent.
    pub fn new(kind: FocusKind, extent: BoundingBox) -> Self {
        Self {
            kind,
            position: extent.center(),
            extent,
        }
    }

    pub fn offset_y(self, dy: u32) -> Self {
        Self::new(self.kind, self.extent.offset_y(dy))
    }
}

/// Deduplicated focus indicators found in one image.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FocusExtraction {
    pub candidates: Vec<FocusCandidate>,
    pub frame_width: u32,
    pub frame_height: u32,
}

impl FocusExtraction {
    pub fn new(candidates: Vec<FocusCandidate>, frame_width: u32, frame_height: u32) -> Self {
        Self {
            candidates,
            frame_width,
            frame_height,
        }
    }

    pub fn empty(frame_width: u32, frame_height: u32) -> Self {
        Self::new(Vec::new(), frame_width, frame_height)
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn strongest_kind(&self) -> Option<FocusKind> {
        self.candidates
            .iter()
            .map(|candidate| candidate.kind)
            .max_by_key(|kind| kind.priority())
    }

    /// The strongest-kind candidate that comes first in reading order.
    pub fn primary(&self) -> Option<&FocusCandidate> {
        let kind = self.strongest_kind()?;
        self.candidates
            .iter()
            .filter(|candidate| candidate.kind == kind)
            .min_by_key(|candidate| (candidate.extent.y, candidate.extent.x))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusChange {
    NoneObserved,
    Unchanged,
    Lost,
    Gained,
    Moved,
    KindChanged,
    Disabled,
}

impl FocusChange {
    pub fn detail(self) -> &'static str {
        match self {
            FocusChange::NoneObserved => "no focus indicator in either image",
            FocusChange::Unchanged => "focus unchanged",
            FocusChange::Lost => "focus lost",
            FocusChange::Gained => "focus gained",
            FocusChange::Moved => "focus moved",
            FocusChange::KindChanged => "focus kind changed",
            FocusChange::Disabled => "focus detection disabled",
        }
    }

    pub fn is_match(self) -> bool {
        matches!(
            self,
            FocusChange::NoneObserved | FocusChange::Unchanged | FocusChange::Disabled
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FocusVerdict {
    pub matched: bool,
    pub detail: String,
    pub change: FocusChange,
    pub reference: Option<FocusCandidate>,
    pub candidate: Option<FocusCandidate>,
}

impl FocusVerdict {
    pub fn new(
        change: FocusChange,
        reference: Option<FocusCandidate>,
        candidate: Option<FocusCandidate>,
    ) -> Self {
        Self {
            matched: change.is_match(),
            detail: change.detail().to_string(),
            change,
            reference,
            candidate,
        }
    }

    pub fn disabled() -> Self {
        Self::new(FocusChange::Disabled, None, None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Verdict {
    #[serde(rename = "PASS")]
    Pass,
    #[serde(rename = "FAIL")]
    Fail,
}

impl Verdict {
    pub fn from_matches(text_matched: bool, focus_matched: bool) -> Self {
        if text_matched && focus_matched {
            Verdict::Pass
        } else {
            Verdict::Fail
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Pass => "PASS",
            Verdict::Fail => "FAIL",
        }
    }
}

/// Which input folder a file came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Version1,
    Version2,
}

impl Side {
    pub fn as_str(self) -> &'static str {
        match self {
            Side::Version1 => "version1",
            Side::Version2 => "version2",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HeaderPair {
    pub version1: HeaderBoundary,
    pub version2: HeaderBoundary,
}

/// Immutable outcome of one successfully compared pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonResult {
    pub filename: String,
    pub headers: HeaderPair,
    pub text_verdict: TextVerdict,
    pub focus_verdict: FocusVerdict,
    pub overall: Verdict,
}

impl ComparisonResult {
    pub fn new(
        filename: impl Into<String>,
        headers: HeaderPair,
        text_verdict: TextVerdict,
        focus_verdict: FocusVerdict,
    ) -> Self {
        let overall = Verdict::from_matches(text_verdict.matched, focus_verdict.matched);
        Self {
            filename: filename.into(),
            headers,
            text_verdict,
            focus_verdict,
            overall,
        }
    }

    pub fn passed(&self) -> bool {
        self.overall == Verdict::Pass
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(kind: FocusKind, x: u32, y: u32) -> FocusCandidate {
        FocusCandidate::new(kind, BoundingBox::new(x, y, 10, 10))
    }

    #[test]
    fn touching_boxes_do_not_intersect() {
        let a = BoundingBox::new(0, 0, 10, 10);
        let b = BoundingBox::new(10, 0, 10, 10);
        let c = BoundingBox::new(9, 9, 5, 5);
        assert!(!a.intersects(&b));
        assert!(a.intersects(&c));
        assert!(c.intersects(&a));
    }

    #[test]
    fn corners_are_inclusive() {
        let bbox = BoundingBox::from_corners(2, 3, 2, 14);
        assert_eq!(bbox.width, 1);
        assert_eq!(bbox.height, 12);
    }

    #[test]
    fn primary_prefers_strongest_kind_then_reading_order() {
        let extraction = FocusExtraction::new(
            vec![
                candidate(FocusKind::Bold, 0, 0),
                candidate(FocusKind::Border, 50, 80),
                candidate(FocusKind::Border, 40, 20),
            ],
            200,
            200,
        );
        let primary = extraction.primary().unwrap();
        assert_eq!(primary.kind, FocusKind::Border);
        assert_eq!(primary.extent.y, 20);
        assert!(FocusExtraction::empty(10, 10).primary().is_none());
    }

    #[test]
    fn overall_requires_both_verdicts() {
        assert_eq!(Verdict::from_matches(true, true), Verdict::Pass);
        assert_eq!(Verdict::from_matches(true, false), Verdict::Fail);
        assert_eq!(Verdict::from_matches(false, true), Verdict::Fail);
    }

    #[test]
    fn focus_kind_round_trips_through_names() {
        for kind in FocusKind::BY_PRIORITY {
            assert_eq!(kind.as_str().parse::<FocusKind>(), Ok(kind));
        }
        assert!("glow".parse::<FocusKind>().is_err());
    }

    #[test]
    fn verdict_serializes_as_upper_case() {
        let value = serde_json::to_string(&Verdict::Fail).unwrap();
        assert_eq!(value, "\"FAIL\"");
        let change = serde_json::to_string(&FocusChange::KindChanged).unwrap();
        assert_eq!(change, "\"kind_changed\"");
    }
}
