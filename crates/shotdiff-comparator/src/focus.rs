use shotdiff_types::{FocusCandidate, FocusChange, FocusExtraction, FocusVerdict};

use crate::ExtractionComparator;

pub const DEFAULT_FOCUS_TOLERANCE: f32 = 0.05;

#[derive(Debug, Clone, PartialEq)]
pub struct FocusComparatorConfig {
    /// Allowed drift as a share of the larger frame width (x) and height (y).
    pub tolerance_ratio: f32,
}

impl Default for FocusComparatorConfig {
    fn default() -> Self {
        Self {
            tolerance_ratio: DEFAULT_FOCUS_TOLERANCE,
        }
    }
}

/// Matches focus indicators of the same kind between two screenshots.
///
/// Indicators that appear in both images at roughly the same place cancel
/// out; whatever is left over decides the verdict.
#[derive(Debug, Clone, Default)]
pub struct FocusComparator {
    config: FocusComparatorConfig,
}

#[derive(Debug, Clone, Copy)]
struct Tolerance {
    x: f32,
    y: f32,
}

impl Tolerance {
    fn between(reference: &FocusExtraction, candidate: &FocusExtraction, ratio: f32) -> Self {
        let width = reference.frame_width.max(candidate.frame_width) as f32;
        let height = reference.frame_height.max(candidate.frame_height) as f32;
        Self {
            x: width * ratio,
            y: height * ratio,
        }
    }

    fn admits(&self, a: &FocusCandidate, b: &FocusCandidate) -> bool {
        (a.position.x - b.position.x).abs() <= self.x
            && (a.position.y - b.position.y).abs() <= self.y
    }
}

impl FocusComparator {
    pub fn new(config: FocusComparatorConfig) -> Self {
        Self { config }
    }

    /// Greedily pairs reference candidates with same-kind candidates nearby
    /// and returns the leftovers of each side.
    fn unpaired(
        &self,
        reference: &FocusExtraction,
        candidate: &FocusExtraction,
        tolerance: Tolerance,
    ) -> (Vec<FocusCandidate>, Vec<FocusCandidate>) {
        let mut ordered = reference.candidates.clone();
        ordered.sort_by_key(|c| (c.extent.y, c.extent.x));

        let mut taken = vec![false; candidate.candidates.len()];
        let mut left_over = Vec::new();
        for a in ordered {
            let nearest = candidate
                .candidates
                .iter()
                .enumerate()
                .filter(|(idx, b)| !taken[*idx] && b.kind == a.kind && tolerance.admits(&a, b))
                .min_by(|(ia, x), (ib, y)| {
                    distance(&a, x)
                        .total_cmp(&distance(&a, y))
                        .then(ia.cmp(ib))
                })
                .map(|(idx, _)| idx);
            match nearest {
                Some(idx) => taken[idx] = true,
                None => left_over.push(a),
            }
        }
        let candidate_left: Vec<FocusCandidate> = candidate
            .candidates
            .iter()
            .zip(taken)
            .filter(|(_, taken)| !taken)
            .map(|(c, _)| *c)
            .collect();
        (left_over, candidate_left)
    }
}

impl ExtractionComparator for FocusComparator {
    type Extraction = FocusExtraction;
    type Verdict = FocusVerdict;

    fn name(&self) -> &'static str {
        "focus"
    }

    fn compare(&self, reference: &FocusExtraction, candidate: &FocusExtraction) -> FocusVerdict {
        if reference.is_empty() && candidate.is_empty() {
            return FocusVerdict::new(FocusChange::NoneObserved, None, None);
        }
        let tolerance = Tolerance::between(reference, candidate, self.config.tolerance_ratio);
        let (lost, gained) = self.unpaired(reference, candidate, tolerance);

        let verdict = match (lost.is_empty(), gained.is_empty()) {
            (true, true) => FocusVerdict::new(
                FocusChange::Unchanged,
                reference.primary().copied(),
                candidate.primary().copied(),
            ),
            (false, true) => FocusVerdict::new(FocusChange::Lost, strongest(&lost), None),
            (true, false) => FocusVerdict::new(FocusChange::Gained, None, strongest(&gained)),
            (false, false) => {
                let swapped = lost.iter().find_map(|a| {
                    gained
                        .iter()
                        .find(|b| b.kind != a.kind && tolerance.admits(a, b))
                        .map(|b| (*a, *b))
                });
                match swapped {
                    Some((a, b)) => FocusVerdict::new(FocusChange::KindChanged, Some(a), Some(b)),
                    None => {
                        FocusVerdict::new(FocusChange::Moved, strongest(&lost), strongest(&gained))
                    }
                }
            }
        };
        tracing::debug!(
            change = verdict.detail.as_str(),
            lost = lost.len(),
            gained = gained.len(),
            "focus compared"
        );
        verdict
    }
}

fn distance(a: &FocusCandidate, b: &FocusCandidate) -> f32 {
    let dx = a.position.x - b.position.x;
    let dy = a.position.y - b.position.y;
    (dx * dx + dy * dy).sqrt()
}

/// Highest-priority candidate, first in reading order among equals.
fn strongest(candidates: &[FocusCandidate]) -> Option<FocusCandidate> {
    candidates
        .iter()
        .min_by_key(|c| (std::cmp::Reverse(c.kind.priority()), c.extent.y, c.extent.x))
        .copied()
}
