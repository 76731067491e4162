//! Comparators that turn two extractions into a verdict.

pub mod focus;
pub mod text;

pub use focus::{DEFAULT_FOCUS_TOLERANCE, FocusComparator, FocusComparatorConfig};
pub use text::{
    BandsError, DEFAULT_MIN_BLOCK_CHARS, DEFAULT_SIMILARITY_THRESHOLD, SeverityBands,
    TextComparator, TextComparatorConfig, normalize_extraction, similarity_ratio,
};

/// Implemented by every comparator that judges a pair of extractions.
pub trait ExtractionComparator: Send + Sync {
    type Extraction;
    type Verdict;

    /// Stable comparator name used for logging and diagnostics.
    fn name(&self) -> &'static str;

    /// Compares the reference (version 1) extraction against the candidate.
    fn compare(&self, reference: &Self::Extraction, candidate: &Self::Extraction)
    -> Self::Verdict;
}

#[cfg(test)]
mod tests;
