use std::cmp::Ordering;

use shotdiff_types::{DiffSeverity, TextBlock, TextExtraction, TextVerdict};
use thiserror::Error;

use crate::ExtractionComparator;

pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 1.0;
pub const DEFAULT_MIN_BLOCK_CHARS: usize = 2;

const MATCHED_REASON: &str = "text matches";

#[derive(Debug, Error, PartialEq)]
pub enum BandsError {
    #[error("severity threshold {name} must lie in [0, 1], got {value}")]
    OutOfRange { name: &'static str, value: f64 },
    #[error("severity thresholds must ascend: minor {minor} < moderate {moderate} < major {major}")]
    NotAscending { minor: f64, moderate: f64, major: f64 },
}

/// Upper bounds (exclusive) on `1 - similarity` for each severity band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeverityBands {
    pub minor_threshold: f64,
    pub moderate_threshold: f64,
    pub major_threshold: f64,
}

impl Default for SeverityBands {
    fn default() -> Self {
        Self {
            minor_threshold: 0.05,
            moderate_threshold: 0.20,
            major_threshold: 0.50,
        }
    }
}

impl SeverityBands {
    pub fn validate(&self) -> Result<(), BandsError> {
        for (name, value) in [
            ("minor_threshold", self.minor_threshold),
            ("moderate_threshold", self.moderate_threshold),
            ("major_threshold", self.major_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(BandsError::OutOfRange { name, value });
            }
        }
        if self.minor_threshold < self.moderate_threshold
            && self.moderate_threshold < self.major_threshold
        {
            Ok(())
        } else {
            Err(BandsError::NotAscending {
                minor: self.minor_threshold,
                moderate: self.moderate_threshold,
                major: self.major_threshold,
            })
        }
    }

    /// A difference exactly on a threshold falls into the more severe band.
    pub fn classify(&self, difference: f64) -> DiffSeverity {
        if difference < self.minor_threshold {
            DiffSeverity::Minor
        } else if difference < self.moderate_threshold {
            DiffSeverity::Moderate
        } else if difference < self.major_threshold {
            DiffSeverity::Major
        } else {
            DiffSeverity::Severe
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextComparatorConfig {
    pub ignore_case: bool,
    pub similarity_threshold: f64,
    pub bands: SeverityBands,
    /// Blocks with fewer characters than this are OCR noise and ignored.
    pub min_block_chars: usize,
}

impl Default for TextComparatorConfig {
    fn default() -> Self {
        Self {
            ignore_case: true,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            bands: SeverityBands::default(),
            min_block_chars: DEFAULT_MIN_BLOCK_CHARS,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TextComparator {
    config: TextComparatorConfig,
}

impl TextComparator {
    pub fn new(config: TextComparatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TextComparatorConfig {
        &self.config
    }

    fn verdict(&self, reference_text: String, candidate_text: String) -> TextVerdict {
        let identical = reference_text == candidate_text;
        let similarity = if identical {
            1.0
        } else {
            similarity_ratio(&reference_text, &candidate_text)
        };
        let matched = identical || similarity >= self.config.similarity_threshold;
        let severity = (!matched).then(|| self.config.bands.classify(1.0 - similarity));
        let reason = match severity {
            Some(severity) => severity.message().to_string(),
            None => MATCHED_REASON.to_string(),
        };
        TextVerdict {
            similarity,
            matched,
            reason,
            severity,
            reference_text,
            candidate_text,
        }
    }
}

impl ExtractionComparator for TextComparator {
    type Extraction = TextExtraction;
    type Verdict = TextVerdict;

    fn name(&self) -> &'static str {
        "text"
    }

    fn compare(&self, reference: &TextExtraction, candidate: &TextExtraction) -> TextVerdict {
        let reference_text = normalize_extraction(reference, &self.config);
        let candidate_text = normalize_extraction(candidate, &self.config);
        let verdict = self.verdict(reference_text, candidate_text);
        tracing::debug!(
            similarity = verdict.similarity,
            matched = verdict.matched,
            "text compared"
        );
        verdict
    }
}

/// Joins the blocks in reading order into one comparable string.
pub fn normalize_extraction(extraction: &TextExtraction, config: &TextComparatorConfig) -> String {
    let blocks: Vec<&TextBlock> = extraction
        .blocks
        .iter()
        .filter(|block| block.text.trim().chars().count() >= config.min_block_chars)
        .collect();
    let ordered = reading_order(blocks);
    let joined = ordered
        .iter()
        .flat_map(|block| block.text.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ");
    if config.ignore_case {
        joined.to_lowercase()
    } else {
        joined
    }
}

/// Groups blocks into lines by vertical centre, then orders each line by x.
fn reading_order(mut blocks: Vec<&TextBlock>) -> Vec<&TextBlock> {
    if blocks.len() < 2 {
        return blocks;
    }
    let tolerance = line_tolerance(&blocks);
    blocks.sort_by(|a, b| {
        center_y(a)
            .partial_cmp(&center_y(b))
            .unwrap_or(Ordering::Equal)
            .then(a.bounding_box.x.cmp(&b.bounding_box.x))
    });

    let mut lines: Vec<(f64, Vec<&TextBlock>)> = Vec::new();
    for block in blocks {
        let center = center_y(block);
        match lines.last_mut() {
            Some((anchor, line)) if (center - *anchor).abs() <= tolerance => line.push(block),
            _ => lines.push((center, vec![block])),
        }
    }
    lines
        .into_iter()
        .flat_map(|(_, mut line)| {
            line.sort_by_key(|block| (block.bounding_box.x, block.bounding_box.y));
            line
        })
        .collect()
}

fn center_y(block: &TextBlock) -> f64 {
    block.bounding_box.y as f64 + block.bounding_box.height as f64 / 2.0
}

fn line_tolerance(blocks: &[&TextBlock]) -> f64 {
    let mut heights: Vec<u32> = blocks.iter().map(|b| b.bounding_box.height).collect();
    heights.sort_unstable();
    heights[heights.len() / 2] as f64 / 2.0
}

/// `2 * LCS / (|a| + |b|)` over characters; two empty strings are identical.
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * lcs_len(&a, &b) as f64 / total as f64
}

fn lcs_len(a: &[char], b: &[char]) -> usize {
    let (long, short) = if a.len() >= b.len() { (a, b) } else { (b, a) };
    let mut prev = vec![0usize; short.len() + 1];
    let mut curr = vec![0usize; short.len() + 1];
    for &x in long {
        for (j, &y) in short.iter().enumerate() {
            curr[j + 1] = if x == y {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[short.len()]
}
