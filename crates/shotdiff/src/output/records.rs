use serde::Serialize;
use shotdiff_types::{ComparisonResult, Side};

use crate::comparator::PairStage;
use crate::error::ErrorKind;
use crate::pipeline::PairOutcome;

/// Serializable view of a [`PairOutcome`] for the JSON results file.
#[derive(Debug, Clone, Serialize)]
pub struct OutcomeRecord {
    pub filename: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ComparisonResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub present_in: Option<Side>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    pub kind: ErrorKind,
    pub stage: PairStage,
    pub message: String,
}

impl OutcomeRecord {
    pub fn from_outcome(outcome: &PairOutcome) -> Self {
        let mut record = Self {
            filename: outcome.filename().to_string(),
            status: outcome.status(),
            result: None,
            present_in: None,
            error: None,
        };
        match outcome {
            PairOutcome::Compared(result) => record.result = Some(result.clone()),
            PairOutcome::Missing { present_in, .. } => record.present_in = Some(*present_in),
            PairOutcome::Errored { stage, error, .. } => {
                record.error = Some(ErrorRecord {
                    kind: error.kind(),
                    stage: *stage,
                    message: error.to_string(),
                })
            }
        }
        record
    }
}
