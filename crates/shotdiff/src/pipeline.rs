use std::path::Path;
use std::pin::pin;
use std::sync::Arc;

use futures_util::{StreamExt, future, stream};
use shotdiff_types::{ComparisonResult, Side};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::comparator::{PairFailure, PairStage, SmartImageComparator};
use crate::error::{BatchError, PairError};
use crate::pairing::{ImagePair, PairEntry, discover_pairs};

/// What happened to one discovered filename.
#[derive(Debug)]
pub enum PairOutcome {
    Compared(ComparisonResult),
    Missing {
        filename: String,
        present_in: Side,
    },
    Errored {
        filename: String,
        stage: PairStage,
        error: PairError,
    },
}

impl PairOutcome {
    pub fn filename(&self) -> &str {
        match self {
            PairOutcome::Compared(result) => &result.filename,
            PairOutcome::Missing { filename, .. } | PairOutcome::Errored { filename, .. } => {
                filename
            }
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            PairOutcome::Compared(result) => result.overall.as_str(),
            PairOutcome::Missing { .. } => "MISSING",
            PairOutcome::Errored { .. } => "ERROR",
        }
    }

    pub fn passed(&self) -> bool {
        matches!(self, PairOutcome::Compared(result) if result.passed())
    }

    /// One-line human description used on the console.
    pub fn describe(&self) -> String {
        match self {
            PairOutcome::Compared(result) if result.passed() => {
                format!("PASS  {}", result.filename)
            }
            PairOutcome::Compared(result) => {
                let mut reasons = Vec::new();
                if !result.text_verdict.matched {
                    reasons.push(format!(
                        "text: {} ({:.1}% similar)",
                        result.text_verdict.reason,
                        result.text_verdict.similarity * 100.0
                    ));
                }
                if !result.focus_verdict.matched {
                    reasons.push(format!("focus: {}", result.focus_verdict.detail));
                }
                format!("FAIL  {}: {}", result.filename, reasons.join("; "))
            }
            PairOutcome::Missing {
                filename,
                present_in,
            } => format!("MISSING  {filename}: only in {}", present_in.as_str()),
            PairOutcome::Errored {
                filename, error, ..
            } => format!("ERROR  {filename}: {error}"),
        }
    }
}

/// Counters describing how far a batch got.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchRun {
    pub discovered: usize,
    pub delivered: usize,
    pub cancelled: bool,
}

/// Runs every discovered pair through a [`SmartImageComparator`] and streams
/// the outcomes, in filename order, to a reporter.
///
/// Cancelling the token stops new pairs from starting and abandons the ones
/// in flight; abandoned pairs produce no outcome.
pub struct BatchRunner {
    comparator: Arc<SmartImageComparator>,
    cancel: CancellationToken,
}

impl BatchRunner {
    pub fn new(comparator: Arc<SmartImageComparator>, cancel: CancellationToken) -> Self {
        Self { comparator, cancel }
    }

    /// Pairs are judged sequentially until one of them reaches OCR. If that
    /// first OCR call fails the engine is considered missing and the run
    /// stops; afterwards OCR failures only mark the pair as errored and pairs
    /// run concurrently up to the configured worker count.
    pub async fn run(
        &self,
        version1: &Path,
        version2: &Path,
        outcomes: mpsc::Sender<PairOutcome>,
    ) -> Result<BatchRun, BatchError> {
        let entries = discover_pairs(version1, version2).await?;
        self.run_entries(entries, outcomes).await
    }

    /// Same as [`run`](Self::run) for an already discovered, sorted list.
    pub async fn run_entries(
        &self,
        entries: Vec<PairEntry>,
        outcomes: mpsc::Sender<PairOutcome>,
    ) -> Result<BatchRun, BatchError> {
        let mut run = BatchRun {
            discovered: entries.len(),
            ..BatchRun::default()
        };
        tracing::info!(pairs = run.discovered, "pairs discovered");

        if entries.iter().any(|entry| matches!(entry, PairEntry::Pair(_))) {
            self.comparator.check_engine().await.map_err(|err| {
                BatchError::OcrUnavailable {
                    filename: None,
                    message: err.to_string(),
                }
            })?;
        }

        let mut pending = entries.into_iter();
        let mut ocr_confirmed = false;
        while !ocr_confirmed {
            if self.cancel.is_cancelled() {
                run.cancelled = true;
                return Ok(run);
            }
            let Some(entry) = pending.next() else {
                return Ok(run);
            };
            let outcome = match entry {
                PairEntry::Pair(pair) => match self.compare(&pair).await {
                    None => {
                        run.cancelled = true;
                        return Ok(run);
                    }
                    Some(Ok(result)) => {
                        ocr_confirmed = true;
                        PairOutcome::Compared(result)
                    }
                    Some(Err(failure)) if failure.reached_ocr() => {
                        return Err(BatchError::OcrUnavailable {
                            filename: Some(pair.filename),
                            message: failure.error.to_string(),
                        });
                    }
                    Some(Err(failure)) => {
                        ocr_confirmed = failure.stage >= PairStage::TextCompared;
                        PairOutcome::Errored {
                            filename: pair.filename,
                            stage: failure.stage,
                            error: failure.error,
                        }
                    }
                },
                other => match self.process(other).await {
                    Some(outcome) => outcome,
                    None => {
                        run.cancelled = true;
                        return Ok(run);
                    }
                },
            };
            if outcomes.send(outcome).await.is_err() {
                return Ok(run);
            }
            run.delivered += 1;
        }

        let workers = self.comparator.config().workers.max(1);
        let cancel = self.cancel.clone();
        let mut remaining = pin!(
            stream::iter(pending)
                .take_while(|_| future::ready(!cancel.is_cancelled()))
                .map(|entry| self.process(entry))
                .buffered(workers)
        );

        while let Some(Some(outcome)) = remaining.next().await {
            if outcomes.send(outcome).await.is_err() {
                break;
            }
            run.delivered += 1;
        }
        run.cancelled = self.cancel.is_cancelled();
        Ok(run)
    }

    /// `None` when the run was cancelled before the comparison finished.
    async fn compare(&self, pair: &ImagePair) -> Option<Result<ComparisonResult, PairFailure>> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                tracing::info!(pair = %pair.filename, "comparison abandoned");
                None
            }
            compared = self.comparator.compare_pair(pair) => Some(compared),
        }
    }

    async fn process(&self, entry: PairEntry) -> Option<PairOutcome> {
        let outcome = match entry {
            PairEntry::Pair(pair) => match self.compare(&pair).await? {
                Ok(result) => PairOutcome::Compared(result),
                Err(failure) => PairOutcome::Errored {
                    filename: pair.filename,
                    stage: failure.stage,
                    error: failure.error,
                },
            },
            PairEntry::Missing {
                filename,
                present_in,
            } => {
                tracing::info!(pair = %filename, side = present_in.as_str(), "pair missing a counterpart");
                PairOutcome::Missing {
                    filename,
                    present_in,
                }
            }
            PairEntry::Unreadable { filename, path, .. } => PairOutcome::Errored {
                filename,
                stage: PairStage::Pending,
                error: PairError::input(path, "file name is not valid UTF-8"),
            },
        };
        Some(outcome)
    }
}
