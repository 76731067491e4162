use std::pin::pin;
use std::sync::Arc;

use futures_util::{Stream, StreamExt};
use indicatif::ProgressBar;
use shotdiff_ocr::OcrEngine;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::comparator::SmartImageComparator;
use crate::error::BatchError;
use crate::output::{OutputError, OutputManager, RunSummary};
use crate::pairing::discover_pairs;
use crate::pipeline::{BatchRunner, PairOutcome};
use crate::settings::EffectiveSettings;

const OUTCOME_CHANNEL_CAPACITY: usize = 64;

/// Compares both folders, writes the configured reports and returns the tally.
///
/// Outcomes are printed above `progress` as they arrive. Reports are only
/// finalized when the run was not stopped by a fatal error.
pub async fn run_batch(
    settings: &EffectiveSettings,
    engine: Arc<dyn OcrEngine>,
    cancel: CancellationToken,
    progress: ProgressBar,
) -> Result<RunSummary, BatchError> {
    let comparator = Arc::new(SmartImageComparator::new(settings.compare.clone(), engine));
    let runner = BatchRunner::new(comparator, cancel);

    let entries = discover_pairs(&settings.report.version1, &settings.report.version2).await?;
    progress.set_length(entries.len() as u64);

    let output = OutputManager::new(settings.report.clone());
    let (tx, rx) = mpsc::channel::<PairOutcome>(OUTCOME_CHANNEL_CAPACITY);
    let (run, reported) = tokio::join!(
        runner.run_entries(entries, tx),
        drive_outcomes(rx, output.as_deref(), &progress)
    );

    let run = run?;
    let mut summary = reported?;
    summary.cancelled = run.cancelled;
    if run.cancelled {
        tracing::warn!(
            delivered = run.delivered,
            discovered = run.discovered,
            "run cancelled"
        );
    }
    if let Some(output) = output.as_ref() {
        output.finalize(&summary).await?;
    }
    Ok(summary)
}

/// Cancels the run on the first interrupt. Returns `true` once a second
/// interrupt arrives, `false` when the stream ends before that.
pub async fn watch_interrupts<S>(cancel: CancellationToken, interrupts: S) -> bool
where
    S: Stream<Item = ()>,
{
    let mut interrupts = pin!(interrupts);
    if interrupts.next().await.is_none() {
        return false;
    }
    tracing::warn!("interrupt received; abandoning pairs in progress, interrupt again to exit now");
    cancel.cancel();
    interrupts.next().await.is_some()
}

async fn drive_outcomes(
    mut rx: mpsc::Receiver<PairOutcome>,
    output: Option<&OutputManager>,
    progress: &ProgressBar,
) -> Result<RunSummary, OutputError> {
    let mut summary = RunSummary::default();
    while let Some(outcome) = rx.recv().await {
        summary.observe(&outcome);
        progress.inc(1);
        progress.set_message(format!(
            "{} passed, {} failed",
            summary.passed,
            summary.total - summary.passed
        ));
        let line = outcome.describe();
        progress.suspend(|| println!("{line}"));
        if let Some(output) = output {
            output.publish(&outcome).await?;
        }
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    #[tokio::test]
    async fn second_interrupt_asks_for_an_immediate_exit() {
        let cancel = CancellationToken::new();
        assert!(watch_interrupts(cancel.clone(), stream::iter([(), ()])).await);
        assert!(cancel.is_cancelled());
    }

    #[tokio::test]
    async fn single_interrupt_only_cancels_the_run() {
        let cancel = CancellationToken::new();
        assert!(!watch_interrupts(cancel.clone(), stream::iter([()])).await);
        assert!(cancel.is_cancelled());

        let untouched = CancellationToken::new();
        assert!(!watch_interrupts(untouched.clone(), stream::empty()).await);
        assert!(!untouched.is_cancelled());
    }
}
