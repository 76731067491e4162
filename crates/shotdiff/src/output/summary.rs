use std::fmt;

use serde::Serialize;

use crate::pipeline::PairOutcome;

/// Running pass/fail tally for a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub missing: usize,
    pub errored: usize,
    pub cancelled: bool,
}

impl RunSummary {
    pub fn observe(&mut self, outcome: &PairOutcome) {
        self.total += 1;
        match outcome {
            PairOutcome::Compared(result) if result.passed() => self.passed += 1,
            PairOutcome::Compared(_) => self.failed += 1,
            PairOutcome::Missing { .. } => self.missing += 1,
            PairOutcome::Errored { .. } => self.errored += 1,
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Comparison summary")?;
        writeln!(f, "  total:   {}", self.total)?;
        writeln!(f, "  passed:  {}", self.passed)?;
        writeln!(f, "  failed:  {}", self.failed)?;
        writeln!(f, "  missing: {}", self.missing)?;
        write!(f, "  errored: {}", self.errored)?;
        if self.cancelled {
            write!(f, "\n  (cancelled before all pairs were compared)")?;
        }
        Ok(())
    }
}
