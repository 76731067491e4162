use std::path::PathBuf;

use serde::Serialize;

use crate::output::atomic::write_atomic;
use crate::output::error::OutputError;
use crate::output::records::OutcomeRecord;
use crate::output::summary::RunSummary;

#[derive(Serialize)]
struct ResultsDocument<'a> {
    summary: &'a RunSummary,
    results: &'a [OutcomeRecord],
}

pub(crate) struct JsonOutput {
    path: PathBuf,
    pretty: bool,
}

impl JsonOutput {
    pub(crate) fn new(path: PathBuf, pretty: bool) -> Self {
        Self { path, pretty }
    }

    pub(crate) async fn write(
        &self,
        summary: &RunSummary,
        results: &[OutcomeRecord],
    ) -> Result<(), OutputError> {
        let document = ResultsDocument { summary, results };
        let encoded = if self.pretty {
            serde_json::to_vec_pretty(&document)?
        } else {
            serde_json::to_vec(&document)?
        };
        write_atomic(&self.path, &encoded).await
    }
}
