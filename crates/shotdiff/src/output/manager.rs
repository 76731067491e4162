use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;

use super::error::OutputError;
use super::html::HtmlReport;
use super::json::JsonOutput;
use super::records::OutcomeRecord;
use super::summary::RunSummary;
use crate::pipeline::PairOutcome;

/// Where report artifacts go. Each part is optional.
#[derive(Debug, Clone, Default)]
pub struct ReportSettings {
    /// HTML report directory.
    pub report_dir: Option<PathBuf>,
    /// JSON results file.
    pub json_output: Option<PathBuf>,
    pub pretty_json: bool,
    /// Source folders the report copies screenshots from.
    pub version1: PathBuf,
    pub version2: PathBuf,
}

pub struct OutputManager {
    html: Option<HtmlReport>,
    json: Option<JsonOutput>,
    state: Mutex<OutputState>,
}

impl OutputManager {
    pub fn new(settings: ReportSettings) -> Option<Arc<Self>> {
        let ReportSettings {
            report_dir,
            json_output,
            pretty_json,
            version1,
            version2,
        } = settings;
        if report_dir.is_none() && json_output.is_none() {
            return None;
        }
        Some(Arc::new(Self {
            html: report_dir.map(|dir| HtmlReport::new(dir, version1, version2)),
            json: json_output.map(|path| JsonOutput::new(path, pretty_json)),
            state: Mutex::new(OutputState::default()),
        }))
    }

    /// Writes the per-pair part of the report and remembers the outcome for
    /// [`finalize`](Self::finalize).
    pub async fn publish(&self, outcome: &PairOutcome) -> Result<(), OutputError> {
        if let Some(html) = self.html.as_ref() {
            html.publish(outcome).await?;
        }
        let record = OutcomeRecord::from_outcome(outcome);
        let mut state = self.state.lock().await;
        state.records.push(record);
        Ok(())
    }

    /// Writes the index page and results file for everything published so far.
    pub async fn finalize(&self, summary: &RunSummary) -> Result<(), OutputError> {
        let mut state = self.state.lock().await;
        state
            .records
            .sort_by(|a, b| a.filename.cmp(&b.filename));
        if let Some(html) = self.html.as_ref() {
            html.write_index(summary, &state.records).await?;
        }
        if let Some(json) = self.json.as_ref() {
            json.write(summary, &state.records).await?;
        }
        Ok(())
    }
}

#[derive(Default)]
struct OutputState {
    records: Vec<OutcomeRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use shotdiff_types::Side;

    #[test]
    fn nothing_to_write_means_no_manager() {
        assert!(OutputManager::new(ReportSettings::default()).is_none());
    }

    #[tokio::test]
    async fn finalize_writes_sorted_results() {
        let dir = tempfile::tempdir().unwrap();
        let v1 = dir.path().join("v1");
        let v2 = dir.path().join("v2");
        std::fs::create_dir(&v1).unwrap();
        std::fs::create_dir(&v2).unwrap();
        std::fs::write(v1.join("b.png"), b"png").unwrap();
        std::fs::write(v2.join("a.png"), b"png").unwrap();
        let json_path = dir.path().join("results.json");
        let report_dir = dir.path().join("report");
        let manager = OutputManager::new(ReportSettings {
            report_dir: Some(report_dir.clone()),
            json_output: Some(json_path.clone()),
            pretty_json: true,
            version1: v1,
            version2: v2,
        })
        .unwrap();

        let mut summary = RunSummary::default();
        for (name, side) in [("b.png", Side::Version1), ("a.png", Side::Version2)] {
            let outcome = PairOutcome::Missing {
                filename: name.into(),
                present_in: side,
            };
            summary.observe(&outcome);
            manager.publish(&outcome).await.unwrap();
        }
        manager.finalize(&summary).await.unwrap();

        let json: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&json_path).unwrap()).unwrap();
        assert_eq!(json["summary"]["total"], 2);
        assert_eq!(json["summary"]["missing"], 2);
        assert_eq!(json["results"][0]["filename"], "a.png");
        assert_eq!(json["results"][1]["filename"], "b.png");

        assert!(report_dir.join("index.html").is_file());
        assert!(report_dir.join("fragments/b.png.html").is_file());
        assert_eq!(
            std::fs::read(report_dir.join("report_images/version1/b.png")).unwrap(),
            b"png"
        );
    }
}
