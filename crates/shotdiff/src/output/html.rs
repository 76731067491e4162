use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use shotdiff_types::{ComparisonResult, Side};

use crate::output::atomic::{copy_atomic, write_atomic};
use crate::output::error::OutputError;
use crate::output::records::OutcomeRecord;
use crate::output::summary::RunSummary;
use crate::pipeline::PairOutcome;

const IMAGES_DIR: &str = "report_images";
const FRAGMENTS_DIR: &str = "fragments";
const INDEX_FILE: &str = "index.html";

const STYLE: &str = "body{font-family:sans-serif;margin:2em}\
table{border-collapse:collapse}td,th{border:1px solid #ccc;padding:4px 8px}\
.PASS{color:#1a7f37}.FAIL{color:#cf222e}.MISSING{color:#9a6700}.ERROR{color:#8250df}\
.shots{display:flex;gap:1em}.shots img{max-width:48vw;border:1px solid #999}";

/// HTML report: one fragment per pair plus an index page, with copies of
/// the compared screenshots.
pub(crate) struct HtmlReport {
    dir: PathBuf,
    version1: PathBuf,
    version2: PathBuf,
}

impl HtmlReport {
    pub(crate) fn new(dir: PathBuf, version1: PathBuf, version2: PathBuf) -> Self {
        Self {
            dir,
            version1,
            version2,
        }
    }

    pub(crate) async fn publish(&self, outcome: &PairOutcome) -> Result<(), OutputError> {
        let filename = outcome.filename();
        let sides: &[Side] = match outcome {
            PairOutcome::Compared(_) => &[Side::Version1, Side::Version2],
            PairOutcome::Missing { present_in, .. } => std::slice::from_ref(present_in),
            PairOutcome::Errored { .. } => &[],
        };
        for side in sides {
            let source = self.source_dir(*side).join(filename);
            copy_atomic(&source, &self.image_path(*side, filename)).await?;
        }
        let fragment = render_fragment(outcome);
        write_atomic(&self.fragment_path(filename), fragment.as_bytes()).await
    }

    pub(crate) async fn write_index(
        &self,
        summary: &RunSummary,
        records: &[OutcomeRecord],
    ) -> Result<(), OutputError> {
        let page = render_index(summary, records);
        write_atomic(&self.dir.join(INDEX_FILE), page.as_bytes()).await
    }

    fn source_dir(&self, side: Side) -> &Path {
        match side {
            Side::Version1 => &self.version1,
            Side::Version2 => &self.version2,
        }
    }

    fn image_path(&self, side: Side, filename: &str) -> PathBuf {
        self.dir.join(IMAGES_DIR).join(side.as_str()).join(filename)
    }

    fn fragment_path(&self, filename: &str) -> PathBuf {
        self.dir.join(FRAGMENTS_DIR).join(format!("{filename}.html"))
    }
}

fn render_fragment(outcome: &PairOutcome) -> String {
    let filename = outcome.filename();
    let status = outcome.status();
    let mut html = String::new();
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>{title}</title>\
         <style>{STYLE}</style></head><body>\n<h1>{title} <span class=\"{status}\">{status}</span></h1>\n",
        title = escape(filename),
    );
    match outcome {
        PairOutcome::Compared(result) => {
            render_result(&mut html, result);
            render_images(&mut html, filename, &[Side::Version1, Side::Version2]);
        }
        PairOutcome::Missing { present_in, .. } => {
            let _ = writeln!(
                html,
                "<p>Only present in {}; nothing to compare.</p>",
                present_in.as_str()
            );
            render_images(&mut html, filename, std::slice::from_ref(present_in));
        }
        PairOutcome::Errored { stage, error, .. } => {
            let _ = writeln!(
                html,
                "<p>Comparison stopped after stage <code>{}</code> ({}): {}</p>",
                stage.as_str(),
                error.kind().as_str(),
                escape(&error.to_string())
            );
        }
    }
    html.push_str("<p><a href=\"../index.html\">back to index</a></p>\n</body></html>\n");
    html
}

fn render_result(html: &mut String, result: &ComparisonResult) {
    let text = &result.text_verdict;
    let focus = &result.focus_verdict;
    let _ = writeln!(html, "<table>");
    let _ = writeln!(
        html,
        "<tr><th>text</th><td>{}</td><td>{:.1}% similar</td></tr>",
        escape(&text.reason),
        text.similarity * 100.0
    );
    let _ = writeln!(
        html,
        "<tr><th>focus</th><td>{}</td><td>{}</td></tr>",
        escape(&focus.detail),
        focus
            .reference
            .or(focus.candidate)
            .map(|c| format!("{} at ({}, {})", c.kind.as_str(), c.extent.x, c.extent.y))
            .unwrap_or_default()
    );
    let _ = writeln!(
        html,
        "<tr><th>header</th><td>version1: {} px ({})</td><td>version2: {} px ({})</td></tr>",
        result.headers.version1.offset_px,
        result.headers.version1.method.as_str(),
        result.headers.version2.offset_px,
        result.headers.version2.method.as_str()
    );
    let _ = writeln!(html, "</table>");
    if !text.matched {
        let _ = writeln!(
            html,
            "<h2>Text</h2>\n<div class=\"shots\"><pre>{}</pre><pre>{}</pre></div>",
            escape(&text.reference_text),
            escape(&text.candidate_text)
        );
    }
}

fn render_images(html: &mut String, filename: &str, sides: &[Side]) {
    let _ = writeln!(html, "<div class=\"shots\">");
    for side in sides {
        let _ = writeln!(
            html,
            "<figure><img src=\"../{IMAGES_DIR}/{side}/{href}\" alt=\"{side}\"><figcaption>{side}</figcaption></figure>",
            side = side.as_str(),
            href = encode_href(filename),
        );
    }
    let _ = writeln!(html, "</div>");
}

fn render_index(summary: &RunSummary, records: &[OutcomeRecord]) -> String {
    let mut html = String::new();
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>Screenshot comparison</title>\
         <style>{STYLE}</style></head><body>\n<h1>Screenshot comparison</h1>\n"
    );
    let _ = writeln!(
        html,
        "<p>total {} &middot; <span class=\"PASS\">passed {}</span> &middot; \
         <span class=\"FAIL\">failed {}</span> &middot; missing {} &middot; errored {}</p>",
        summary.total, summary.passed, summary.failed, summary.missing, summary.errored
    );
    if summary.cancelled {
        let _ = writeln!(html, "<p>The run was cancelled; only completed pairs are listed.</p>");
    }
    let _ = writeln!(html, "<table>\n<tr><th>file</th><th>status</th><th>details</th></tr>");
    for record in records {
        let details = match (&record.result, record.present_in, &record.error) {
            (Some(result), _, _) if result.passed() => String::new(),
            (Some(result), _, _) => {
                let mut parts = Vec::new();
                if !result.text_verdict.matched {
                    parts.push(result.text_verdict.reason.clone());
                }
                if !result.focus_verdict.matched {
                    parts.push(result.focus_verdict.detail.clone());
                }
                parts.join("; ")
            }
            (None, Some(side), _) => format!("only in {}", side.as_str()),
            (None, None, Some(error)) => error.message.clone(),
            (None, None, None) => String::new(),
        };
        let _ = writeln!(
            html,
            "<tr><td><a href=\"{FRAGMENTS_DIR}/{href}.html\">{name}</a></td>\
             <td class=\"{status}\">{status}</td><td>{details}</td></tr>",
            href = encode_href(&record.filename),
            name = escape(&record.filename),
            status = record.status,
            details = escape(&details),
        );
    }
    html.push_str("</table>\n</body></html>\n");
    html
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Percent-encodes a file name for use as one segment of a relative URL.
fn encode_href(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup_and_urls() {
        assert_eq!(escape("<b>&\"x\"</b>"), "&lt;b&gt;&amp;&quot;x&quot;&lt;/b&gt;");
        assert_eq!(encode_href("log in#1.png"), "log%20in%231.png");
        assert_eq!(encode_href("ü.png"), "%C3%BC.png");
        assert_eq!(encode_href("a/b.png"), "a%2Fb.png");
    }

    #[test]
    fn links_to_spaced_and_non_ascii_names_are_encoded() {
        let summary = RunSummary::default();
        let records = ["Anmeldung Übersicht.png", "ログイン.png"].map(|name| {
            OutcomeRecord::from_outcome(&PairOutcome::Missing {
                filename: name.into(),
                present_in: Side::Version2,
            })
        });
        let index = render_index(&summary, &records);
        assert!(index.contains("href=\"fragments/Anmeldung%20%C3%9Cbersicht.png.html\""));
        assert!(index.contains(">Anmeldung Übersicht.png</a>"));
        assert!(index.contains(
            "href=\"fragments/%E3%83%AD%E3%82%B0%E3%82%A4%E3%83%B3.png.html\""
        ));

        let fragment = render_fragment(&PairOutcome::Missing {
            filename: "Anmeldung Übersicht.png".into(),
            present_in: Side::Version2,
        });
        assert!(fragment.contains("../report_images/version2/Anmeldung%20%C3%9Cbersicht.png"));
    }

    #[test]
    fn missing_fragment_points_at_the_present_side_only() {
        let html = render_fragment(&PairOutcome::Missing {
            filename: "a<b>.png".into(),
            present_in: Side::Version1,
        });
        assert!(html.contains("a&lt;b&gt;.png"));
        assert!(html.contains("../report_images/version1/a%3Cb%3E.png"));
        assert!(!html.contains("report_images/version2"));
    }
}
