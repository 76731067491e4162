use std::io;
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder};
use shotdiff_types::BoundingBox;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::{LumaPlane, OcrEngine, OcrError, OcrRequest, OcrResponse, OcrText};

const ENGINE_NAME: &str = "tesseract";
// Word rows in tesseract's TSV output.
const WORD_LEVEL: u32 = 5;
const TSV_COLUMNS: usize = 12;

#[derive(Debug, Clone)]
pub struct TesseractConfig {
    pub binary: PathBuf,
    pub tessdata_dir: Option<PathBuf>,
    /// Page segmentation mode passed as `--psm`; engine default when unset.
    pub page_segmentation: Option<u8>,
}

impl Default for TesseractConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("tesseract"),
            tessdata_dir: None,
            page_segmentation: None,
        }
    }
}

/// Runs the `tesseract` command-line tool, feeding PNG on stdin and reading TSV.
///
/// The child process is killed as soon as the call is dropped, so a timed out
/// or cancelled recognition leaves nothing running.
#[derive(Debug)]
pub struct TesseractOcrEngine {
    config: TesseractConfig,
}

impl TesseractOcrEngine {
    pub fn new() -> Self {
        Self::with_config(TesseractConfig::default())
    }

    pub fn with_config(config: TesseractConfig) -> Self {
        Self { config }
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.config.binary);
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }

    fn spawn_error(&self, err: io::Error) -> OcrError {
        if err.kind() == io::ErrorKind::NotFound {
            OcrError::unavailable(
                ENGINE_NAME,
                format!("binary '{}' not found", self.config.binary.display()),
            )
        } else {
            OcrError::unavailable(
                ENGINE_NAME,
                format!("failed to launch '{}': {err}", self.config.binary.display()),
            )
        }
    }
}

impl Default for TesseractOcrEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OcrEngine for TesseractOcrEngine {
    fn name(&self) -> &'static str {
        ENGINE_NAME
    }

    async fn warm_up(&self) -> Result<(), OcrError> {
        let output = self
            .command()
            .arg("--version")
            .output()
            .await
            .map_err(|err| self.spawn_error(err))?;
        if !output.status.success() {
            return Err(OcrError::unavailable(
                ENGINE_NAME,
                format!("'--version' exited with {}", output.status),
            ));
        }
        let banner = String::from_utf8_lossy(&output.stdout);
        tracing::debug!(
            version = banner.lines().next().unwrap_or_default(),
            "tesseract ready"
        );
        Ok(())
    }

    async fn recognize(&self, request: &OcrRequest<'_>) -> Result<OcrResponse, OcrError> {
        let plane = request.plane();
        if plane.is_empty() {
            return Ok(OcrResponse::empty());
        }
        let png = encode_png(plane)?;

        let mut command = self.command();
        command.stdin(Stdio::piped());
        command.arg("stdin").arg("stdout");
        let language = request.language().trim();
        if !language.is_empty() {
            command.arg("-l").arg(language);
        }
        if let Some(dir) = &self.config.tessdata_dir {
            command.arg("--tessdata-dir").arg(dir);
        }
        if let Some(psm) = self.config.page_segmentation {
            command.arg("--psm").arg(psm.to_string());
        }
        command.arg("tsv");

        let mut child = command.spawn().map_err(|err| self.spawn_error(err))?;
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| OcrError::backend("tesseract stdin was not captured"))?;
        let feed = async move {
            let written = stdin.write_all(&png).await;
            drop(stdin);
            written
        };
        let (fed, output) = tokio::join!(feed, child.wait_with_output());
        let output = output
            .map_err(|err| OcrError::backend(format!("failed to wait for tesseract: {err}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::backend(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        fed.map_err(|err| {
            OcrError::backend(format!("failed to stream image to tesseract: {err}"))
        })?;

        Ok(parse_tsv(&String::from_utf8_lossy(&output.stdout)))
    }
}

fn encode_png(plane: &LumaPlane<'_>) -> Result<Vec<u8>, OcrError> {
    let width = plane.width();
    let height = plane.height();
    let mut packed = Vec::with_capacity(width as usize * height as usize);
    for y in 0..height {
        packed.extend_from_slice(plane.row(y));
    }
    let mut encoded = Vec::new();
    PngEncoder::new(&mut encoded)
        .write_image(&packed, width, height, ColorType::L8)
        .map_err(|err| OcrError::backend(format!("failed to encode region as PNG: {err}")))?;
    Ok(encoded)
}

/// Parses word rows from `tesseract ... tsv` output.
///
/// Columns: level, page, block, par, line, word, left, top, width, height,
/// conf, text. Rows above word level and words with blank text are skipped.
pub(crate) fn parse_tsv(raw: &str) -> OcrResponse {
    let mut texts = Vec::new();
    for line in raw.lines().skip(1) {
        let columns: Vec<&str> = line.splitn(TSV_COLUMNS, '\t').collect();
        if columns.len() < TSV_COLUMNS {
            continue;
        }
        if columns[0].parse::<u32>().ok() != Some(WORD_LEVEL) {
            continue;
        }
        let text = columns[11].trim();
        if text.is_empty() {
            continue;
        }
        let parse = |idx: usize| columns[idx].trim().parse::<u32>().ok();
        let (Some(left), Some(top), Some(width), Some(height)) =
            (parse(6), parse(7), parse(8), parse(9))
        else {
            continue;
        };
        let mut entry = OcrText::new(
            BoundingBox::new(left, top, width, height),
            text.to_string(),
        );
        if let Ok(confidence) = columns[10].trim().parse::<f32>() {
            if confidence >= 0.0 {
                entry = entry.with_confidence(confidence);
            }
        }
        texts.push(entry);
    }
    OcrResponse::new(texts)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext
1\t1\t0\t0\t0\t0\t0\t0\t400\t300\t-1\t
4\t1\t1\t1\t1\t0\t20\t30\t120\t14\t-1\t
5\t1\t1\t1\t1\t1\t20\t30\t40\t14\t96.5\tFull
5\t1\t1\t1\t1\t2\t66\t30\t48\t14\t91.027\tName
5\t1\t1\t1\t2\t1\t20\t60\t8\t14\t12\t
5\t1\t1\t1\t3\t1\t20\t90\t52\t14\t-1\tEmail";

    #[test]
    fn parses_word_rows_only() {
        let response = parse_tsv(SAMPLE);
        let words: Vec<&str> = response.texts.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(words, vec!["Full", "Name", "Email"]);
        assert_eq!(response.texts[1].bounding_box, BoundingBox::new(66, 30, 48, 14));
        assert_eq!(response.texts[0].confidence, Some(96.5));
        assert_eq!(response.texts[2].confidence, None);
    }

    #[test]
    fn truncated_rows_are_ignored() {
        let response = parse_tsv("header\n5\t1\t1\n");
        assert!(response.texts.is_empty());
    }

    #[tokio::test]
    async fn missing_binary_reports_unavailable() {
        let engine = TesseractOcrEngine::with_config(TesseractConfig {
            binary: PathBuf::from("/nonexistent/shotdiff-tesseract"),
            ..TesseractConfig::default()
        });
        let err = engine.warm_up().await.unwrap_err();
        assert!(matches!(err, OcrError::Unavailable { .. }));
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn dropped_recognition_kills_the_child_process() {
        use std::os::unix::fs::PermissionsExt;
        use std::time::Duration;

        let dir = tempfile::tempdir().unwrap();
        let pid_file = dir.path().join("pid");
        let script = dir.path().join("hanging-tesseract");
        std::fs::write(
            &script,
            format!("#!/bin/sh\necho $$ > '{}'\nexec sleep 30\n", pid_file.display()),
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let engine = TesseractOcrEngine::with_config(TesseractConfig {
            binary: script,
            ..TesseractConfig::default()
        });
        let data = [200u8; 64];
        let plane = LumaPlane::packed(8, 8, &data).unwrap();
        let request = OcrRequest::new(plane, "eng");
        let attempt =
            tokio::time::timeout(Duration::from_millis(500), engine.recognize(&request)).await;
        assert!(attempt.is_err());

        let pid = std::fs::read_to_string(&pid_file).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        // Killed children are either reaped already or left as zombies.
        let state = std::fs::read_to_string(format!("/proc/{}/stat", pid.trim()))
            .ok()
            .and_then(|stat| {
                stat.rsplit(')')
                    .next()
                    .and_then(|rest| rest.split_whitespace().next())
                    .map(str::to_string)
            });
        assert!(
            matches!(state.as_deref(), None | Some("Z") | Some("X")),
            "tesseract still running in state {state:?}"
        );
    }
}
