use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::{BaseDirs, ProjectDirs};
use serde::Deserialize;
use shotdiff_comparator::SeverityBands;
use shotdiff_detector::FocusDetectorConfig;
use shotdiff_types::FocusKind;

use crate::cli::{CliArgs, CliSources};
use crate::config::CompareConfig;
use crate::output::ReportSettings;

const PROJECT_CONFIG_FILE: &str = "shotdiff.toml";
const DEFAULT_REPORT_DIR: &str = "comparison_report";

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    ignore_case: Option<bool>,
    similarity_threshold: Option<f64>,
    crop_percentage: Option<f64>,
    enable_focus_detection: Option<bool>,
    ocr_language: Option<String>,
    min_ocr_confidence: Option<f32>,
    min_block_chars: Option<usize>,
    focus_tolerance: Option<f32>,
    max_dimension_drift: Option<f64>,
    ocr_timeout_secs: Option<u64>,
    workers: Option<usize>,
    bands: Option<BandsFileConfig>,
    focus: Option<FocusFileConfig>,
    report: Option<ReportFileConfig>,
    tesseract: Option<TesseractFileConfig>,
}

#[derive(Debug, Default, Deserialize, Clone)]
#[serde(default, deny_unknown_fields)]
struct BandsFileConfig {
    minor: Option<f64>,
    moderate: Option<f64>,
    major: Option<f64>,
}

#[derive(Debug, Default, Deserialize, Clone)]
#[serde(default, deny_unknown_fields)]
struct FocusFileConfig {
    heuristics: Option<Vec<String>>,
    foreground_threshold: Option<u32>,
    max_components: Option<usize>,
    cursor: Option<CursorFileConfig>,
    border: Option<BorderFileConfig>,
    bold: Option<BoldFileConfig>,
}

#[derive(Debug, Default, Deserialize, Clone)]
#[serde(default, deny_unknown_fields)]
struct CursorFileConfig {
    max_width: Option<u32>,
    min_height: Option<u32>,
    max_height: Option<u32>,
}

#[derive(Debug, Default, Deserialize, Clone)]
#[serde(default, deny_unknown_fields)]
struct BorderFileConfig {
    min_width: Option<u32>,
    min_height: Option<u32>,
    max_height: Option<u32>,
    min_side_coverage: Option<f32>,
}

#[derive(Debug, Default, Deserialize, Clone)]
#[serde(default, deny_unknown_fields)]
struct BoldFileConfig {
    density_ratio: Option<f32>,
    min_density: Option<f32>,
    max_density: Option<f32>,
}

#[derive(Debug, Default, Deserialize, Clone)]
#[serde(default, deny_unknown_fields)]
struct ReportFileConfig {
    enable: Option<bool>,
    dir: Option<String>,
    json: Option<String>,
    pretty_json: Option<bool>,
}

#[derive(Debug, Default, Deserialize, Clone)]
#[serde(default, deny_unknown_fields)]
struct TesseractFileConfig {
    binary: Option<String>,
    tessdata_dir: Option<String>,
    psm: Option<u8>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TesseractSettings {
    pub binary: Option<PathBuf>,
    pub tessdata_dir: Option<PathBuf>,
    pub page_segmentation: Option<u8>,
}

#[derive(Debug)]
pub struct EffectiveSettings {
    pub compare: CompareConfig,
    pub report: ReportSettings,
    pub tesseract: TesseractSettings,
    pub verbose: bool,
    pub config_path: Option<PathBuf>,
}

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    InvalidValue {
        path: Option<PathBuf>,
        field: &'static str,
        value: String,
    },
    NotFound {
        path: PathBuf,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(
                    f,
                    "failed to read config file {}: {}",
                    path.display(),
                    source
                )
            }
            ConfigError::Parse { path, source } => {
                write!(
                    f,
                    "failed to parse config file {}: {}",
                    path.display(),
                    source
                )
            }
            ConfigError::InvalidValue { path, field, value } => {
                if let Some(path) = path {
                    write!(
                        f,
                        "invalid value '{}' for '{}' in {}",
                        value,
                        field,
                        path.display()
                    )
                } else {
                    write!(f, "invalid value '{}' for '{}'", value, field)
                }
            }
            ConfigError::NotFound { path } => {
                write!(f, "config file {} does not exist", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
            ConfigError::InvalidValue { .. } => None,
            ConfigError::NotFound { .. } => None,
        }
    }
}

impl ConfigError {
    fn with_path(self, config_path: Option<&Path>) -> Self {
        match self {
            ConfigError::InvalidValue {
                path: None,
                field,
                value,
            } => ConfigError::InvalidValue {
                path: config_path.map(Path::to_path_buf),
                field,
                value,
            },
            other => other,
        }
    }
}

pub fn resolve_settings(
    cli: &CliArgs,
    sources: &CliSources,
) -> Result<EffectiveSettings, ConfigError> {
    let (file, config_path) = load_config(cli.config.as_deref())?;
    merge(cli, sources, file, config_path)
}

fn load_config(path_override: Option<&Path>) -> Result<(FileConfig, Option<PathBuf>), ConfigError> {
    if let Some(path) = path_override {
        let path = expand_pathbuf(path.to_path_buf());
        if !path.exists() {
            return Err(ConfigError::NotFound { path });
        }
        return read_config(path);
    }

    let candidates = [project_config_path(), default_config_path()];
    for path in candidates.into_iter().flatten() {
        if path.exists() {
            return read_config(path);
        }
    }
    Ok((FileConfig::default(), None))
}

fn read_config(path: PathBuf) -> Result<(FileConfig, Option<PathBuf>), ConfigError> {
    let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
        path: path.clone(),
        source,
    })?;
    let config = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.clone(),
        source,
    })?;
    tracing::debug!(path = %path.display(), "loaded config file");
    Ok((config, Some(path)))
}

fn merge(
    cli: &CliArgs,
    sources: &CliSources,
    file: FileConfig,
    config_path: Option<PathBuf>,
) -> Result<EffectiveSettings, ConfigError> {
    let config_dir = config_path
        .as_ref()
        .and_then(|path| path.parent().map(|dir| dir.to_path_buf()));

    let FileConfig {
        ignore_case: file_ignore_case,
        similarity_threshold: file_similarity_threshold,
        crop_percentage: file_crop_percentage,
        enable_focus_detection: file_enable_focus,
        ocr_language: file_ocr_language,
        min_ocr_confidence: file_min_ocr_confidence,
        min_block_chars: file_min_block_chars,
        focus_tolerance: file_focus_tolerance,
        max_dimension_drift: file_max_dimension_drift,
        ocr_timeout_secs: file_ocr_timeout_secs,
        workers: file_workers,
        bands: file_bands,
        focus: file_focus,
        report: file_report,
        tesseract: file_tesseract,
    } = file;

    let mut compare = CompareConfig::default();
    if let Some(value) = cli.ignore_case.or(file_ignore_case) {
        compare.ignore_case = value;
    }
    if let Some(value) = cli.similarity_threshold.or(file_similarity_threshold) {
        compare.similarity_threshold = value;
    }
    if let Some(value) = cli.crop_percentage.or(file_crop_percentage) {
        compare.default_crop_percentage = value;
    }
    if cli.no_focus {
        compare.enable_focus_detection = false;
    } else if let Some(value) = file_enable_focus {
        compare.enable_focus_detection = value;
    }

    compare.ocr_language = cli.ocr_language.trim().to_string();
    if !sources.ocr_language_from_cli {
        if let Some(value) = normalize_string(file_ocr_language) {
            compare.ocr_language = value;
        }
    }

    if let Some(value) = cli.min_ocr_confidence.or(file_min_ocr_confidence) {
        compare.min_ocr_confidence = value;
    }
    if let Some(value) = file_min_block_chars {
        compare.min_block_chars = value;
    }
    if let Some(value) = file_focus_tolerance {
        compare.focus_tolerance_ratio = value;
    }
    if let Some(value) = file_max_dimension_drift {
        compare.max_dimension_drift = value;
    }
    if let Some(value) = file_ocr_timeout_secs {
        if value == 0 {
            return Err(ConfigError::InvalidValue {
                path: config_path,
                field: "ocr_timeout_secs",
                value: value.to_string(),
            });
        }
    }
    if let Some(secs) = cli.ocr_timeout.or(file_ocr_timeout_secs) {
        compare.ocr_timeout = Duration::from_secs(secs);
    }
    if let Some(value) = cli.workers.or(file_workers) {
        compare.workers = value;
    }
    if let Some(bands) = file_bands {
        let defaults = SeverityBands::default();
        compare.bands = SeverityBands {
            minor_threshold: bands.minor.unwrap_or(defaults.minor_threshold),
            moderate_threshold: bands.moderate.unwrap_or(defaults.moderate_threshold),
            major_threshold: bands.major.unwrap_or(defaults.major_threshold),
        };
    }

    if let Some(focus) = file_focus {
        apply_focus(&mut compare.focus_detector, focus)
            .map_err(|err| err.with_path(config_path.as_deref()))?;
    }

    compare
        .validate()
        .map_err(|err| err.with_path(config_path.as_deref()))?;

    let file_report = file_report.unwrap_or_default();
    let report_enabled = if cli.no_report {
        false
    } else if sources.report_dir_from_cli {
        true
    } else {
        file_report.enable.unwrap_or(true)
    };
    let report_dir = if !report_enabled {
        None
    } else if sources.report_dir_from_cli {
        Some(expand_pathbuf(cli.report_dir.clone()))
    } else if let Some(path) = normalize_string(file_report.dir)
        .and_then(|dir| resolve_path_from_config(dir, config_dir.as_deref()))
    {
        Some(path)
    } else {
        Some(PathBuf::from(DEFAULT_REPORT_DIR))
    };

    let json_output = match cli.output.clone() {
        Some(path) => Some(expand_pathbuf(path)),
        None => normalize_string(file_report.json)
            .and_then(|value| resolve_path_from_config(value, config_dir.as_deref())),
    };

    let report = ReportSettings {
        report_dir,
        json_output,
        pretty_json: file_report.pretty_json.unwrap_or(true),
        version1: expand_pathbuf(cli.version1.clone()),
        version2: expand_pathbuf(cli.version2.clone()),
    };

    let file_tesseract = file_tesseract.unwrap_or_default();
    let tesseract = TesseractSettings {
        binary: cli.tesseract.clone().map(expand_pathbuf).or_else(|| {
            normalize_string(file_tesseract.binary)
                .and_then(|value| resolve_binary(value, config_dir.as_deref()))
        }),
        tessdata_dir: cli.tessdata_dir.clone().map(expand_pathbuf).or_else(|| {
            normalize_string(file_tesseract.tessdata_dir)
                .and_then(|value| resolve_path_from_config(value, config_dir.as_deref()))
        }),
        page_segmentation: file_tesseract.psm,
    };

    Ok(EffectiveSettings {
        compare,
        report,
        tesseract,
        verbose: cli.verbose,
        config_path,
    })
}

fn apply_focus(target: &mut FocusDetectorConfig, focus: FocusFileConfig) -> Result<(), ConfigError> {
    if let Some(names) = focus.heuristics {
        let mut kinds = Vec::with_capacity(names.len());
        for name in names {
            let kind = name
                .parse::<FocusKind>()
                .map_err(|_| ConfigError::InvalidValue {
                    path: None,
                    field: "focus.heuristics",
                    value: name.clone(),
                })?;
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
        target.heuristics = kinds;
    }
    if let Some(value) = focus.foreground_threshold {
        target.foreground_threshold = value;
    }
    if let Some(value) = focus.max_components {
        target.max_components = value;
    }
    if let Some(cursor) = focus.cursor {
        let options = &mut target.cursor;
        options.max_width = cursor.max_width.unwrap_or(options.max_width);
        options.min_height = cursor.min_height.unwrap_or(options.min_height);
        options.max_height = cursor.max_height.unwrap_or(options.max_height);
    }
    if let Some(border) = focus.border {
        let options = &mut target.border;
        options.min_width = border.min_width.unwrap_or(options.min_width);
        options.min_height = border.min_height.unwrap_or(options.min_height);
        options.max_height = border.max_height.unwrap_or(options.max_height);
        options.min_side_coverage = border
            .min_side_coverage
            .unwrap_or(options.min_side_coverage);
    }
    if let Some(bold) = focus.bold {
        let options = &mut target.bold;
        options.density_ratio = bold.density_ratio.unwrap_or(options.density_ratio);
        options.min_density = bold.min_density.unwrap_or(options.min_density);
        options.max_density = bold.max_density.unwrap_or(options.max_density);
    }
    Ok(())
}

fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("rs", "shotdiff", "shotdiff")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

fn project_config_path() -> Option<PathBuf> {
    env::current_dir()
        .ok()
        .map(|dir| dir.join(PROJECT_CONFIG_FILE))
}

fn normalize_string(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn expand_pathbuf(path: PathBuf) -> PathBuf {
    match path.to_str() {
        Some(s) => expand_home_path(s),
        None => path,
    }
}

fn resolve_path_from_config(value: String, base: Option<&Path>) -> Option<PathBuf> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    let expanded = expand_home_path(trimmed);
    match base {
        Some(base) if !expanded.is_absolute() => Some(base.join(expanded)),
        _ => Some(expanded),
    }
}

/// Bare command names stay as-is so they are looked up on `PATH`.
fn resolve_binary(value: String, base: Option<&Path>) -> Option<PathBuf> {
    if Path::new(&value).components().count() == 1 && !value.starts_with('~') {
        return Some(PathBuf::from(value));
    }
    resolve_path_from_config(value, base)
}

fn expand_home_path(value: &str) -> PathBuf {
    if value == "~" {
        if let Some(base) = BaseDirs::new() {
            return base.home_dir().to_path_buf();
        }
    } else if let Some(stripped) = value.strip_prefix("~/") {
        if let Some(base) = BaseDirs::new() {
            return base.home_dir().join(stripped);
        }
    }
    PathBuf::from(value)
}
