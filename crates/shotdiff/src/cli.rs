use std::ffi::OsString;
use std::path::PathBuf;

use clap::parser::ValueSource;
use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser};

/// Records which options were typed on the command line, so that values
/// coming from clap defaults do not override the config file.
#[derive(Debug, Default)]
pub struct CliSources {
    pub report_dir_from_cli: bool,
    pub ocr_language_from_cli: bool,
}

impl CliSources {
    fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            report_dir_from_cli: value_from_cli(matches, "report_dir"),
            ocr_language_from_cli: value_from_cli(matches, "ocr_language"),
        }
    }
}

fn value_from_cli(matches: &ArgMatches, id: &str) -> bool {
    matches
        .value_source(id)
        .is_some_and(|source| matches!(source, ValueSource::CommandLine))
}

pub fn parse_cli() -> (CliArgs, CliSources) {
    let command = CliArgs::command();
    let matches = command.get_matches();
    let args = match CliArgs::from_arg_matches(&matches) {
        Ok(args) => args,
        Err(err) => err.exit(),
    };
    let sources = CliSources::from_matches(&matches);
    (args, sources)
}

/// Parses an explicit argument list; the first item is the program name.
pub fn parse_cli_from<I, T>(args: I) -> Result<(CliArgs, CliSources), clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = CliArgs::command().try_get_matches_from(args)?;
    let args = CliArgs::from_arg_matches(&matches)?;
    let sources = CliSources::from_matches(&matches);
    Ok((args, sources))
}

#[derive(Debug, Parser)]
#[command(
    name = "shotdiff",
    about = "Compare two folders of UI screenshots by their text and focus state",
    disable_help_subcommand = true
)]
pub struct CliArgs {
    /// Folder with the reference screenshots
    #[arg(value_name = "VERSION1_DIR")]
    pub version1: PathBuf,

    /// Folder with the screenshots to check
    #[arg(value_name = "VERSION2_DIR")]
    pub version2: PathBuf,

    /// Override the configuration file path
    #[arg(long = "config")]
    pub config: Option<PathBuf>,

    /// Write machine-readable results to this JSON file
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Directory for the HTML report and copied screenshots
    #[arg(
        long = "report-dir",
        id = "report_dir",
        value_name = "DIR",
        default_value = "comparison_report"
    )]
    pub report_dir: PathBuf,

    /// Skip the HTML report
    #[arg(long = "no-report")]
    pub no_report: bool,

    /// Compare text case-insensitively
    #[arg(
        long = "ignore-case",
        id = "ignore_case",
        value_parser = clap::value_parser!(bool)
    )]
    pub ignore_case: Option<bool>,

    /// Minimum text similarity (0-1) for a pair to match
    #[arg(long = "similarity-threshold", id = "similarity_threshold")]
    pub similarity_threshold: Option<f64>,

    /// Share of the image height treated as header when no boundary is found (0-1)
    #[arg(long = "crop-percentage", id = "crop_percentage")]
    pub crop_percentage: Option<f64>,

    /// Disable focus detection
    #[arg(long = "no-focus")]
    pub no_focus: bool,

    /// OCR language, e.g. `eng` or `eng+deu`
    #[arg(
        long = "ocr-language",
        id = "ocr_language",
        value_name = "LANG",
        default_value = shotdiff_ocr::DEFAULT_LANGUAGE
    )]
    pub ocr_language: String,

    /// Drop OCR words below this confidence (0-100)
    #[arg(long = "min-ocr-confidence", id = "min_ocr_confidence")]
    pub min_ocr_confidence: Option<f32>,

    /// Per-call OCR timeout in seconds
    #[arg(
        long = "ocr-timeout",
        id = "ocr_timeout",
        value_name = "SECS",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub ocr_timeout: Option<u64>,

    /// Path to the tesseract binary
    #[arg(long = "tesseract", value_name = "PATH")]
    pub tesseract: Option<PathBuf>,

    /// Directory holding tesseract language data
    #[arg(long = "tessdata-dir", value_name = "DIR")]
    pub tessdata_dir: Option<PathBuf>,

    /// Number of pairs compared concurrently
    #[arg(
        long = "workers",
        value_parser = clap::value_parser!(usize)
    )]
    pub workers: Option<usize>,

    /// Log debug output to stderr
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}
