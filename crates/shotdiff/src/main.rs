use std::process::ExitCode;

use futures_util::stream;
use shotdiff::backend::build_ocr_engine;
use shotdiff::cli::parse_cli;
use shotdiff::settings::resolve_settings;
use shotdiff::{BatchError, progress, run_batch, watch_interrupts};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const LOG_ENV: &str = "SHOTDIFF_LOG";
/// Exit status after a second interrupt, as if SIGINT had not been caught.
const INTERRUPTED_EXIT: i32 = 130;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    let (cli, sources) = parse_cli();
    init_tracing(cli.verbose);

    let settings = match resolve_settings(&cli, &sources) {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("configuration error: {err}");
            return ExitCode::from(2);
        }
    };

    let engine = match build_ocr_engine(&settings.tesseract) {
        Ok(engine) => engine,
        Err(err) => {
            return fail(BatchError::OcrUnavailable {
                filename: None,
                message: err.to_string(),
            });
        }
    };

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        let interrupts = stream::unfold((), |()| async {
            tokio::signal::ctrl_c().await.ok().map(|()| ((), ()))
        });
        async move {
            if watch_interrupts(cancel, interrupts).await {
                eprintln!("interrupted again; exiting without waiting for running pairs");
                std::process::exit(INTERRUPTED_EXIT);
            }
        }
    });

    let bar = progress::pairs_bar(0);
    match run_batch(&settings, engine, cancel, bar.clone()).await {
        Ok(summary) => {
            bar.finish_and_clear();
            println!("{summary}");
            if let Some(dir) = settings.report.report_dir.as_ref() {
                println!("HTML report: {}", dir.join("index.html").display());
            }
            if let Some(path) = settings.report.json_output.as_ref() {
                println!("JSON results: {}", path.display());
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            bar.abandon();
            fail(err)
        }
    }
}

fn fail(err: BatchError) -> ExitCode {
    match &err {
        BatchError::OcrUnavailable {
            filename: Some(filename),
            ..
        } => eprintln!("error: {err} (first OCR call, on {filename})"),
        _ => eprintln!("error: {err}"),
    }
    ExitCode::FAILURE
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
