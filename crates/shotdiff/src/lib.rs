//! Screenshot regression comparison: pairs screenshots from two folders,
//! strips volatile headers, then judges each pair on OCR text and focus state.

pub mod app;
pub mod backend;
pub mod cli;
pub mod comparator;
pub mod config;
pub mod error;
pub mod output;
pub mod pairing;
pub mod pipeline;
pub mod progress;
pub mod settings;

pub use app::{run_batch, watch_interrupts};
pub use comparator::{PairFailure, PairStage, SmartImageComparator};
pub use config::CompareConfig;
pub use error::{BatchError, ErrorKind, PairError};
pub use pairing::{ImagePair, PairEntry, discover_pairs};
pub use pipeline::{BatchRun, BatchRunner, PairOutcome};
