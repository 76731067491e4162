use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures while writing report artifacts.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to copy screenshot {} to {}: {source}", from.display(), to.display())]
    CopyImage {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to serialize comparison results: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl OutputError {
    pub(crate) fn write(path: impl Into<PathBuf>, source: io::Error) -> Self {
        OutputError::Write {
            path: path.into(),
            source,
        }
    }
}
