use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;

use crate::output::error::OutputError;

/// Writes `contents` next to `path` under a temporary name, then renames it
/// into place. Readers never observe a half-written file.
pub(crate) async fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), OutputError> {
    let temp = prepare(path).await?;
    if let Err(err) = fs::write(&temp, contents).await {
        let _ = fs::remove_file(&temp).await;
        return Err(OutputError::write(path, err));
    }
    commit(&temp, path).await
}

/// Copies `source` to `path` with the same temp-then-rename discipline.
pub(crate) async fn copy_atomic(source: &Path, path: &Path) -> Result<(), OutputError> {
    let temp = prepare(path).await?;
    if let Err(err) = fs::copy(source, &temp).await {
        let _ = fs::remove_file(&temp).await;
        return Err(OutputError::CopyImage {
            from: source.to_path_buf(),
            to: path.to_path_buf(),
            source: err,
        });
    }
    commit(&temp, path).await
}

async fn prepare(path: &Path) -> Result<PathBuf, OutputError> {
    let (Some(dir), Some(name)) = (path.parent(), path.file_name()) else {
        return Err(OutputError::write(
            path,
            io::Error::new(io::ErrorKind::InvalidInput, "not a file path"),
        ));
    };
    if !dir.as_os_str().is_empty() {
        fs::create_dir_all(dir)
            .await
            .map_err(|err| OutputError::write(dir, err))?;
    }
    let mut temp_name = OsString::from(".");
    temp_name.push(name);
    temp_name.push(".tmp");
    Ok(path.with_file_name(temp_name))
}

async fn commit(temp: &Path, path: &Path) -> Result<(), OutputError> {
    if let Err(err) = fs::rename(temp, path).await {
        let _ = fs::remove_file(temp).await;
        return Err(OutputError::write(path, err));
    }
    Ok(())
}
