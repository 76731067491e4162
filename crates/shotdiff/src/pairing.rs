use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use shotdiff_types::Side;

use crate::error::BatchError;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tif", "tiff", "gif", "webp"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePair {
    pub filename: String,
    pub version1: PathBuf,
    pub version2: PathBuf,
}

/// One filename discovered across the two folders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairEntry {
    Pair(ImagePair),
    Missing { filename: String, present_in: Side },
    /// An image whose name is not valid UTF-8 and so cannot be paired.
    /// `filename` is the lossy rendering of the name.
    Unreadable {
        filename: String,
        side: Side,
        path: PathBuf,
    },
}

impl PairEntry {
    pub fn filename(&self) -> &str {
        match self {
            PairEntry::Pair(pair) => &pair.filename,
            PairEntry::Missing { filename, .. } | PairEntry::Unreadable { filename, .. } => {
                filename
            }
        }
    }
}

#[derive(Default)]
struct FolderImages {
    named: BTreeMap<String, PathBuf>,
    unreadable: Vec<PathBuf>,
}

pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}

/// Lists every image filename found in either folder, sorted by name.
/// Names present on both sides become pairs; the rest are reported missing.
pub async fn discover_pairs(version1: &Path, version2: &Path) -> Result<Vec<PairEntry>, BatchError> {
    let FolderImages {
        named: mut left,
        unreadable: left_unreadable,
    } = list_images(version1).await?;
    let FolderImages {
        named: mut right,
        unreadable: right_unreadable,
    } = list_images(version2).await?;

    let names: BTreeSet<String> = left.keys().chain(right.keys()).cloned().collect();

    let mut entries: Vec<PairEntry> = names
        .into_iter()
        .map(|filename| match (left.remove(&filename), right.remove(&filename)) {
            (Some(version1), Some(version2)) => PairEntry::Pair(ImagePair {
                filename,
                version1,
                version2,
            }),
            (Some(_), None) => PairEntry::Missing {
                filename,
                present_in: Side::Version1,
            },
            _ => PairEntry::Missing {
                filename,
                present_in: Side::Version2,
            },
        })
        .collect();

    let unreadable = [
        (Side::Version1, left_unreadable),
        (Side::Version2, right_unreadable),
    ];
    for (side, paths) in unreadable {
        for path in paths {
            let filename = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            tracing::warn!(path = %path.display(), "image name is not valid UTF-8");
            entries.push(PairEntry::Unreadable {
                filename,
                side,
                path,
            });
        }
    }
    entries.sort_by(|a, b| a.filename().cmp(b.filename()));
    Ok(entries)
}

async fn list_images(dir: &Path) -> Result<FolderImages, BatchError> {
    let folder_error = |reason: String| BatchError::Input {
        path: dir.to_path_buf(),
        reason,
    };
    let metadata = tokio::fs::metadata(dir)
        .await
        .map_err(|err| folder_error(err.to_string()))?;
    if !metadata.is_dir() {
        return Err(folder_error("not a directory".to_string()));
    }

    let mut images = FolderImages::default();
    let mut reader = tokio::fs::read_dir(dir)
        .await
        .map_err(|err| folder_error(err.to_string()))?;
    while let Some(entry) = reader
        .next_entry()
        .await
        .map_err(|err| folder_error(err.to_string()))?
    {
        let path = entry.path();
        if !is_image_file(&path) {
            continue;
        }
        let is_file = entry
            .file_type()
            .await
            .map(|kind| !kind.is_dir())
            .unwrap_or(false);
        if !is_file {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => {
                images.named.insert(name, path);
            }
            Err(_) => images.unreadable.push(path),
        }
    }
    Ok(images)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_extensions_are_case_insensitive() {
        assert!(is_image_file(Path::new("a/login.PNG")));
        assert!(is_image_file(Path::new("form.jpeg")));
        assert!(is_image_file(Path::new("scan.TIF")));
        assert!(!is_image_file(Path::new("notes.txt")));
        assert!(!is_image_file(Path::new("png")));
    }

    #[tokio::test]
    async fn pairs_cover_the_union_of_both_folders() {
        let v1 = tempfile::tempdir().unwrap();
        let v2 = tempfile::tempdir().unwrap();
        for name in ["b.png", "a.png", "only_left.jpg", "readme.md"] {
            std::fs::write(v1.path().join(name), b"x").unwrap();
        }
        for name in ["a.png", "b.png", "only_right.png"] {
            std::fs::write(v2.path().join(name), b"x").unwrap();
        }

        let entries = discover_pairs(v1.path(), v2.path()).await.unwrap();
        let names: Vec<&str> = entries.iter().map(PairEntry::filename).collect();
        assert_eq!(names, vec!["a.png", "b.png", "only_left.jpg", "only_right.png"]);
        assert!(matches!(entries[0], PairEntry::Pair(_)));
        assert_eq!(
            entries[2],
            PairEntry::Missing {
                filename: "only_left.jpg".into(),
                present_in: Side::Version1,
            }
        );
        assert_eq!(
            entries[3],
            PairEntry::Missing {
                filename: "only_right.png".into(),
                present_in: Side::Version2,
            }
        );
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn non_utf8_names_are_listed_as_unreadable() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let v1 = tempfile::tempdir().unwrap();
        let v2 = tempfile::tempdir().unwrap();
        let raw = OsStr::from_bytes(b"caf\xe9.png");
        std::fs::write(v1.path().join(raw), b"x").unwrap();
        std::fs::write(v1.path().join("a.png"), b"x").unwrap();
        std::fs::write(v2.path().join("a.png"), b"x").unwrap();

        let entries = discover_pairs(v1.path(), v2.path()).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert!(matches!(entries[0], PairEntry::Pair(_)));
        match &entries[1] {
            PairEntry::Unreadable {
                filename,
                side,
                path,
            } => {
                assert_eq!(filename, "caf\u{FFFD}.png");
                assert_eq!(*side, Side::Version1);
                assert_eq!(path, &v1.path().join(raw));
            }
            other => panic!("expected an unreadable entry, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_folder_is_an_input_error() {
        let v1 = tempfile::tempdir().unwrap();
        let missing = v1.path().join("nope");
        let err = discover_pairs(v1.path(), &missing).await.unwrap_err();
        assert!(matches!(err, BatchError::Input { path, .. } if path == missing));
    }
}
