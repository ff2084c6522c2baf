//! Local directory source.
//!
//! The default adapter: any source URI without a scheme (or with `local://`)
//! resolves here.

use async_stream::try_stream;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio_util::io::ReaderStream;
use tracing::{debug, instrument};

use crate::error::{FsError, Result, ResultExt};
use crate::path::{clean_relative, join};
use crate::traits::{EntryStream, PhotoSource, SourceEntry, SourceFile};

/// A directory tree on the local filesystem.
///
/// Paths are `/`-separated and relative to the absolute base directory the
/// source was created with; `root()` is always `"."`.
#[derive(Debug, Clone)]
pub struct LocalSource {
    base_path: PathBuf,
}

impl LocalSource {
    /// Create a source rooted at `base_path`.
    ///
    /// Relative paths are made absolute against the current directory.
    ///
    /// # Errors
    ///
    /// Returns `FsError::InvalidPath` if the path does not exist or is not a directory.
    pub fn new(base_path: impl AsRef<Path>) -> Result<Self> {
        let base_path = base_path.as_ref();
        let base_path = if base_path.is_absolute() {
            base_path.to_path_buf()
        } else {
            std::env::current_dir()?.join(base_path)
        };

        match std::fs::metadata(&base_path) {
            Ok(meta) if meta.is_dir() => Ok(Self { base_path }),
            Ok(_) => Err(FsError::InvalidPath(format!(
                "{} is not a directory",
                base_path.display()
            ))),
            Err(e) => Err(FsError::InvalidPath(format!("{}: {}", base_path.display(), e))),
        }
    }

    /// Get the absolute base path for this source.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Convert a relative source path to a filesystem path.
    fn to_fs_path(&self, path: &str) -> Result<PathBuf> {
        let relative = clean_relative(path)?;
        if relative.is_empty() {
            return Ok(self.base_path.clone());
        }
        Ok(relative
            .split('/')
            .fold(self.base_path.clone(), |acc, part| acc.join(part)))
    }

    fn map_io_error(err: std::io::Error, path: &str) -> FsError {
        match err.kind() {
            std::io::ErrorKind::NotFound => FsError::NotFound(path.to_string()),
            std::io::ErrorKind::PermissionDenied => FsError::PermissionDenied(path.to_string()),
            _ => FsError::Io(err),
        }
    }
}

fn modified_time(metadata: &std::fs::Metadata) -> Option<DateTime<Utc>> {
    metadata.modified().ok().map(DateTime::<Utc>::from)
}

#[async_trait]
impl PhotoSource for LocalSource {
    fn scheme(&self) -> &str {
        "local"
    }

    fn root(&self) -> &str {
        "."
    }

    fn list_stream<'a>(&'a self, root: &'a str) -> EntryStream<'a> {
        Box::pin(try_stream! {
            let start = clean_relative(root)?;
            let mut pending = vec![start];

            while let Some(dir) = pending.pop() {
                let fs_dir = self.to_fs_path(&dir)?;
                debug!("Listing {:?}", fs_dir);

                let mut entries = fs::read_dir(&fs_dir)
                    .await
                    .map_err(|e| Self::map_io_error(e, &dir))
                    .context("list", &dir)?;

                while let Some(entry) = entries
                    .next_entry()
                    .await
                    .map_err(|e| Self::map_io_error(e, &dir))?
                {
                    let name = entry.file_name().to_string_lossy().into_owned();
                    let path = join(&dir, &name);
                    let file_type = entry.file_type().await.map_err(FsError::from)?;

                    // Symlinked files are followed, symlinked directories are not
                    let metadata = if file_type.is_symlink() {
                        match fs::metadata(entry.path()).await {
                            Ok(meta) if meta.is_file() => meta,
                            _ => {
                                debug!(path = %path, "Skipping symlink");
                                continue;
                            }
                        }
                    } else {
                        entry.metadata().await.map_err(FsError::from)?
                    };

                    if metadata.is_dir() {
                        pending.push(path.clone());
                        yield SourceEntry {
                            path,
                            is_dir: true,
                            size: None,
                            modified: modified_time(&metadata),
                        };
                    } else if metadata.is_file() {
                        yield SourceEntry {
                            path,
                            is_dir: false,
                            size: Some(metadata.len()),
                            modified: modified_time(&metadata),
                        };
                    }
                }
            }
        })
    }

    #[instrument(skip(self), fields(path = %path))]
    async fn open(&self, path: &str) -> Result<SourceFile> {
        let fs_path = self.to_fs_path(path).context("open", path)?;
        debug!("Opening {:?}", fs_path);

        let metadata = fs::metadata(&fs_path)
            .await
            .map_err(|e| Self::map_io_error(e, path))?;
        if !metadata.is_file() {
            return Err(FsError::NotFound(path.to_string()));
        }

        let file = fs::File::open(&fs_path)
            .await
            .map_err(|e| Self::map_io_error(e, path))?;
        let body = ReaderStream::new(file).map_err(FsError::from);

        let mut opened = SourceFile::new(path, Box::pin(body)).with_size(Some(metadata.len()));
        if let Some(modified) = modified_time(&metadata) {
            opened = opened.with_modified(modified);
        }
        Ok(opened)
    }

    fn normalize(&self, path: &str) -> Result<String> {
        Ok(path.to_string())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use tempfile::TempDir;

    async fn create_test_source() -> (LocalSource, TempDir) {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("2024/trip")).unwrap();
        std::fs::write(temp.path().join("top.jpg"), b"top").unwrap();
        std::fs::write(temp.path().join("2024/trip/IMG_0001.jpg"), b"nested").unwrap();
        let source = LocalSource::new(temp.path()).unwrap();
        (source, temp)
    }

    async fn collect(source: &LocalSource, root: &str) -> Vec<SourceEntry> {
        let mut entries: Vec<_> = source
            .list_stream(root)
            .map(|e| e.unwrap())
            .collect()
            .await;
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        entries
    }

    #[tokio::test]
    async fn test_list_recursive() {
        let (source, _temp) = create_test_source().await;

        let entries = collect(&source, source.root()).await;
        let paths: Vec<_> = entries.iter().map(|e| (e.path.as_str(), e.is_dir)).collect();

        assert_eq!(
            paths,
            vec![
                ("2024", true),
                ("2024/trip", true),
                ("2024/trip/IMG_0001.jpg", false),
                ("top.jpg", false),
            ]
        );
        assert_eq!(entries[2].size, Some(6));
    }

    #[tokio::test]
    async fn test_list_subtree() {
        let (source, _temp) = create_test_source().await;

        let entries = collect(&source, "2024/trip").await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, "2024/trip/IMG_0001.jpg");
    }

    #[tokio::test]
    async fn test_list_empty_directory() {
        let temp = TempDir::new().unwrap();
        let source = LocalSource::new(temp.path()).unwrap();

        assert!(collect(&source, ".").await.is_empty());
    }

    #[tokio::test]
    async fn test_open_and_read() {
        let (source, _temp) = create_test_source().await;

        let file = source.open("2024/trip/IMG_0001.jpg").await.unwrap();
        assert_eq!(file.size, Some(6));
        assert!(!file.is_placeholder());
        assert_eq!(&file.bytes().await.unwrap()[..], b"nested");
    }

    #[tokio::test]
    async fn test_open_missing_is_not_found() {
        let (source, _temp) = create_test_source().await;

        let err = source.open("nope.jpg").await.unwrap_err();
        assert!(err.is_not_found());

        // Directories are not openable as files
        let err = source.open("2024").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_open_rejects_escape() {
        let (source, _temp) = create_test_source().await;

        let err = source.open("../secret.jpg").await.unwrap_err();
        assert!(matches!(err.root_cause(), FsError::InvalidPath(_)));
    }

    #[test]
    fn test_new_requires_directory() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("file.jpg");
        std::fs::write(&file, b"x").unwrap();

        assert!(matches!(LocalSource::new(&file), Err(FsError::InvalidPath(_))));
        assert!(matches!(
            LocalSource::new(temp.path().join("missing")),
            Err(FsError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_scheme_root_normalize() {
        let temp = TempDir::new().unwrap();
        let source = LocalSource::new(temp.path()).unwrap();

        assert_eq!(source.scheme(), "local");
        assert_eq!(source.root(), ".");
        assert_eq!(source.normalize("a/b.jpg").unwrap(), "a/b.jpg");
        assert!(source.base_path().is_absolute());
    }
}
