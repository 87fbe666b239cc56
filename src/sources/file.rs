//! A filesystem template source.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;

use super::Source;
use crate::error::SourceError;

/// Reads templates from a root directory, appending a fixed extension
/// to extensionless paths. Paths that would escape the root are
/// rejected before touching the filesystem.
#[derive(Debug, Clone)]
pub struct FileSource {
    root: PathBuf,
    extension: String,
}

impl FileSource {
    /// A source rooted at `root` serving `*.{extension}` files.
    pub fn new(root: impl Into<PathBuf>, extension: &str) -> Self {
        Self {
            root: root.into(),
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, SourceError> {
        let relative = Path::new(path);
        if relative.is_absolute() {
            return Err(SourceError::IllegalAccess(format!(
                "template path \"{path}\" must be relative"
            )));
        }
        for component in relative.components() {
            match component {
                Component::Normal(_) => {}
                _ => {
                    return Err(SourceError::IllegalAccess(format!(
                        "template path \"{path}\" may not traverse directories"
                    )));
                }
            }
        }
        let mut full = self.root.join(relative);
        if full.extension().is_none() {
            full.set_extension(&self.extension);
        }
        Ok(full)
    }
}

#[async_trait]
impl Source for FileSource {
    async fn read(&self, path: &str) -> Result<Vec<u8>, SourceError> {
        let full = self.resolve(path)?;
        match tokio::fs::read(&full).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(SourceError::NotFound(path.to_string()))
            }
            Err(e) => Err(SourceError::Io(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_files_with_the_configured_extension() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("hello.vnr"), "Hello!").unwrap();
        let source = FileSource::new(dir.path(), "vnr");
        assert_eq!(source.read("hello").await.unwrap(), b"Hello!");
    }

    #[tokio::test]
    async fn missing_files_are_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let source = FileSource::new(dir.path(), "vnr");
        assert!(matches!(
            source.read("ghost").await,
            Err(SourceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn traversal_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let source = FileSource::new(dir.path(), "vnr");
        assert!(matches!(
            source.read("../etc/passwd").await,
            Err(SourceError::IllegalAccess(_))
        ));
        assert!(matches!(
            source.read("/etc/passwd").await,
            Err(SourceError::IllegalAccess(_))
        ));
    }

    #[tokio::test]
    async fn subdirectories_are_allowed() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("partials")).unwrap();
        std::fs::write(dir.path().join("partials/header.vnr"), "h").unwrap();
        let source = FileSource::new(dir.path(), "vnr");
        assert_eq!(source.read("partials/header").await.unwrap(), b"h");
    }
}
