use std::io;
use std::path::{Path, PathBuf};

/// Local scratch file owned by one invocation.
///
/// Call [`ScratchFile::remove`] when the invocation finishes; dropping it
/// without that (e.g. when the invocation future is cancelled) removes the
/// file synchronously.
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
    removed: bool,
}

impl ScratchFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            removed: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the file without blocking the runtime.
    pub async fn remove(mut self) {
        let result = tokio::fs::remove_file(&self.path).await;
        self.removed = true;
        log_failure(&self.path, result);
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if !self.removed {
            log_failure(&self.path, std::fs::remove_file(&self.path));
        }
    }
}

fn log_failure(path: &Path, result: io::Result<()>) {
    match result {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(
            error = %e,
            path = %path.display(),
            "Failed to remove scratch file"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scratch.jpg");
        std::fs::write(&path, b"data").unwrap();

        {
            let scratch = ScratchFile::new(&path);
            assert_eq!(scratch.path(), path.as_path());
        }

        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_explicit_remove() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scratch.png");
        tokio::fs::write(&path, b"data").await.unwrap();

        let scratch = ScratchFile::new(&path);
        scratch.remove().await;

        assert!(!path.exists());
    }

    #[test]
    fn test_missing_file_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        drop(ScratchFile::new(dir.path().join("never-written")));
    }
}
