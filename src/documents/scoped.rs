//! Temporary files bounded to a single render call.
//!
//! The packaging renderers write their output to disk before reading it back.
//! [`ScopedTempArtifact`] owns that file: releasing or dropping it removes the
//! file, whichever exit path the render takes.

use std::io;
use std::path::{Path, PathBuf};

use log::warn;
use tempfile::{Builder, TempPath};

const ARTIFACT_PREFIX: &str = "render-";

/// A uniquely named file that is deleted when the guard goes away.
#[derive(Debug)]
pub struct ScopedTempArtifact {
    path: Option<TempPath>,
}

impl ScopedTempArtifact {
    /// Create an empty file named `render-<random>.<extension>` inside `dir`.
    ///
    /// The file is created exclusively, so two renders never share a path.
    pub fn acquire(dir: &Path, extension: &str) -> io::Result<Self> {
        let suffix = format!(".{}", extension.trim_start_matches('.'));
        let file = Builder::new()
            .prefix(ARTIFACT_PREFIX)
            .suffix(&suffix)
            .tempfile_in(dir)?;
        Ok(Self {
            path: Some(file.into_temp_path()),
        })
    }

    pub fn path(&self) -> &Path {
        self.path.as_deref().unwrap_or_else(|| Path::new(""))
    }

    /// Delete the file now. A file that is already gone counts as released.
    pub fn release(mut self) -> io::Result<()> {
        match self.path.take() {
            Some(path) => remove_quietly_if_absent(path),
            None => Ok(()),
        }
    }
}

impl Drop for ScopedTempArtifact {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            let display: PathBuf = path.to_path_buf();
            if let Err(err) = remove_quietly_if_absent(path) {
                warn!(
                    "failed to remove temporary artifact {}: {}",
                    display.display(),
                    err
                );
            }
        }
    }
}

fn remove_quietly_if_absent(path: TempPath) -> io::Result<()> {
    match path.close() {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn entries(dir: &Path) -> usize {
        fs::read_dir(dir).unwrap().count()
    }

    #[test]
    fn test_acquire_uses_extension_and_prefix() {
        let dir = tempdir().unwrap();
        let artifact = ScopedTempArtifact::acquire(dir.path(), "odt").unwrap();

        let name = artifact.path().file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with(ARTIFACT_PREFIX));
        assert!(name.ends_with(".odt"));
        assert!(artifact.path().exists());

        artifact.release().unwrap();
        assert_eq!(entries(dir.path()), 0);
    }

    #[test]
    fn test_drop_removes_file() {
        let dir = tempdir().unwrap();
        {
            let artifact = ScopedTempArtifact::acquire(dir.path(), ".docx").unwrap();
            fs::write(artifact.path(), b"partial").unwrap();
        }
        assert_eq!(entries(dir.path()), 0);
    }

    #[test]
    fn test_release_tolerates_already_deleted_file() {
        let dir = tempdir().unwrap();
        let artifact = ScopedTempArtifact::acquire(dir.path(), "odt").unwrap();
        fs::remove_file(artifact.path()).unwrap();
        assert!(artifact.release().is_ok());
    }

    fn failing_render(dir: &Path, seen: &mut PathBuf) -> io::Result<Vec<u8>> {
        let artifact = ScopedTempArtifact::acquire(dir, "odt")?;
        *seen = artifact.path().to_path_buf();
        fs::write(artifact.path(), b"half written")?;
        Err(io::Error::new(io::ErrorKind::Other, "packaging failed"))
    }

    #[test]
    fn test_early_return_cleans_up_and_keeps_error() {
        let dir = tempdir().unwrap();
        let mut seen = PathBuf::new();

        let err = failing_render(dir.path(), &mut seen).unwrap_err();

        assert_eq!(err.to_string(), "packaging failed");
        assert!(!seen.as_os_str().is_empty());
        assert!(!seen.exists());
        assert_eq!(entries(dir.path()), 0);
    }

    #[test]
    fn test_panic_still_cleans_up() {
        let dir = tempdir().unwrap();
        let dir_path = dir.path().to_path_buf();

        let outcome = std::panic::catch_unwind(|| {
            let artifact = ScopedTempArtifact::acquire(&dir_path, "docx").unwrap();
            fs::write(artifact.path(), b"data").unwrap();
            panic!("renderer blew up");
        });

        assert!(outcome.is_err());
        assert_eq!(entries(dir.path()), 0);
    }

    #[test]
    fn test_paths_are_unique() {
        let dir = tempdir().unwrap();
        let a = ScopedTempArtifact::acquire(dir.path(), "odt").unwrap();
        let b = ScopedTempArtifact::acquire(dir.path(), "odt").unwrap();
        assert_ne!(a.path(), b.path());
    }
}
