//! Temporary program files scoped to a single execution

use crate::Result;
use std::io::Write;
use std::path::Path;
use tempfile::{Builder, NamedTempFile};

/// A submission written to a uniquely named `.py` file.
///
/// The file is deleted when the artifact is dropped, so every exit path of an
/// execution (including panics and cancelled futures) removes it.
#[derive(Debug)]
pub struct ScriptArtifact {
    file: NamedTempFile,
}

impl ScriptArtifact {
    /// Write `source` to a fresh file inside `dir`
    pub fn create(dir: &Path, source: &str) -> Result<Self> {
        let mut file = Builder::new()
            .prefix("submission-")
            .suffix(".py")
            .tempfile_in(dir)?;
        file.write_all(source.as_bytes())?;
        file.flush()?;
        tracing::trace!(
            path = %file.path().display(),
            bytes = source.len(),
            "script artifact created"
        );
        Ok(Self { file })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Delete now and report failure instead of swallowing it in `Drop`
    pub fn remove(self) {
        let path = self.file.path().to_path_buf();
        if let Err(e) = self.file.close() {
            tracing::warn!(path = %path.display(), error = %e, "failed to remove script artifact");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_source_and_removes_on_close() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = ScriptArtifact::create(dir.path(), "print('hi')\n").unwrap();
        let path = artifact.path().to_path_buf();

        assert!(path.starts_with(dir.path()));
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("py"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "print('hi')\n");

        artifact.remove();
        assert!(!path.exists());
    }

    #[test]
    fn removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = {
            let artifact = ScriptArtifact::create(dir.path(), "x = 1").unwrap();
            artifact.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn names_are_unique() {
        let dir = tempfile::tempdir().unwrap();
        let a = ScriptArtifact::create(dir.path(), "a").unwrap();
        let b = ScriptArtifact::create(dir.path(), "b").unwrap();
        assert_ne!(a.path(), b.path());
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let gone = dir.path().join("does-not-exist");
        assert!(ScriptArtifact::create(&gone, "x").is_err());
    }
}
