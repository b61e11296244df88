//! Staging of untrusted code into a temporary source file.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::TempPath;
use tracing::{debug, warn};

use crate::error::{Result, SandboxError};

/// Prefix of every staged file name.
pub const STAGED_PREFIX: &str = "pysandbox-";

/// A temporary source file that lives for exactly one execution.
///
/// The write handle is closed before the child is launched. The file is
/// removed when the guard is dropped; a failed removal is logged and
/// otherwise ignored.
#[derive(Debug)]
pub struct StagedScript {
    path: Option<TempPath>,
}

impl StagedScript {
    /// Write `code` to a uniquely named file in `dir` (or the OS temp dir).
    pub fn create(code: &str, dir: Option<&Path>, suffix: &str) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(STAGED_PREFIX).suffix(suffix);

        let mut file = match dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .map_err(SandboxError::Staging)?;

        file.write_all(code.as_bytes())
            .and_then(|()| file.flush())
            .map_err(SandboxError::Staging)?;

        // Closes the handle but keeps the path alive.
        let path = file.into_temp_path();
        debug!(path = %path.display(), bytes = code.len(), "staged script");

        Ok(Self { path: Some(path) })
    }

    /// Location of the staged file.
    pub fn path(&self) -> &Path {
        self.path.as_deref().unwrap_or_else(|| Path::new(""))
    }

    /// Owned copy of the path, for assertions after the guard is gone.
    pub fn to_path_buf(&self) -> PathBuf {
        self.path().to_path_buf()
    }
}

impl Drop for StagedScript {
    fn drop(&mut self) {
        let Some(path) = self.path.take() else { return };
        let shown = path.display().to_string();
        if let Err(e) = path.close() {
            warn!(path = %shown, error = %e, "failed to remove staged script");
        }
    }
}
