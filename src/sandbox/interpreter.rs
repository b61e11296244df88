//! Interpreter resolution.
//!
//! The `PATH` lookup is done once per process and shared by every sandbox.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use tracing::debug;

/// Executable names probed on `PATH`, in order of preference.
pub const CANDIDATES: [&str; 2] = ["python3", "python"];

/// Name used when nothing could be found; launching it reports the failure.
pub const FALLBACK_INTERPRETER: &str = "python3";

/// Where a resolved interpreter came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpreterSource {
    /// Supplied by the caller on the request.
    Override,
    /// Found on `PATH`.
    SearchPath,
    /// Nothing found; the generic name is used as-is.
    Fallback,
}

/// An interpreter path and how it was chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interpreter {
    /// Program passed to the OS when launching the child.
    pub path: PathBuf,
    /// How `path` was chosen.
    pub source: InterpreterSource,
}

static DISCOVERED: LazyLock<Option<PathBuf>> = LazyLock::new(|| {
    let found = CANDIDATES.iter().find_map(|name| which::which(name).ok());
    debug!(interpreter = ?found, "probed PATH for a Python interpreter");
    found
});

/// The interpreter found on `PATH`, if any.
pub fn discovered_interpreter() -> Option<&'static Path> {
    DISCOVERED.as_deref()
}

/// Pick the interpreter for one execution.
///
/// An override is returned untouched, even if it does not exist, so that a
/// bad path surfaces as a launch failure rather than silently running a
/// different Python.
pub fn resolve(override_path: Option<&Path>) -> Interpreter {
    if let Some(path) = override_path {
        return Interpreter {
            path: path.to_path_buf(),
            source: InterpreterSource::Override,
        };
    }

    match discovered_interpreter() {
        Some(path) => Interpreter {
            path: path.to_path_buf(),
            source: InterpreterSource::SearchPath,
        },
        None => Interpreter {
            path: PathBuf::from(FALLBACK_INTERPRETER),
            source: InterpreterSource::Fallback,
        },
    }
}
