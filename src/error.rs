//! Error types for the Python sandbox.
//!
//! [`crate::PythonSandbox::execute`] never fails: every outcome is folded into
//! an [`crate::ExecutionResult`]. These errors are the typed view of that result
//! (see [`crate::ExecutionResult::error`]) and the internal failures that end
//! up reported as a launch failure.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while running code in the sandbox.
#[derive(Error, Debug)]
pub enum SandboxError {
    /// The child overran the wall-clock deadline and was killed.
    #[error("execution timed out after {0:?}")]
    Timeout(Duration),

    /// The child failed to allocate memory under the address-space limit.
    #[error("memory limit exceeded: {0}")]
    MemoryLimitExceeded(String),

    /// The child was killed for exceeding its CPU-time limit.
    #[error("CPU time limit exceeded")]
    CpuLimitExceeded,

    /// The code could not be written to a staging file.
    #[error("failed to stage script: {0}")]
    Staging(#[source] std::io::Error),

    /// The interpreter process could not be started.
    #[error("failed to launch interpreter '{interpreter}': {source}")]
    Spawn {
        /// The interpreter that was invoked.
        interpreter: String,
        /// The underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// No child ran; carries the diagnostic reported in stderr.
    #[error("launch failed: {0}")]
    LaunchFailed(String),

    /// The child exited unsuccessfully without a recognisable Python exception.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// A Python exception was raised during execution.
    #[error("Python {exception_type}: {message}")]
    PythonException {
        /// The type of Python exception (e.g., "ValueError", "TypeError").
        exception_type: String,
        /// The exception message.
        message: String,
        /// The full Python traceback, if available.
        traceback: Option<String>,
    },

    /// I/O error while talking to the child.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl SandboxError {
    /// Create a Python exception error from stderr output.
    pub fn from_python_stderr(stderr: &str) -> Option<Self> {
        parse_python_exception(stderr)
    }

    /// Check if this error represents a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, SandboxError::Timeout(_))
    }

    /// Check if this error represents a memory limit exceeded.
    pub fn is_memory_limit(&self) -> bool {
        matches!(self, SandboxError::MemoryLimitExceeded(_))
    }

    /// Check if this error represents a Python exception.
    pub fn is_python_exception(&self) -> bool {
        matches!(self, SandboxError::PythonException { .. })
    }

    /// Check if the child never started (staging or spawn failure).
    pub fn is_launch_failure(&self) -> bool {
        matches!(
            self,
            SandboxError::LaunchFailed(_) | SandboxError::Staging(_) | SandboxError::Spawn { .. }
        )
    }
}

/// Result type alias for sandbox operations.
pub type Result<T> = std::result::Result<T, SandboxError>;

const TRACEBACK_HEADER: &str = "Traceback (most recent call last):";

/// Parse the last Python exception out of interpreter stderr.
///
/// Recognises CPython's `ExceptionType: message` trailer, optionally preceded
/// by a `Traceback (most recent call last):` block. Returns `None` when no
/// unindented line looks like an exception.
pub fn parse_python_exception(stderr: &str) -> Option<SandboxError> {
    let lines: Vec<&str> = stderr.lines().collect();

    let (idx, line) = lines
        .iter()
        .enumerate()
        .rev()
        .find(|(_, line)| !line.starts_with(char::is_whitespace) && looks_like_exception(line))?;

    let (exception_type, message) = match line.split_once(':') {
        Some((ty, msg)) => (ty.trim().to_string(), msg.trim().to_string()),
        None => (line.trim().to_string(), String::new()),
    };

    let traceback = lines[..idx]
        .iter()
        .rposition(|l| l.starts_with(TRACEBACK_HEADER))
        .map(|start| lines[start..=idx].join("\n"));

    Some(SandboxError::PythonException {
        exception_type,
        message,
        traceback,
    })
}

/// Check if a line looks like a Python exception trailer.
///
/// The head (text before the first colon) must be a possibly dotted
/// identifier whose last segment is capitalised and names an error,
/// exception or warning class, or one of the control-flow exceptions.
fn looks_like_exception(line: &str) -> bool {
    const SUFFIXES: [&str; 3] = ["Error", "Exception", "Warning"];
    const STANDALONE: [&str; 4] = [
        "KeyboardInterrupt",
        "SystemExit",
        "StopIteration",
        "GeneratorExit",
    ];

    let head = line.split(':').next().unwrap_or_default().trim_end();
    if head.is_empty()
        || !head
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
    {
        return false;
    }

    let name = head.rsplit('.').next().unwrap_or(head);
    if !name.starts_with(|c: char| c.is_ascii_uppercase()) {
        return false;
    }

    SUFFIXES.iter().any(|s| name.ends_with(s)) || STANDALONE.contains(&name)
}
