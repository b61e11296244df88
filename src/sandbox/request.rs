//! A single execution request.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default wall-clock deadline for one execution.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(4);

/// Untrusted code plus the options for running it once.
///
/// Built with [`ExecutionRequest::new`] and the consuming setters; read-only
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest {
    code: String,
    timeout: Duration,
    capture_output: bool,
    interpreter_path: Option<PathBuf>,
    stdin: Option<String>,
}

impl ExecutionRequest {
    /// A request with a 4 second timeout, captured output and the default
    /// interpreter.
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            timeout: DEFAULT_TIMEOUT,
            capture_output: true,
            interpreter_path: None,
            stdin: None,
        }
    }

    /// Set the wall-clock deadline.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Discard the child's output instead of capturing it.
    pub fn capture_output(mut self, capture: bool) -> Self {
        self.capture_output = capture;
        self
    }

    /// Run with this interpreter instead of the one found on `PATH`.
    pub fn interpreter_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.interpreter_path = Some(path.into());
        self
    }

    /// Feed this text to the child's stdin.
    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn timeout_duration(&self) -> Duration {
        self.timeout
    }

    pub fn captures_output(&self) -> bool {
        self.capture_output
    }

    pub fn interpreter(&self) -> Option<&Path> {
        self.interpreter_path.as_deref()
    }

    pub fn stdin_input(&self) -> Option<&str> {
        self.stdin.as_deref()
    }
}

impl From<&str> for ExecutionRequest {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

impl From<String> for ExecutionRequest {
    fn from(code: String) -> Self {
        Self::new(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let request = ExecutionRequest::from("print(1)");
        assert_eq!(request.code(), "print(1)");
        assert_eq!(request.timeout_duration(), Duration::from_secs(4));
        assert!(request.captures_output());
        assert!(request.interpreter().is_none());
        assert!(request.stdin_input().is_none());
    }

    #[test]
    fn test_setters() {
        let request = ExecutionRequest::new(String::from("x"))
            .timeout(Duration::from_millis(250))
            .capture_output(false)
            .interpreter_path("/usr/bin/python3.12")
            .stdin("data");

        assert_eq!(request.timeout_duration(), Duration::from_millis(250));
        assert!(!request.captures_output());
        assert_eq!(request.interpreter(), Some(Path::new("/usr/bin/python3.12")));
        assert_eq!(request.stdin_input(), Some("data"));
    }
}
