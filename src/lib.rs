//! # Python Exec Sandbox
//!
//! Run untrusted Python snippets in a resource-limited child process.
//!
//! Each call stages the code in a temporary file, launches the interpreter
//! on it with a minimal environment and waits under a wall-clock deadline.
//! The call always produces an [`ExecutionResult`], whether the child
//! succeeds, raises, hangs, exhausts its limits or never starts.
//!
//! - **Resource limits** (POSIX): CPU time, virtual address space and output
//!   file size, installed in the child between fork and exec
//! - **Timeout protection**: the child and its process group are killed
//!   with SIGKILL once the deadline passes
//! - **Environment hygiene**: the parent's environment is not inherited
//! - **Scoped staging**: the temporary script is removed on every path
//!
//! ## Example
//!
//! ```rust,no_run
//! use python_exec_sandbox::prelude::*;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let sandbox = PythonSandbox::new(SandboxConfig::default())?;
//!
//!     let request = ExecutionRequest::new("print(1 + 1)").timeout(Duration::from_secs(3));
//!     let result = sandbox.execute(&request).await;
//!
//!     assert!(result.is_success());
//!     assert_eq!(result.stdout.trim(), "2");
//!     Ok(())
//! }
//! ```
//!
//! ## Security Model
//!
//! This is process isolation with OS resource limits, nothing more. There is
//! no syscall filtering, network isolation or filesystem jail: the child
//! runs with the caller's user permissions. On platforms without rlimits
//! the wall-clock timeout is the only protection, and a warning is logged
//! the first time such a sandbox runs.

pub mod error;
pub mod prelude;
pub mod sandbox;

// Re-export main types at crate root for convenience
pub use error::{Result, SandboxError};
pub use sandbox::config::{SandboxConfig, SandboxConfigBuilder};
pub use sandbox::executor::{ExecutionOutcome, ExecutionResult, PythonSandbox};
pub use sandbox::limits::ResourceLimits;
pub use sandbox::request::ExecutionRequest;

/// Run one request with the default policy.
pub async fn execute(request: impl Into<ExecutionRequest>) -> ExecutionResult {
    PythonSandbox::default().execute(&request.into()).await
}
