//! Core execution engine for the Python sandbox.
//!
//! One call stages the code, launches one child, waits for it under a
//! wall-clock deadline and always hands back an [`ExecutionResult`].

use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use serde::{Serialize, Serializer};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::{parse_python_exception, Result, SandboxError};
use crate::sandbox::config::SandboxConfig;
use crate::sandbox::env::child_environment;
use crate::sandbox::interpreter::{self, Interpreter};
use crate::sandbox::io::{feed_stdin, CapturedOutput};
use crate::sandbox::limits;
use crate::sandbox::request::ExecutionRequest;
use crate::sandbox::staging::StagedScript;

/// Exit code reported when no child could be started.
pub const LAUNCH_FAILURE_EXIT_CODE: i32 = -1;

/// How an execution ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionOutcome {
    /// The child exited with code 0 before the deadline.
    Success,
    /// The child exited non-zero or was killed by a signal other than the
    /// timeout kill.
    NonZeroExit,
    /// The deadline elapsed and the child was killed.
    TimedOut,
    /// Staging or spawning failed; no child ran.
    LaunchFailed,
}

/// Result of a Python execution.
///
/// Serializes as a flat map with `returncode` and `duration_seconds` keys.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    /// True iff the child exited with code 0 and was not killed for timeout.
    pub success: bool,
    /// Captured stdout output.
    pub stdout: String,
    /// Captured stderr output, plus a marker line on timeout.
    pub stderr: String,
    /// Exit code; `-signum` for a signalled child, `-1` on launch failure.
    #[serde(rename = "returncode")]
    pub exit_code: i32,
    /// Wall-clock time from request start to result.
    #[serde(rename = "duration_seconds", serialize_with = "serialize_secs")]
    pub duration: Duration,
    /// Classification of the run.
    pub outcome: ExecutionOutcome,
    /// Signal that terminated the child, if any.
    pub signal: Option<i32>,
    /// Stdout exceeded the capture cap.
    pub stdout_truncated: bool,
    /// Stderr exceeded the capture cap.
    pub stderr_truncated: bool,
}

fn serialize_secs<S: Serializer>(
    duration: &Duration,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

impl ExecutionResult {
    /// Result for a request whose child never started.
    pub fn launch_failure(err: &SandboxError, duration: Duration) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: err.to_string(),
            exit_code: LAUNCH_FAILURE_EXIT_CODE,
            duration,
            outcome: ExecutionOutcome::LaunchFailed,
            signal: None,
            stdout_truncated: false,
            stderr_truncated: false,
        }
    }

    /// Check if the execution was successful.
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Check if the child was killed at the deadline.
    pub fn is_timeout(&self) -> bool {
        self.outcome == ExecutionOutcome::TimedOut
    }

    /// The Python exception the child died with, if stderr holds one.
    pub fn python_exception(&self) -> Option<SandboxError> {
        if self.outcome != ExecutionOutcome::NonZeroExit {
            return None;
        }
        parse_python_exception(&self.stderr)
    }

    /// Typed view of an unsuccessful run; `None` on success.
    pub fn error(&self) -> Option<SandboxError> {
        match self.outcome {
            ExecutionOutcome::Success => None,
            ExecutionOutcome::TimedOut => Some(SandboxError::Timeout(self.duration)),
            ExecutionOutcome::LaunchFailed => Some(SandboxError::LaunchFailed(self.stderr.clone())),
            ExecutionOutcome::NonZeroExit => Some(self.classify_exit()),
        }
    }

    fn classify_exit(&self) -> SandboxError {
        #[cfg(unix)]
        if self.signal == Some(libc::SIGXCPU) {
            return SandboxError::CpuLimitExceeded;
        }

        match parse_python_exception(&self.stderr) {
            Some(SandboxError::PythonException {
                exception_type,
                message,
                ..
            }) if exception_type == "MemoryError" => {
                SandboxError::MemoryLimitExceeded(if message.is_empty() {
                    exception_type
                } else {
                    message
                })
            }
            Some(exc) => exc,
            None => SandboxError::ExecutionFailed(match self.signal {
                Some(sig) => format!("killed by signal {}", sig),
                None => format!("exit code {}", self.exit_code),
            }),
        }
    }

    /// The result as a JSON object.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// A sandboxed Python execution environment.
///
/// Holds only immutable policy, so one instance can serve concurrent callers.
#[derive(Debug, Clone, Default)]
pub struct PythonSandbox {
    config: SandboxConfig,
}

impl PythonSandbox {
    /// Create a new Python sandbox with the given configuration.
    pub fn new(config: SandboxConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The policy this sandbox applies.
    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    /// Run one request to completion.
    ///
    /// Never fails: timeouts, crashes and launch problems are all reported in
    /// the returned result. The staged script is removed before returning.
    pub async fn execute(&self, request: &ExecutionRequest) -> ExecutionResult {
        let start = Instant::now();
        limits::warn_if_unsupported(&self.config.limits);

        let interpreter = interpreter::resolve(request.interpreter());

        let staged = match StagedScript::create(
            request.code(),
            self.config.temp_dir.as_deref(),
            &self.config.source_suffix,
        ) {
            Ok(staged) => staged,
            Err(e) => return launch_failed(&e, start),
        };

        let child = match self.spawn(&interpreter, &staged, request) {
            Ok(child) => child,
            Err(e) => return launch_failed(&e, start),
        };

        self.supervise(child, request, start).await
    }

    /// Blocking variant of [`PythonSandbox::execute`] for synchronous callers.
    ///
    /// Drives its own single-threaded runtime, so it must not be called from
    /// within an async context.
    pub fn execute_blocking(&self, request: &ExecutionRequest) -> ExecutionResult {
        let start = Instant::now();
        match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime.block_on(self.execute(request)),
            Err(e) => launch_failed(&SandboxError::Io(e), start),
        }
    }

    fn spawn(
        &self,
        interpreter: &Interpreter,
        staged: &StagedScript,
        request: &ExecutionRequest,
    ) -> Result<Child> {
        let mut cmd = Command::new(&interpreter.path);
        cmd.arg(staged.path());

        cmd.env_clear();
        cmd.envs(child_environment(&self.config.env));

        cmd.stdin(if request.stdin_input().is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });
        if request.captures_output() {
            cmd.stdout(Stdio::piped());
            cmd.stderr(Stdio::piped());
        } else {
            cmd.stdout(Stdio::null());
            cmd.stderr(Stdio::null());
        }
        cmd.kill_on_drop(true);

        #[cfg(unix)]
        {
            // Own process group, so the timeout kill also reaches grandchildren.
            cmd.process_group(0);

            let limits = self.config.limits;
            if !limits.is_unlimited() {
                // SAFETY: the hook only calls setrlimit, which is
                // async-signal-safe, and touches no shared state.
                unsafe {
                    cmd.pre_exec(move || limits.apply_to_current_process());
                }
            }
        }

        let child = cmd.spawn().map_err(|source| SandboxError::Spawn {
            interpreter: interpreter.path.display().to_string(),
            source,
        })?;

        debug!(
            pid = child.id(),
            interpreter = %interpreter.path.display(),
            source = ?interpreter.source,
            script = %staged.path().display(),
            "launched child"
        );

        Ok(child)
    }

    async fn supervise(
        &self,
        mut child: Child,
        request: &ExecutionRequest,
        start: Instant,
    ) -> ExecutionResult {
        let pid = child.id();
        let stdout = CapturedOutput::new(self.config.max_output_bytes);
        let stderr = CapturedOutput::new(self.config.max_output_bytes);

        let mut pumps: Vec<JoinHandle<std::io::Result<()>>> = Vec::new();
        if let Some(pipe) = child.stdout.take() {
            let buffer = stdout.clone();
            pumps.push(tokio::spawn(async move { buffer.pump(pipe).await }));
        }
        if let Some(pipe) = child.stderr.take() {
            let buffer = stderr.clone();
            pumps.push(tokio::spawn(async move { buffer.pump(pipe).await }));
        }
        if let (Some(input), Some(pipe)) = (request.stdin_input(), child.stdin.take()) {
            pumps.push(tokio::spawn(feed_stdin(pipe, input.as_bytes().to_vec())));
        }

        let timeout = request.timeout_duration();
        let mut wait_error = None;
        let (status, timed_out) = match tokio::time::timeout(timeout, child.wait()).await {
            Ok(Ok(status)) => {
                kill_group(pid);
                (Some(status), false)
            }
            Ok(Err(e)) => {
                warn!(pid, error = %e, "failed to wait on child; killing it");
                wait_error = Some(e);
                (kill_and_reap(&mut child, pid).await, false)
            }
            Err(_) => {
                warn!(pid, ?timeout, "execution timed out; killing child");
                (kill_and_reap(&mut child, pid).await, true)
            }
        };

        self.drain(pumps).await;

        let duration = start.elapsed();
        let (exit_code, signal) = status
            .map(exit_code_of)
            .unwrap_or((LAUNCH_FAILURE_EXIT_CODE, None));

        let mut stderr_text = stderr.to_string_lossy();
        if let Some(e) = wait_error {
            stderr_text.push_str(&format!("\n*** failed to wait on child: {} ***", e));
        }
        if timed_out {
            stderr_text.push_str(&timeout_marker(timeout));
        }

        let success = exit_code == 0 && !timed_out;
        let outcome = if timed_out {
            ExecutionOutcome::TimedOut
        } else if success {
            ExecutionOutcome::Success
        } else {
            ExecutionOutcome::NonZeroExit
        };

        info!(
            pid,
            exit_code,
            ?signal,
            ?outcome,
            duration_ms = duration.as_millis() as u64,
            "execution finished"
        );

        ExecutionResult {
            success,
            stdout: stdout.to_string_lossy(),
            stderr: stderr_text,
            exit_code,
            duration,
            outcome,
            signal,
            stdout_truncated: stdout.is_truncated(),
            stderr_truncated: stderr.is_truncated(),
        }
    }

    /// Wait for the pipe tasks, abandoning them after the grace period.
    async fn drain(&self, mut pumps: Vec<JoinHandle<std::io::Result<()>>>) {
        let drained = tokio::time::timeout(self.config.drain_grace, async {
            for pump in pumps.iter_mut() {
                if let Ok(Err(e)) = pump.await {
                    debug!(error = %e, "pipe task failed");
                }
            }
        })
        .await;

        if drained.is_err() {
            debug!("pipes still open after grace period; abandoning readers");
            for pump in &pumps {
                pump.abort();
            }
        }
    }
}

fn launch_failed(err: &SandboxError, start: Instant) -> ExecutionResult {
    error!(error = %err, "launch failed");
    ExecutionResult::launch_failure(err, start.elapsed())
}

/// Kill the child (and its process group) and reap it.
///
/// Safe to call when the child is already exiting: a failed kill is only
/// logged.
async fn kill_and_reap(child: &mut Child, pid: Option<u32>) -> Option<ExitStatus> {
    kill_group(pid);

    if let Err(e) = child.start_kill() {
        debug!(error = %e, "kill raced with child exit");
    }

    match child.wait().await {
        Ok(status) => Some(status),
        Err(e) => {
            warn!(error = %e, "failed to reap killed child");
            None
        }
    }
}

/// SIGKILL everything left in the child's process group.
///
/// Also runs after a normal exit so background processes the child started
/// do not outlive the call. The group id stays reserved while any member is
/// alive, so it cannot name an unrelated group; ESRCH just means the group
/// is already empty.
fn kill_group(pid: Option<u32>) {
    #[cfg(unix)]
    if let Some(pid) = pid {
        // SAFETY: plain syscall with no memory arguments.
        let rc = unsafe { libc::killpg(pid as libc::pid_t, libc::SIGKILL) };
        if rc != 0 {
            let err = std::io::Error::last_os_error();
            if err.raw_os_error() != Some(libc::ESRCH) {
                debug!(pid, error = %err, "failed to signal process group");
            }
        }
    }
    #[cfg(not(unix))]
    let _ = pid;
}

/// Exit code and terminating signal of a finished child.
fn exit_code_of(status: ExitStatus) -> (i32, Option<i32>) {
    if let Some(code) = status.code() {
        return (code, None);
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(sig) = status.signal() {
            return (-sig, Some(sig));
        }
    }

    (LAUNCH_FAILURE_EXIT_CODE, None)
}

/// Line appended to stderr when the deadline kills the child.
pub fn timeout_marker(timeout: Duration) -> String {
    format!(
        "\n*** TimeoutExpired: process killed after {} seconds ***",
        timeout.as_secs_f64()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result_with(outcome: ExecutionOutcome, exit_code: i32, stderr: &str) -> ExecutionResult {
        ExecutionResult {
            success: outcome == ExecutionOutcome::Success,
            stdout: String::new(),
            stderr: stderr.to_string(),
            exit_code,
            duration: Duration::from_millis(1500),
            outcome,
            signal: None,
            stdout_truncated: false,
            stderr_truncated: false,
        }
    }

    #[test]
    fn test_timeout_marker() {
        assert_eq!(
            timeout_marker(Duration::from_secs(1)),
            "\n*** TimeoutExpired: process killed after 1 seconds ***"
        );
        assert!(timeout_marker(Duration::from_millis(500)).contains("after 0.5 seconds"));
    }

    #[cfg(unix)]
    #[test]
    fn test_exit_code_of() {
        use std::os::unix::process::ExitStatusExt;

        assert_eq!(exit_code_of(ExitStatus::from_raw(0)), (0, None));
        assert_eq!(exit_code_of(ExitStatus::from_raw(3 << 8)), (3, None));
        assert_eq!(exit_code_of(ExitStatus::from_raw(9)), (-9, Some(9)));
    }

    #[test]
    fn test_launch_failure_result() {
        let err = SandboxError::LaunchFailed("boom".to_string());
        let result = ExecutionResult::launch_failure(&err, Duration::ZERO);
        assert!(!result.is_success());
        assert_eq!(result.exit_code, -1);
        assert_eq!(result.outcome, ExecutionOutcome::LaunchFailed);
        assert!(result.stderr.contains("boom"));
        assert!(result.error().unwrap().is_launch_failure());
    }

    #[test]
    fn test_error_view() {
        assert!(result_with(ExecutionOutcome::Success, 0, "").error().is_none());

        let timed_out = result_with(ExecutionOutcome::TimedOut, -9, "");
        assert!(timed_out.is_timeout());
        assert!(timed_out.error().unwrap().is_timeout());

        let raised = result_with(
            ExecutionOutcome::NonZeroExit,
            1,
            "Traceback (most recent call last):\n  File \"x.py\", line 1, in <module>\nZeroDivisionError: division by zero\n",
        );
        assert!(raised.error().unwrap().is_python_exception());
        assert!(raised.python_exception().is_some());

        let oom = result_with(ExecutionOutcome::NonZeroExit, 1, "MemoryError\n");
        assert!(oom.error().unwrap().is_memory_limit());

        let plain = result_with(ExecutionOutcome::NonZeroExit, 3, "");
        assert_eq!(plain.error().unwrap().to_string(), "execution failed: exit code 3");
    }

    #[cfg(unix)]
    #[test]
    fn test_cpu_limit_signal_is_classified() {
        let mut result = result_with(ExecutionOutcome::NonZeroExit, -libc::SIGXCPU, "");
        result.signal = Some(libc::SIGXCPU);
        assert!(matches!(result.error(), Some(SandboxError::CpuLimitExceeded)));
    }

    #[test]
    fn test_serialized_shape() {
        let json = result_with(ExecutionOutcome::NonZeroExit, 2, "oops").to_json();
        assert_eq!(json["success"], false);
        assert_eq!(json["stderr"], "oops");
        assert_eq!(json["returncode"], 2);
        assert_eq!(json["duration_seconds"], 1.5);
        assert_eq!(json["outcome"], "non_zero_exit");
        assert!(json.get("exit_code").is_none());
    }

    #[test]
    fn test_new_validates_config() {
        let config = SandboxConfig::builder().max_output_bytes(0).build();
        assert!(PythonSandbox::new(config).is_err());
        assert!(PythonSandbox::new(SandboxConfig::default()).is_ok());
    }
}
