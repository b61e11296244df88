//! Security tests to verify the child is contained.
//!
//! Each test runs hostile code and checks that the host stays in control:
//! the call returns on time and the limits hold.

#[macro_use]
mod common;

use std::time::{Duration, Instant};

use python_exec_sandbox::prelude::*;

/// Test that infinite loops are properly terminated.
#[tokio::test]
async fn test_infinite_loop_timeout() {
    require_python!();

    let request = ExecutionRequest::new("while True: pass").timeout(Duration::from_millis(500));
    let result = PythonSandbox::default().execute(&request).await;

    assert!(result.is_timeout(), "infinite loop should time out");
    assert!(matches!(result.error(), Some(SandboxError::Timeout(_))));
}

/// Test that a large allocation fails inside the child.
#[cfg(target_os = "linux")]
#[tokio::test]
async fn test_memory_bomb_hits_limit() {
    require_python!();

    let request = ExecutionRequest::new("data = bytearray(1024 * 1024 * 1024)\nprint('SECURITY_BREACH')");
    let result = PythonSandbox::default().execute(&request).await;

    assert!(!result.is_success());
    assert!(!result.stdout.contains("SECURITY_BREACH"));
    assert!(
        result.error().map(|e| e.is_memory_limit()).unwrap_or(false),
        "expected memory limit error, stderr: {}",
        result.stderr
    );
}

/// Test that files written by the child are capped.
#[cfg(unix)]
#[tokio::test]
async fn test_file_size_limit() {
    require_python!();
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("big.bin");

    let code = format!(
        r#"
try:
    with open({:?}, 'wb') as f:
        f.write(b'x' * (2 * 1024 * 1024))
    print('SECURITY_BREACH: write succeeded')
except OSError as e:
    print(f'BLOCKED: {{type(e).__name__}}')
"#,
        target.display().to_string()
    );
    let result = PythonSandbox::default()
        .execute(&ExecutionRequest::new(code))
        .await;

    assert!(result.stdout.contains("BLOCKED"), "stdout: {} stderr: {}", result.stdout, result.stderr);
    let written = std::fs::metadata(&target).map(|m| m.len()).unwrap_or(0);
    assert!(written <= 1024 * 1024, "file grew to {} bytes", written);
}

/// Test that CPU-bound code is stopped by the CPU limit before the deadline.
#[cfg(target_os = "linux")]
#[tokio::test]
async fn test_cpu_limit_signals_child() {
    require_python!();

    let sandbox = PythonSandbox::new(SandboxConfig::builder().cpu_seconds(1).build()).unwrap();
    let request = ExecutionRequest::new("while True: pass").timeout(Duration::from_secs(10));

    let started = Instant::now();
    let result = sandbox.execute(&request).await;

    assert!(!result.is_timeout());
    assert!(started.elapsed() < Duration::from_secs(8));
    assert_eq!(result.signal, Some(libc::SIGXCPU));
    assert_eq!(result.exit_code, -libc::SIGXCPU);
    assert!(matches!(result.error(), Some(SandboxError::CpuLimitExceeded)));
}

/// Test that the parent's environment does not leak into the child.
#[tokio::test]
async fn test_host_environment_hidden() {
    require_python!();
    std::env::set_var("SANDBOX_HOST_SECRET", "hunter2");

    let result = PythonSandbox::default()
        .execute(&ExecutionRequest::new(
            "import os\nprint(os.environ.get('SANDBOX_HOST_SECRET', 'BLOCKED'))",
        ))
        .await;

    assert_eq!(result.stdout.trim(), "BLOCKED");
}

/// Test that the timeout kill also reaches processes the child started.
#[cfg(unix)]
#[tokio::test]
async fn test_timeout_kills_grandchildren() {
    require_python!();

    let code = r#"
import subprocess, sys, time
subprocess.Popen([sys.executable, '-c', 'import time; time.sleep(30)'])
time.sleep(30)
"#;
    let request = ExecutionRequest::new(code).timeout(Duration::from_secs(1));

    let started = Instant::now();
    let result = PythonSandbox::default().execute(&request).await;

    assert!(result.is_timeout());
    assert!(started.elapsed() < Duration::from_secs(3), "took {:?}", started.elapsed());
}

/// Test that background processes do not outlive a normal exit.
#[cfg(unix)]
#[tokio::test]
async fn test_background_process_killed_after_exit() {
    require_python!();
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("survived");

    let code = format!(
        r#"
import subprocess, sys
subprocess.Popen([sys.executable, '-c', '''import time; time.sleep(2); open({:?}, 'w').close()'''])
print('parent done')
"#,
        marker.display().to_string()
    );
    let started = Instant::now();
    let result = PythonSandbox::default()
        .execute(&ExecutionRequest::new(code).timeout(Duration::from_secs(1)))
        .await;

    assert!(result.is_success(), "stderr: {}", result.stderr);
    assert!(result.stdout.contains("parent done"));
    assert!(started.elapsed() < Duration::from_secs(2), "took {:?}", started.elapsed());

    tokio::time::sleep(Duration::from_secs(3)).await;
    assert!(!marker.exists(), "background process outlived the call");
}
