//! Example demonstrating error handling patterns.
//!
//! Every call returns an `ExecutionResult`; `error()` turns a failed run
//! into a typed `SandboxError`:
//! - Python exceptions
//! - Timeouts
//! - Launch failures
//! - Configuration errors
//!
//! Run with: cargo run --example error_handling

use std::time::Duration;

use python_exec_sandbox::prelude::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("=== Error Handling Example ===\n");

    let sandbox = PythonSandbox::new(SandboxConfig::default())?;

    println!("--- Test 1: Python ValueError ---");
    let result = sandbox
        .execute(&ExecutionRequest::new("int('not a number')"))
        .await;
    println!("returncode: {}", result.exit_code);
    if let Some(SandboxError::PythonException {
        exception_type,
        message,
        traceback,
    }) = result.python_exception()
    {
        println!("  Type: {}", exception_type);
        println!("  Message: {}", message);
        if let Some(tb) = traceback {
            println!("  Traceback: {} lines", tb.lines().count());
        }
    }
    println!();

    println!("--- Test 2: Python NameError ---");
    let result = sandbox
        .execute(&ExecutionRequest::new("print(undefined_variable)"))
        .await;
    if let Some(err) = result.error() {
        println!("Caught: {}", err);
    }
    println!();

    println!("--- Test 3: Timeout ---");
    let request = ExecutionRequest::new("while True: pass").timeout(Duration::from_millis(500));
    let result = sandbox.execute(&request).await;
    match result.error() {
        Some(err) if err.is_timeout() => {
            println!("Caught: {}", err);
            println!("stderr tail: {}", result.stderr.trim());
        }
        other => println!("Unexpected: {:?}", other),
    }
    println!();

    println!("--- Test 4: Missing interpreter ---");
    let request = ExecutionRequest::new("print(1)").interpreter_path("/nonexistent/python3");
    let result = sandbox.execute(&request).await;
    println!("returncode: {} ({:?})", result.exit_code, result.outcome);
    println!("stderr: {}", result.stderr);
    println!();

    println!("--- Test 5: Invalid configuration ---");
    match PythonSandbox::new(SandboxConfig::builder().max_output_bytes(0).build()) {
        Ok(_) => println!("Unexpectedly accepted"),
        Err(e) => println!("Rejected: {}", e),
    }

    Ok(())
}
