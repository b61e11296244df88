//! Basic example of executing Python code in the sandbox.
//!
//! Run with: cargo run --example basic_execution
//!
//! Requires python3 (or python) on PATH.

use std::time::Duration;

use python_exec_sandbox::prelude::*;
use python_exec_sandbox::sandbox::interpreter::discovered_interpreter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    match discovered_interpreter() {
        Some(path) => println!("Using interpreter: {}", path.display()),
        None => println!("No interpreter found on PATH; falling back to `python3`"),
    }

    let sandbox = PythonSandbox::new(SandboxConfig::default())?;

    println!("\n=== Test 1: Simple arithmetic ===");
    let result = sandbox
        .execute(&ExecutionRequest::new("print(1 + 1)").timeout(Duration::from_secs(3)))
        .await;
    println!("stdout: {}", result.stdout.trim_end());
    println!("returncode: {}", result.exit_code);
    println!("duration: {:?}", result.duration);

    println!("\n=== Test 2: Loop execution ===");
    let code = r#"
for i in range(5):
    print(f"Count: {i}")
"#;
    let result = sandbox.execute(&ExecutionRequest::new(code)).await;
    println!("stdout:\n{}", result.stdout);

    println!("=== Test 3: Reading stdin ===");
    let request = ExecutionRequest::new("import sys\nprint(sum(int(x) for x in sys.stdin.read().split()))")
        .stdin("1 2 3 4");
    let result = sandbox.execute(&request).await;
    println!("stdout: {}", result.stdout.trim_end());

    println!("\n=== Test 4: Python error ===");
    let result = sandbox
        .execute(&ExecutionRequest::new("raise ValueError('test error')"))
        .await;
    println!("stderr:\n{}", result.stderr);
    println!("returncode: {}", result.exit_code);

    Ok(())
}
