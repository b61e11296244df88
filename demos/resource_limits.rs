//! Example showing the resource limits in action.
//!
//! Run with: cargo run --example resource_limits
//!
//! The limits are enforced on Unix only; elsewhere only the timeout applies.

use std::time::Duration;

use python_exec_sandbox::prelude::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("Resource limits supported: {}", ResourceLimits::SUPPORTED);

    let config = SandboxConfig::builder()
        .cpu_seconds(1)
        .max_memory(128 * 1024 * 1024)
        .max_file_size(64 * 1024)
        .build();
    println!("Policy: {:?}\n", config.limits);
    let sandbox = PythonSandbox::new(config)?;

    let workdir = tempfile::tempdir()?;
    let target = workdir.path().join("out.bin");

    let cases = [
        ("Memory", "data = bytearray(512 * 1024 * 1024)".to_string()),
        ("CPU", "while True: pass".to_string()),
        (
            "File size",
            format!(
                "with open({:?}, 'wb') as f:\n    f.write(b'x' * (1024 * 1024))",
                target.display().to_string()
            ),
        ),
    ];

    for (name, code) in cases {
        println!("--- {} ---", name);
        let request = ExecutionRequest::new(code).timeout(Duration::from_secs(10));
        let result = sandbox.execute(&request).await;
        println!(
            "outcome: {:?}, returncode: {}, signal: {:?}, duration: {:?}",
            result.outcome, result.exit_code, result.signal, result.duration
        );
        match result.error() {
            Some(err) => println!("error: {}\n", err),
            None => println!("completed without hitting a limit\n"),
        }
    }

    Ok(())
}
