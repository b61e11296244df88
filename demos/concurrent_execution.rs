//! Example of concurrent Python executions sharing one sandbox.
//!
//! The sandbox holds only immutable policy, so an `Arc` is all that is
//! needed to serve many callers at once.
//!
//! Run with: cargo run --example concurrent_execution

use std::sync::Arc;
use std::time::Instant;

use python_exec_sandbox::prelude::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("=== Concurrent Execution Example ===\n");

    let sandbox = Arc::new(PythonSandbox::new(SandboxConfig::default())?);

    let tasks = vec![
        ("Task 1", "print(sum([i**2 for i in range(100)]))", "Sum of squares"),
        ("Task 2", "print(len([x for x in range(1000) if x % 3 == 0]))", "Count divisible by 3"),
        ("Task 3", "print(''.join([chr(65 + i % 26) for i in range(50)]))", "Generate letters"),
        ("Task 4", "print(max([i * (100 - i) for i in range(101)]))", "Maximum product"),
    ];

    println!("Starting {} concurrent tasks...\n", tasks.len());
    let start = Instant::now();

    let handles: Vec<_> = tasks
        .into_iter()
        .map(|(name, code, description)| {
            let sandbox = Arc::clone(&sandbox);
            tokio::spawn(async move {
                let result = sandbox.execute(&ExecutionRequest::new(code)).await;
                (name, description, result)
            })
        })
        .collect();

    for handle in handles {
        let (name, description, result) = handle.await?;
        if result.is_success() {
            println!(
                "{} ({}): {} [{:?}]",
                name,
                description,
                result.stdout.trim(),
                result.duration
            );
        } else {
            println!("{} ({}) failed: {}", name, description, result.stderr.trim());
        }
    }

    println!("\nAll tasks finished in {:?}", start.elapsed());
    Ok(())
}
