//! Command-line glue: run one snippet and print the result as JSON.
//!
//! Run with: cargo run --example exec_json -- "print('hi')" 4

use std::env;
use std::time::Duration;

use python_exec_sandbox::prelude::*;
use python_exec_sandbox::sandbox::request::DEFAULT_TIMEOUT;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: exec_json <code> [timeout_secs]");
        std::process::exit(1);
    }
    let code = &args[1];
    let timeout = args
        .get(2)
        .and_then(|s| s.parse::<f64>().ok())
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .unwrap_or(DEFAULT_TIMEOUT);

    let request = ExecutionRequest::new(code.as_str()).timeout(timeout);
    let result = python_exec_sandbox::execute(request).await;

    println!("{}", serde_json::to_string(&result)?);
    if !result.is_success() {
        std::process::exit(1);
    }
    Ok(())
}
