//! Shared test helpers.

#![allow(dead_code)]

use std::path::Path;

use python_exec_sandbox::sandbox::interpreter::discovered_interpreter;

/// True when a Python interpreter is on `PATH`.
pub fn python_available() -> bool {
    discovered_interpreter().is_some()
}

/// Return early from a test when no interpreter is installed.
macro_rules! require_python {
    () => {
        if !common::python_available() {
            eprintln!("skipping: no python3/python on PATH");
            return;
        }
    };
}

/// Number of entries left in a staging directory.
pub fn entries_in(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}

/// Install a test subscriber honouring `RUST_LOG`; safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
