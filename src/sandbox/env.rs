//! Environment handed to the child interpreter.
//!
//! The parent's environment is never inherited; the child only sees the
//! variables built here.

/// Variables every child gets.
pub const BASE_ENV: [(&str, &str); 3] = [
    ("PYTHONIOENCODING", "utf-8"),
    ("PYTHONDONTWRITEBYTECODE", "1"),
    ("PYTHONUNBUFFERED", "1"),
];

/// Build the full child environment: the base set, any variable the
/// platform needs for Python to start, then caller extras (which win).
pub fn child_environment(extra: &[(String, String)]) -> Vec<(String, String)> {
    let mut env: Vec<(String, String)> = BASE_ENV
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    // Python refuses to initialise on Windows without SYSTEMROOT.
    #[cfg(windows)]
    if let Ok(root) = std::env::var("SYSTEMROOT") {
        env.push(("SYSTEMROOT".to_string(), root));
    }

    for (key, value) in extra {
        env.retain(|(k, _)| k != key);
        env.push((key.clone(), value.clone()));
    }

    env
}
