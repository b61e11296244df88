//! Sandbox configuration with builder pattern.
//!
//! This is executor-wide policy. Per-call options (code, timeout,
//! interpreter) live on [`crate::ExecutionRequest`].

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Result, SandboxError};
use crate::sandbox::limits::ResourceLimits;

/// Default cap on captured bytes per stream (1 MiB).
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 1024 * 1024;

/// Default time allowed to drain pipes once the child is gone.
pub const DEFAULT_DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Configuration for the Python sandbox.
#[derive(Debug, Clone)]
pub struct SandboxConfig {
    /// Resource ceilings applied to every child.
    pub limits: ResourceLimits,
    /// Directory for staged scripts; the OS temp dir when `None`.
    pub temp_dir: Option<PathBuf>,
    /// Extra variables added to the minimal child environment.
    pub env: Vec<(String, String)>,
    /// Maximum bytes kept per captured stream.
    pub max_output_bytes: usize,
    /// How long to keep draining pipes after the child has exited or been
    /// killed. Bounds the wait when a grandchild still holds a pipe open.
    pub drain_grace: Duration,
    /// File suffix of the staged script.
    pub source_suffix: String,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            limits: ResourceLimits::default(),
            temp_dir: None,
            env: Vec::new(),
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            drain_grace: DEFAULT_DRAIN_GRACE,
            source_suffix: ".py".to_string(),
        }
    }
}

impl SandboxConfig {
    /// Create a new builder for SandboxConfig.
    pub fn builder() -> SandboxConfigBuilder {
        SandboxConfigBuilder::default()
    }

    /// Reject values the executor cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.max_output_bytes == 0 {
            return Err(SandboxError::Config(
                "max_output_bytes must be greater than zero".to_string(),
            ));
        }
        if self.source_suffix.is_empty() {
            return Err(SandboxError::Config(
                "source_suffix must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for creating SandboxConfig instances.
#[derive(Debug, Clone, Default)]
pub struct SandboxConfigBuilder {
    limits: Option<ResourceLimits>,
    temp_dir: Option<PathBuf>,
    env: Vec<(String, String)>,
    max_output_bytes: Option<usize>,
    drain_grace: Option<Duration>,
    source_suffix: Option<String>,
}

impl SandboxConfigBuilder {
    /// Replace the whole resource-limit policy.
    pub fn limits(mut self, limits: ResourceLimits) -> Self {
        self.limits = Some(limits);
        self
    }

    /// Set the CPU-time ceiling in seconds.
    pub fn cpu_seconds(mut self, seconds: u64) -> Self {
        self.limits.get_or_insert_with(ResourceLimits::default).cpu_seconds = Some(seconds);
        self
    }

    /// Set the address-space ceiling in bytes.
    pub fn max_memory(mut self, bytes: u64) -> Self {
        self.limits
            .get_or_insert_with(ResourceLimits::default)
            .address_space_bytes = Some(bytes);
        self
    }

    /// Set the ceiling on files written by the child, in bytes.
    pub fn max_file_size(mut self, bytes: u64) -> Self {
        self.limits
            .get_or_insert_with(ResourceLimits::default)
            .file_size_bytes = Some(bytes);
        self
    }

    /// Stage scripts in this directory instead of the OS temp dir.
    pub fn temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// Add one variable to the child environment.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Set the per-stream capture cap.
    pub fn max_output_bytes(mut self, bytes: usize) -> Self {
        self.max_output_bytes = Some(bytes);
        self
    }

    /// Set the pipe drain grace period.
    pub fn drain_grace(mut self, grace: Duration) -> Self {
        self.drain_grace = Some(grace);
        self
    }

    /// Set the staged script suffix (defaults to `.py`).
    pub fn source_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.source_suffix = Some(suffix.into());
        self
    }

    /// Build the SandboxConfig.
    pub fn build(self) -> SandboxConfig {
        let default = SandboxConfig::default();
        SandboxConfig {
            limits: self.limits.unwrap_or(default.limits),
            temp_dir: self.temp_dir.or(default.temp_dir),
            env: self.env,
            max_output_bytes: self.max_output_bytes.unwrap_or(default.max_output_bytes),
            drain_grace: self.drain_grace.unwrap_or(default.drain_grace),
            source_suffix: self.source_suffix.unwrap_or(default.source_suffix),
        }
    }
}
