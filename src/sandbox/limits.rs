//! Resource limits applied to the child process.
//!
//! Limits are installed with `setrlimit` from a pre-exec hook, i.e. in the
//! forked child before the interpreter is loaded, so they never touch the
//! parent. Platforms without rlimits fall back to the wall-clock timeout only.

use std::sync::Once;

use tracing::warn;

/// Default CPU-time ceiling in seconds.
pub const DEFAULT_CPU_SECONDS: u64 = 5;
/// Default virtual address-space ceiling in bytes (200 MiB).
pub const DEFAULT_ADDRESS_SPACE_BYTES: u64 = 200 * 1024 * 1024;
/// Default ceiling on the size of any file the child writes (1 MiB).
pub const DEFAULT_FILE_SIZE_BYTES: u64 = 1024 * 1024;

/// Per-child resource ceilings. `None` leaves that resource unrestricted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceLimits {
    /// `RLIMIT_CPU`: the kernel sends SIGXCPU once exceeded.
    pub cpu_seconds: Option<u64>,
    /// `RLIMIT_AS`: allocations beyond this fail inside the child.
    pub address_space_bytes: Option<u64>,
    /// `RLIMIT_FSIZE`: writes growing a file past this fail.
    pub file_size_bytes: Option<u64>,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            cpu_seconds: Some(DEFAULT_CPU_SECONDS),
            address_space_bytes: Some(DEFAULT_ADDRESS_SPACE_BYTES),
            file_size_bytes: Some(DEFAULT_FILE_SIZE_BYTES),
        }
    }
}

impl ResourceLimits {
    /// Whether this platform can enforce resource limits at all.
    pub const SUPPORTED: bool = cfg!(unix);

    /// Limits with every resource unrestricted.
    pub fn unlimited() -> Self {
        Self {
            cpu_seconds: None,
            address_space_bytes: None,
            file_size_bytes: None,
        }
    }

    /// True when no resource is restricted.
    pub fn is_unlimited(&self) -> bool {
        self.cpu_seconds.is_none()
            && self.address_space_bytes.is_none()
            && self.file_size_bytes.is_none()
    }

    /// Apply the limits to the calling process.
    ///
    /// Only meant to run in the child between fork and exec. It performs no
    /// allocation, and a limit the kernel refuses is skipped rather than
    /// aborting the launch, so the result is always `Ok`. It returns
    /// `io::Result` to fit the `pre_exec` hook signature.
    #[cfg(unix)]
    pub(crate) fn apply_to_current_process(&self) -> std::io::Result<()> {
        // The CPU hard limit sits one second above the soft one: with equal
        // values Linux sends SIGKILL instead of SIGXCPU.
        let limits = [
            (libc::RLIMIT_CPU, self.cpu_seconds, 1),
            (libc::RLIMIT_AS, self.address_space_bytes, 0),
            (libc::RLIMIT_FSIZE, self.file_size_bytes, 0),
        ];

        for (resource, value, headroom) in limits {
            let Some(value) = value else { continue };
            let limit = libc::rlimit {
                rlim_cur: value as libc::rlim_t,
                rlim_max: value.saturating_add(headroom) as libc::rlim_t,
            };
            // SAFETY: setrlimit is async-signal-safe and `limit` outlives the call.
            let rc = unsafe { libc::setrlimit(resource, &limit) };
            if rc != 0 && headroom > 0 {
                // The inherited hard limit leaves no headroom; cap both.
                let strict = libc::rlimit {
                    rlim_cur: value as libc::rlim_t,
                    rlim_max: value as libc::rlim_t,
                };
                // SAFETY: as above; `strict` outlives the call.
                unsafe { libc::setrlimit(resource, &strict) };
            }
        }

        Ok(())
    }
}

static CAPABILITY_CHECK: Once = Once::new();

/// Log, once per process, when limits are requested but cannot be enforced.
pub(crate) fn warn_if_unsupported(limits: &ResourceLimits) {
    if ResourceLimits::SUPPORTED || limits.is_unlimited() {
        return;
    }
    CAPABILITY_CHECK.call_once(|| {
        warn!(
            os = std::env::consts::OS,
            "resource limits are unavailable on this platform; \
             only the wall-clock timeout protects the host"
        );
    });
}
