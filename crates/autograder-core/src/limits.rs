//! Kernel resource limits for submission processes
//!
//! Applied in the child between `fork` and `exec`, so they bound the student
//! program and anything it spawns without touching the grader.
//!
//! | Limit | Purpose | Default |
//! |-------|---------|---------|
//! | `RLIMIT_AS` | Address space | 1 GiB |
//! | `RLIMIT_CPU` | CPU seconds | timeout + 1 |
//! | `RLIMIT_FSIZE` | Size of files the program writes | 16 MiB |
//! | `RLIMIT_CORE` | Core dumps | 0 |

use nix::sys::resource::{Resource, getrlimit, setrlimit};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Resource limits for one execution; `None` leaves the inherited limit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceLimits {
    /// Virtual address space in bytes
    pub address_space: Option<u64>,
    /// Largest file the program may write, in bytes
    pub file_size: Option<u64>,
    /// Derive `RLIMIT_CPU` from the wall-clock timeout
    pub cpu_from_timeout: bool,
    /// Disable core dumps
    pub disable_core_dumps: bool,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            address_space: Some(1024 * 1024 * 1024),
            file_size: Some(16 * 1024 * 1024),
            cpu_from_timeout: true,
            disable_core_dumps: true,
        }
    }
}

impl ResourceLimits {
    /// No limits beyond what the grader itself runs under
    #[must_use]
    pub const fn unlimited() -> Self {
        Self {
            address_space: None,
            file_size: None,
            cpu_from_timeout: false,
            disable_core_dumps: false,
        }
    }

    /// Resolve into concrete `(resource, value)` pairs for a given timeout
    #[must_use]
    pub fn plan(&self, timeout: Duration) -> Vec<(Resource, u64)> {
        let mut plan = Vec::with_capacity(4);
        if let Some(bytes) = self.address_space {
            plan.push((Resource::RLIMIT_AS, bytes));
        }
        if let Some(bytes) = self.file_size {
            plan.push((Resource::RLIMIT_FSIZE, bytes));
        }
        if self.cpu_from_timeout {
            let secs = timeout.as_secs().max(1).saturating_add(1);
            plan.push((Resource::RLIMIT_CPU, secs));
        }
        if self.disable_core_dumps {
            plan.push((Resource::RLIMIT_CORE, 0));
        }
        plan
    }
}

/// Apply a resolved plan to the current process.
///
/// Only async-signal-safe work happens here: it runs in the forked child.
/// A limit above the inherited hard limit is clamped to it, since raising a
/// hard limit needs privileges.
pub fn apply(plan: &[(Resource, u64)]) -> std::io::Result<()> {
    for &(resource, value) in plan {
        let (_, hard) = getrlimit(resource)?;
        let value = value.min(hard);
        setrlimit(resource, value, value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_plan_covers_all_limits() {
        let plan = ResourceLimits::default().plan(Duration::from_secs(10));
        assert_eq!(plan.len(), 4);
        assert!(plan.contains(&(Resource::RLIMIT_CPU, 11)));
        assert!(plan.contains(&(Resource::RLIMIT_CORE, 0)));
    }

    #[test]
    fn cpu_limit_never_zero() {
        let plan = ResourceLimits::default().plan(Duration::from_millis(200));
        assert!(plan.contains(&(Resource::RLIMIT_CPU, 2)));
    }

    #[test]
    fn unlimited_plan_is_empty() {
        assert!(ResourceLimits::unlimited().plan(Duration::from_secs(5)).is_empty());
    }
}
