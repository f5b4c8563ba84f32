//! Executor configuration

use crate::limits::ResourceLimits;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default wall-clock limit for one execution
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Default canned stdin fed to every program
pub const DEFAULT_INPUTS: &str = "5\ntest\nyes\n100\n";

/// Source of per-deployment execution defaults
///
/// The executor only needs these two values; anything that can produce them
/// (a YAML settings file, a test fixture) can drive it.
pub trait ConfigProvider {
    /// Timeout used when the caller does not pass one
    fn timeout_seconds(&self) -> u64;

    /// Text written to every program's stdin
    fn default_inputs(&self) -> String;
}

/// Configuration for the sandboxed executor
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Interpreter binary, resolved against the sandbox `PATH` when relative
    pub interpreter: PathBuf,

    /// Arguments placed before the script path
    pub interpreter_args: Vec<String>,

    /// Default wall-clock limit
    pub timeout: Duration,

    /// Canned stdin; the stream is closed after it
    pub default_inputs: String,

    /// Complete child environment; nothing is inherited from the parent
    pub env: Vec<(String, String)>,

    /// Directory for script artifacts and the child's working directory
    pub scratch_dir: Option<PathBuf>,

    /// Bytes kept per captured stream; the rest is drained and dropped
    pub capture_limit: usize,

    /// Kernel limits applied to the child
    pub limits: ResourceLimits,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            interpreter: PathBuf::from("python3"),
            interpreter_args: vec![],
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            default_inputs: DEFAULT_INPUTS.to_string(),
            env: vec![
                ("PATH".into(), "/usr/local/bin:/usr/bin:/bin".into()),
                ("HOME".into(), "/tmp".into()),
                ("LANG".into(), "C.UTF-8".into()),
                ("PYTHONIOENCODING".into(), "utf-8".into()),
            ],
            scratch_dir: None,
            capture_limit: 64 * 1024,
            limits: ResourceLimits::default(),
        }
    }
}

impl ExecutorConfig {
    /// Create a new config builder
    #[must_use]
    pub fn builder() -> ExecutorConfigBuilder {
        ExecutorConfigBuilder::default()
    }

    /// Defaults overridden by a provider's timeout and canned input
    #[must_use]
    pub fn from_provider(provider: &impl ConfigProvider) -> Self {
        Self::builder()
            .timeout_secs(provider.timeout_seconds())
            .default_inputs(provider.default_inputs())
            .build()
    }

    /// Directory used for artifacts, falling back to the system temp dir
    #[must_use]
    pub fn scratch_dir(&self) -> PathBuf {
        self.scratch_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

impl ConfigProvider for ExecutorConfig {
    fn timeout_seconds(&self) -> u64 {
        self.timeout.as_secs()
    }

    fn default_inputs(&self) -> String {
        self.default_inputs.clone()
    }
}

/// Builder for `ExecutorConfig`
#[derive(Debug, Default)]
pub struct ExecutorConfigBuilder {
    config: ExecutorConfig,
}

impl ExecutorConfigBuilder {
    #[must_use]
    pub fn interpreter(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.interpreter = path.into();
        self
    }

    #[must_use]
    pub fn interpreter_arg(mut self, arg: impl Into<String>) -> Self {
        self.config.interpreter_args.push(arg.into());
        self
    }

    #[must_use]
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.config.timeout = duration;
        self
    }

    /// Zero is ignored and keeps the current timeout
    #[must_use]
    pub fn timeout_secs(self, secs: u64) -> Self {
        if secs == 0 {
            return self;
        }
        self.timeout(Duration::from_secs(secs))
    }

    #[must_use]
    pub fn default_inputs(mut self, inputs: impl Into<String>) -> Self {
        self.config.default_inputs = inputs.into();
        self
    }

    /// Set or replace one variable of the child environment
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        self.config.env.retain(|(k, _)| *k != key);
        self.config.env.push((key, value.into()));
        self
    }

    #[must_use]
    pub fn scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.scratch_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn capture_limit(mut self, bytes: usize) -> Self {
        self.config.capture_limit = bytes;
        self
    }

    /// Cap the address space; zero removes the cap
    #[must_use]
    pub fn memory_limit_mb(mut self, mb: u64) -> Self {
        self.config.limits.address_space = (mb > 0).then(|| mb.saturating_mul(1024 * 1024));
        self
    }

    #[must_use]
    pub fn limits(mut self, limits: ResourceLimits) -> Self {
        self.config.limits = limits;
        self
    }

    #[must_use]
    pub fn build(self) -> ExecutorConfig {
        self.config
    }
}
