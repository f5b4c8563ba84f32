//! Settings loaded from `config.yaml`
//!
//! The `grading:`, `sandbox:` and `messages.reminder` sections matter here;
//! other sections of the shared deployment file are ignored. Every key is
//! optional and falls back to the defaults below.

use crate::config::{ConfigProvider, DEFAULT_INPUTS, DEFAULT_TIMEOUT_SECS, ExecutorConfig};
use crate::{AutograderError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit settings file
pub const CONFIG_PATH_ENV: &str = "AUTOGRADER_CONFIG";

/// Top level of `config.yaml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub grading: GradingSettings,
    pub sandbox: SandboxSettings,
    pub messages: MessageSettings,
}

/// The `grading:` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradingSettings {
    /// Points awarded for a completed checkoff
    pub default_points: u32,
    pub timeout_seconds: u64,
    pub default_inputs: String,
    pub checkoff_patterns: Vec<String>,
    pub final_project_patterns: Vec<String>,
}

impl Default for GradingSettings {
    fn default() -> Self {
        Self {
            default_points: 10,
            timeout_seconds: DEFAULT_TIMEOUT_SECS,
            default_inputs: DEFAULT_INPUTS.to_string(),
            checkoff_patterns: strings(&["linkedin", "opligon", "profile", "setup", "account"]),
            final_project_patterns: strings(&["w4p1", "w4p2", "final", "project", "capstone"]),
        }
    }
}

/// The `sandbox:` section: how submissions are launched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxSettings {
    pub interpreter: String,
    /// Passed before the script path, e.g. `-I` for isolated mode
    pub interpreter_args: Vec<String>,
    /// Address-space cap; 0 leaves the grader's own limit
    pub memory_limit_mb: u64,
    /// Bytes kept per output stream before sanitizing
    pub capture_limit_kb: usize,
}

impl Default for SandboxSettings {
    fn default() -> Self {
        Self {
            interpreter: "python3".to_string(),
            interpreter_args: vec![],
            memory_limit_mb: 1024,
            capture_limit_kb: 64,
        }
    }
}

/// The `messages:` section; only the reminder cooldown is read
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageSettings {
    pub reminder: ReminderSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReminderSettings {
    /// Days before the same student may be reminded again
    pub deadline_days: u32,
}

impl Default for ReminderSettings {
    fn default() -> Self {
        Self { deadline_days: 7 }
    }
}

impl ConfigProvider for GradingSettings {
    fn timeout_seconds(&self) -> u64 {
        self.timeout_seconds
    }

    fn default_inputs(&self) -> String {
        self.default_inputs.clone()
    }
}

impl Settings {
    /// Parse settings from YAML text; an empty document yields defaults
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let settings: Self = serde_yaml::from_str(yaml)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            AutograderError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        tracing::info!(path = %path.display(), "loading settings");
        Self::from_yaml_str(&content)
    }

    /// Find and load the deployment's settings.
    ///
    /// Looks at `$AUTOGRADER_CONFIG` first, then `config.yaml` and
    /// `../config.yaml`. With no file present the defaults are used.
    pub fn discover() -> Result<Self> {
        let explicit = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);
        match explicit {
            Some(path) => Self::from_file(path),
            None => match candidate_paths().into_iter().find(|p| p.is_file()) {
                Some(path) => Self::from_file(path),
                None => {
                    tracing::info!("no config.yaml found, using defaults");
                    Ok(Self::default())
                }
            },
        }
    }

    /// Executor configuration for this deployment
    #[must_use]
    pub fn executor_config(&self) -> ExecutorConfig {
        let sandbox = &self.sandbox;
        let builder = sandbox.interpreter_args.iter().fold(
            ExecutorConfig::builder().interpreter(&sandbox.interpreter),
            |builder, arg| builder.interpreter_arg(arg),
        );
        builder
            .timeout_secs(self.grading.timeout_seconds)
            .default_inputs(self.grading.default_inputs.clone())
            .memory_limit_mb(sandbox.memory_limit_mb)
            .capture_limit(sandbox.capture_limit_kb.saturating_mul(1024))
            .build()
    }

    fn validate(&self) -> Result<()> {
        if self.grading.timeout_seconds == 0 {
            return Err(AutograderError::Config(
                "grading.timeout_seconds must be positive".into(),
            ));
        }
        if self.sandbox.interpreter.trim().is_empty() {
            return Err(AutograderError::Config("sandbox.interpreter is empty".into()));
        }
        if self.sandbox.capture_limit_kb == 0 {
            return Err(AutograderError::Config(
                "sandbox.capture_limit_kb must be positive".into(),
            ));
        }
        Ok(())
    }
}

fn candidate_paths() -> Vec<PathBuf> {
    vec![PathBuf::from("config.yaml"), PathBuf::from("../config.yaml")]
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}
