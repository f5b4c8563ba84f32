//! # autograder-core
//!
//! Sandboxed execution of student submissions for LLM-assisted grading.
//!
//! This crate provides:
//! - A process-isolated executor with a scrubbed environment, canned stdin,
//!   rlimits and a wall-clock kill
//! - Sanitized, truncated results ready to embed in grading prompts
//! - YAML grading settings and the `ConfigProvider` seam
//! - Grading glue: assignment classification, submission loading, response
//!   parsing, completion tracking and a per-run session context

#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod artifact;
pub mod capture;
pub mod config;
pub mod error;
pub mod executor;
pub mod grading;
pub mod limits;
pub mod result;
pub mod sanitize;
pub mod settings;

pub use config::{ConfigProvider, ExecutorConfig};
pub use error::AutograderError;
pub use executor::Executor;
pub use result::{ExecutionResult, Outcome};
pub use settings::{GradingSettings, SandboxSettings, Settings};

/// Crate-level result type
pub type Result<T> = std::result::Result<T, AutograderError>;
