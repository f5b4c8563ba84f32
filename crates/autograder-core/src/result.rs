//! Execution result types

use crate::sanitize;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Exit code reported when no real exit status exists (timeout, launch failure)
pub const SENTINEL_EXIT_CODE: i32 = -1;

/// How an execution ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The process ran and exited on its own, with any status
    Completed,
    /// The watchdog killed the process at the wall-clock limit
    TimedOut,
    /// The program could not be started
    LaunchFailed,
}

/// Result of a sandboxed code execution
///
/// Built only through the constructors below, so `success` always matches
/// `exit_code == 0` and both streams are sanitized. Deserializing checks
/// the same invariants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StoredResult")]
pub struct ExecutionResult {
    success: bool,
    output: String,
    errors: Option<String>,
    exit_code: i32,
    outcome: Outcome,
    #[serde(with = "duration_millis")]
    duration: Duration,
}

impl ExecutionResult {
    /// A process that exited on its own
    #[must_use]
    pub fn completed(exit_code: i32, stdout: &str, stderr: &str, duration: Duration) -> Self {
        Self {
            success: exit_code == 0,
            output: sanitize::clean_output(stdout),
            errors: sanitize::clean_errors(stderr),
            exit_code,
            outcome: Outcome::Completed,
            duration,
        }
    }

    /// A process killed by the watchdog after `timeout_secs`
    #[must_use]
    pub fn timed_out(timeout_secs: u64, duration: Duration) -> Self {
        Self {
            success: false,
            output: String::new(),
            errors: Some(format!(
                "Code timed out (took longer than {timeout_secs} seconds)"
            )),
            exit_code: SENTINEL_EXIT_CODE,
            outcome: Outcome::TimedOut,
            duration,
        }
    }

    /// A program that never started
    #[must_use]
    pub fn launch_failed(error: &impl std::fmt::Display, duration: Duration) -> Self {
        Self {
            success: false,
            output: String::new(),
            errors: sanitize::clean_errors(&format!("Error running code: {error}")),
            exit_code: SENTINEL_EXIT_CODE,
            outcome: Outcome::LaunchFailed,
            duration,
        }
    }

    /// True iff the process exited with code 0
    #[must_use]
    pub const fn success(&self) -> bool {
        self.success
    }

    /// Sanitized, truncated stdout, or `(no output)`
    #[must_use]
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Sanitized, truncated stderr, absent when the stream was empty
    #[must_use]
    pub fn errors(&self) -> Option<&str> {
        self.errors.as_deref()
    }

    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        self.exit_code
    }

    #[must_use]
    pub const fn outcome(&self) -> Outcome {
        self.outcome
    }

    /// Wall-clock time spent on the execution
    #[must_use]
    pub const fn duration(&self) -> Duration {
        self.duration
    }

    #[must_use]
    pub fn is_timeout(&self) -> bool {
        self.outcome == Outcome::TimedOut
    }
}

/// Wire form of [`ExecutionResult`], validated before use
#[derive(Deserialize)]
struct StoredResult {
    success: bool,
    output: String,
    errors: Option<String>,
    exit_code: i32,
    outcome: Outcome,
    #[serde(with = "duration_millis")]
    duration: Duration,
}

impl TryFrom<StoredResult> for ExecutionResult {
    type Error = String;

    fn try_from(stored: StoredResult) -> Result<Self, Self::Error> {
        if stored.success != (stored.exit_code == 0) {
            return Err(format!(
                "success is {} but exit_code is {}",
                stored.success, stored.exit_code
            ));
        }
        if stored.outcome != Outcome::Completed && stored.exit_code != SENTINEL_EXIT_CODE {
            return Err(format!(
                "{:?} result must have exit_code {SENTINEL_EXIT_CODE}",
                stored.outcome
            ));
        }
        if stored.output.chars().count() > sanitize::MAX_OUTPUT_CHARS
            || stored
                .errors
                .as_ref()
                .is_some_and(|e| e.chars().count() > sanitize::MAX_ERROR_CHARS)
        {
            return Err("stored output exceeds the truncation limits".into());
        }
        Ok(Self {
            success: stored.success,
            output: stored.output,
            errors: stored.errors,
            exit_code: stored.exit_code,
            outcome: stored.outcome,
            duration: stored.duration,
        })
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    #[allow(clippy::cast_possible_truncation)]
    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_tracks_exit_code() {
        let ok = ExecutionResult::completed(0, "hi\n", "", Duration::ZERO);
        assert!(ok.success());
        assert_eq!(ok.errors(), None);

        let failed = ExecutionResult::completed(1, "", "Traceback", Duration::ZERO);
        assert!(!failed.success());
        assert_eq!(failed.output(), sanitize::NO_OUTPUT);
        assert_eq!(failed.errors(), Some("Traceback"));
    }

    #[test]
    fn timeout_names_the_limit() {
        let r = ExecutionResult::timed_out(7, Duration::from_secs(7));
        assert!(!r.success());
        assert!(r.is_timeout());
        assert_eq!(r.exit_code(), SENTINEL_EXIT_CODE);
        assert_eq!(r.output(), "");
        assert!(r.errors().is_some_and(|e| e.contains("timed out") && e.contains('7')));
    }

    #[test]
    fn launch_failure_carries_error_text() {
        let err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let r = ExecutionResult::launch_failed(&err, Duration::ZERO);
        assert_eq!(r.outcome(), Outcome::LaunchFailed);
        assert_eq!(r.exit_code(), -1);
        assert!(r.errors().is_some_and(|e| e.contains("no such file")));
    }

    #[test]
    fn serializes_with_public_field_names() {
        let r = ExecutionResult::completed(0, "x", "", Duration::from_millis(12));
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["output"], "x");
        assert!(json["errors"].is_null());
        assert_eq!(json["exit_code"], 0);
        assert_eq!(json["outcome"], "completed");
        assert_eq!(json["duration"], 12);
    }

    #[test]
    fn stored_results_load_back() {
        let r = ExecutionResult::completed(2, "partial\n", "boom", Duration::from_millis(40));
        let json = serde_json::to_string(&r).unwrap();
        let back: ExecutionResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);
    }

    #[test]
    fn inconsistent_success_is_rejected() {
        let json = serde_json::json!({
            "success": true,
            "output": "x",
            "errors": null,
            "exit_code": 1,
            "outcome": "completed",
            "duration": 5,
        });
        let err = serde_json::from_value::<ExecutionResult>(json).unwrap_err();
        assert!(err.to_string().contains("exit_code"), "{err}");
    }

    #[test]
    fn timeout_with_real_exit_code_is_rejected() {
        let json = serde_json::json!({
            "success": false,
            "output": "",
            "errors": "late",
            "exit_code": 3,
            "outcome": "timed_out",
            "duration": 5,
        });
        assert!(serde_json::from_value::<ExecutionResult>(json).is_err());
    }
}
