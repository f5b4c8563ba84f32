//! Course completion state behind celebration and reminder messages
//!
//! Message wording and delivery live elsewhere. This module answers two
//! questions per student: has every submitted assignment been graded, and
//! was the student already contacted recently.

use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// One assignment as seen from one student's gradebook
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssignmentStatus {
    pub assignment_id: String,
    pub assignment_name: String,
    pub points_possible: Option<f64>,
    pub score: Option<f64>,
    pub submitted: bool,
    pub graded: bool,
}

impl AssignmentStatus {
    /// Graded with a recorded score
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.graded && self.score.is_some()
    }
}

/// True when the student submitted something and all of it is graded
#[must_use]
pub fn all_submitted_graded(statuses: &[AssignmentStatus]) -> bool {
    let mut submitted = statuses.iter().filter(|s| s.submitted).peekable();
    submitted.peek().is_some() && submitted.all(|s| s.graded)
}

/// Names of assignments without a graded score
#[must_use]
pub fn missing_assignments(statuses: &[AssignmentStatus]) -> Vec<&str> {
    statuses
        .iter()
        .filter(|s| !s.is_complete())
        .map(|s| s.assignment_name.as_str())
        .collect()
}

/// Score as a percentage of points possible, over scored assignments
#[must_use]
pub fn average_percent(statuses: &[AssignmentStatus]) -> Option<f64> {
    let (score, possible) = statuses
        .iter()
        .filter(|s| s.is_complete())
        .filter_map(|s| Some((s.score?, s.points_possible.filter(|p| *p > 0.0)?)))
        .fold((0.0, 0.0), |(score, possible), (s, p)| (score + s, possible + p));
    (possible > 0.0).then(|| score / possible * 100.0)
}

/// What to send a student next
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NextMessage {
    Celebrate,
    Remind,
    Nothing,
}

/// When each student was last celebrated or reminded, keyed by course and user
///
/// Persisted as a JSON object of RFC 3339 timestamps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContactLog {
    entries: BTreeMap<String, DateTime<Utc>>,
}

impl ContactLog {
    /// Load a log file; a missing file is an empty log
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        match serde_json::from_str(&content) {
            Ok(log) => Ok(log),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "unreadable contact log, starting fresh"
                );
                Ok(Self::default())
            }
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn record(&mut self, course_id: &str, user_id: &str, at: DateTime<Utc>) {
        self.entries.insert(key(course_id, user_id), at);
    }

    #[must_use]
    pub fn last_contact(&self, course_id: &str, user_id: &str) -> Option<DateTime<Utc>> {
        self.entries.get(&key(course_id, user_id)).copied()
    }

    /// Contacted fewer than `days` whole days before `now`
    #[must_use]
    pub fn contacted_within(
        &self,
        course_id: &str,
        user_id: &str,
        days: u32,
        now: DateTime<Utc>,
    ) -> bool {
        self.last_contact(course_id, user_id)
            .is_some_and(|at| (now - at).num_days() < i64::from(days))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Pick the next message for a student.
///
/// A student is celebrated once, when everything submitted is graded. Other
/// students with missing work are reminded unless `reminded_recently`.
#[must_use]
pub fn next_message(
    statuses: &[AssignmentStatus],
    already_celebrated: bool,
    reminded_recently: bool,
) -> NextMessage {
    if all_submitted_graded(statuses) {
        if already_celebrated {
            NextMessage::Nothing
        } else {
            NextMessage::Celebrate
        }
    } else if missing_assignments(statuses).is_empty() || reminded_recently {
        NextMessage::Nothing
    } else {
        NextMessage::Remind
    }
}

fn key(course_id: &str, user_id: &str) -> String {
    format!("{course_id}_{user_id}")
}
