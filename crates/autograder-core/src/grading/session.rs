//! Per-run grading context
//!
//! A `GradingSession` is created for one course assignment, owns that run's
//! submissions, and is passed explicitly to whatever drives the run. Nothing
//! about a run lives in process-wide state, so several runs can proceed side
//! by side.

use super::response::GradeEntry;
use crate::{ExecutionResult, Executor};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// One student's upload and what has been learned about it so far
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Submission {
    pub student_id: Option<String>,
    pub student_name: String,
    pub filename: Option<String>,
    pub code: Option<String>,
    pub submitted_at: Option<String>,
    pub attachments: Vec<String>,
    pub body: Option<String>,
    pub url: Option<String>,
    pub run_result: Option<ExecutionResult>,
    pub grade: Option<GradeEntry>,
}

impl Submission {
    /// A submission consisting of a single source file
    #[must_use]
    pub fn from_code(
        student_name: impl Into<String>,
        filename: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        Self {
            student_name: student_name.into(),
            filename: Some(filename.into()),
            code: Some(code.into()),
            ..Self::default()
        }
    }

    /// Whether the student turned in anything at all
    #[must_use]
    pub fn has_content(&self) -> bool {
        let present = |field: &Option<String>| field.as_deref().is_some_and(|s| !s.is_empty());
        self.submitted_at.is_some()
            || !self.attachments.is_empty()
            || present(&self.body)
            || present(&self.url)
            || present(&self.code)
            || present(&self.filename)
    }

    /// Source that still needs running, if any
    fn pending_code(&self) -> Option<&str> {
        match (&self.code, &self.run_result) {
            (Some(code), None) if !code.trim().is_empty() => Some(code),
            _ => None,
        }
    }
}

/// Submissions and results for one grading run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GradingSession {
    pub course_id: Option<String>,
    pub assignment_id: Option<String>,
    submissions: Vec<Submission>,
}

impl GradingSession {
    #[must_use]
    pub fn new(course_id: impl Into<String>, assignment_id: impl Into<String>) -> Self {
        Self {
            course_id: Some(course_id.into()),
            assignment_id: Some(assignment_id.into()),
            submissions: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_submissions(mut self, submissions: Vec<Submission>) -> Self {
        self.submissions = submissions;
        self
    }

    pub fn push(&mut self, submission: Submission) {
        self.submissions.push(submission);
    }

    #[must_use]
    pub fn submissions(&self) -> &[Submission] {
        &self.submissions
    }

    pub fn submissions_mut(&mut self) -> &mut [Submission] {
        &mut self.submissions
    }

    #[must_use]
    pub fn into_submissions(self) -> Vec<Submission> {
        self.submissions
    }

    /// Execute every submission that has code and no result yet.
    ///
    /// At most `concurrency` programs run at once. Returns how many were run.
    pub async fn run_all(&mut self, executor: &Executor, concurrency: usize) -> usize {
        let permits = Arc::new(Semaphore::new(concurrency.max(1)));
        let mut tasks = JoinSet::new();

        for (index, submission) in self.submissions.iter().enumerate() {
            let Some(code) = submission.pending_code() else {
                continue;
            };
            let code = code.to_string();
            let executor = executor.clone();
            let permits = Arc::clone(&permits);
            tasks.spawn(async move {
                // the semaphore is never closed
                let _permit = permits.acquire_owned().await.ok();
                (index, executor.execute(&code, None).await)
            });
        }

        tracing::info!(
            course = ?self.course_id,
            assignment = ?self.assignment_id,
            pending = tasks.len(),
            "running submissions"
        );

        let mut ran = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => {
                    self.submissions[index].run_result = Some(result);
                    ran += 1;
                }
                Err(e) => tracing::error!(error = %e, "execution task failed"),
            }
        }
        ran
    }

    /// Attach model grades to submissions, matching by student name, then
    /// filename. Returns grades that matched no submission.
    pub fn attach_grades(&mut self, grades: Vec<GradeEntry>) -> Vec<GradeEntry> {
        let mut unmatched = Vec::new();
        for grade in grades {
            let by_name = self
                .submissions
                .iter()
                .position(|s| s.student_name.eq_ignore_ascii_case(grade.student_name.trim()));
            let by_file = || {
                let filename = grade.filename.as_deref()?;
                self.submissions
                    .iter()
                    .position(|s| s.filename.as_deref() == Some(filename))
            };
            match by_name.or_else(by_file) {
                Some(index) => self.submissions[index].grade = Some(grade),
                None => {
                    tracing::warn!(student = %grade.student_name, "grade matches no submission");
                    unmatched.push(grade);
                }
            }
        }
        unmatched
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grade(name: &str, filename: Option<&str>) -> GradeEntry {
        GradeEntry {
            student_name: name.into(),
            filename: filename.map(Into::into),
            grade: 9.0,
            comment: String::new(),
            strengths: vec![],
            suggestions: vec![],
        }
    }

    #[test]
    fn content_detection_ignores_empty_fields() {
        let mut submission = Submission {
            body: Some(String::new()),
            ..Submission::default()
        };
        assert!(!submission.has_content());
        submission.attachments.push("essay.pdf".into());
        assert!(submission.has_content());
    }

    #[test]
    fn pending_code_skips_blank_and_cached() {
        let blank = Submission::from_code("A", "a.py", "   \n");
        assert_eq!(blank.pending_code(), None);

        let mut cached = Submission::from_code("B", "b.py", "print(1)");
        assert_eq!(cached.pending_code(), Some("print(1)"));
        cached.run_result = Some(ExecutionResult::completed(
            0,
            "1\n",
            "",
            std::time::Duration::ZERO,
        ));
        assert_eq!(cached.pending_code(), None);
    }

    #[test]
    fn grades_match_by_name_then_filename() {
        let mut session = GradingSession::new("101", "7").with_submissions(vec![
            Submission::from_code("Ann Lee", "ann.py", "x = 1"),
            Submission::from_code("Bo Chen", "bo.py", "x = 2"),
        ]);

        let unmatched = session.attach_grades(vec![
            grade("ann lee", None),
            grade("Robert Chen", Some("bo.py")),
            grade("Nobody", Some("missing.py")),
        ]);

        assert!(session.submissions()[0].grade.is_some());
        assert_eq!(
            session.submissions()[1].grade.as_ref().map(|g| g.student_name.as_str()),
            Some("Robert Chen")
        );
        assert_eq!(unmatched.len(), 1);
        assert_eq!(unmatched[0].student_name, "Nobody");
    }

    #[test]
    fn submissions_can_be_added_edited_and_taken_back() {
        let mut session = GradingSession::default();
        session.push(Submission::from_code("Ann", "ann.py", "x = 1"));
        session.push(Submission::from_code("Bo", "bo.py", ""));

        for submission in session.submissions_mut() {
            submission.student_id = Some(submission.student_name.to_lowercase());
        }

        let submissions = session.into_submissions();
        assert_eq!(submissions.len(), 2);
        assert_eq!(submissions[1].student_id.as_deref(), Some("bo"));
    }
}
