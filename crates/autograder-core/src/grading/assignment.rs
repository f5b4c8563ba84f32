//! Assignment classification and checkoff grading

use super::response::GradeEntry;
use super::session::Submission;
use crate::settings::GradingSettings;
use serde::{Deserialize, Serialize};

/// Which grading path an assignment takes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentKind {
    /// Full or no credit for submitting anything; no model call
    Checkoff,
    /// Graded against the final-project rubric
    FinalProject,
    Standard,
}

impl AssignmentKind {
    /// Classify by case-insensitive substring match on the assignment name.
    ///
    /// Checkoff patterns win over final-project patterns.
    #[must_use]
    pub fn detect(name: &str, settings: &GradingSettings) -> Self {
        let name = name.to_lowercase();
        let matches = |patterns: &[String]| {
            patterns
                .iter()
                .any(|p| !p.is_empty() && name.contains(&p.to_lowercase()))
        };

        if matches(&settings.checkoff_patterns) {
            Self::Checkoff
        } else if matches(&settings.final_project_patterns) {
            Self::FinalProject
        } else {
            Self::Standard
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Checkoff => "checkoff",
            Self::FinalProject => "final_project",
            Self::Standard => "standard",
        }
    }
}

impl std::fmt::Display for AssignmentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Grade for a checkoff assignment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoffGrade {
    pub grade: u32,
    pub comment: String,
    pub student_name: String,
    pub filename: String,
    pub strengths: Vec<String>,
    pub suggestions: Vec<String>,
}

impl From<CheckoffGrade> for GradeEntry {
    fn from(checkoff: CheckoffGrade) -> Self {
        Self {
            student_name: checkoff.student_name,
            filename: Some(checkoff.filename).filter(|f| !f.is_empty()),
            grade: f64::from(checkoff.grade),
            comment: checkoff.comment,
            strengths: checkoff.strengths,
            suggestions: checkoff.suggestions,
        }
    }
}

/// Full `points` if anything at all was submitted, otherwise zero
#[must_use]
pub fn grade_checkoff(submission: &Submission, points: u32) -> CheckoffGrade {
    let first_name = submission
        .student_name
        .split_whitespace()
        .next()
        .unwrap_or("Student");
    let filename = submission.filename.clone().unwrap_or_default();

    if submission.has_content() {
        CheckoffGrade {
            grade: points,
            comment: format!("{first_name}, great job completing this requirement!"),
            student_name: submission.student_name.clone(),
            filename,
            strengths: vec!["Completed requirement".into()],
            suggestions: vec![],
        }
    } else {
        CheckoffGrade {
            grade: 0,
            comment: format!("{first_name}, please submit this assignment to receive credit."),
            student_name: submission.student_name.clone(),
            filename,
            strengths: vec![],
            suggestions: vec!["Submit your work to receive credit".into()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkoff_patterns_take_priority() {
        let settings = GradingSettings::default();
        assert_eq!(
            AssignmentKind::detect("Update your LinkedIn Profile", &settings),
            AssignmentKind::Checkoff
        );
        // "setup" is a checkoff pattern, "project" a final-project one
        assert_eq!(
            AssignmentKind::detect("Project Setup", &settings),
            AssignmentKind::Checkoff
        );
        assert_eq!(
            AssignmentKind::detect("W4P1 Capstone", &settings),
            AssignmentKind::FinalProject
        );
        assert_eq!(
            AssignmentKind::detect("Week 2: Loops", &settings),
            AssignmentKind::Standard
        );
    }

    #[test]
    fn empty_patterns_never_match() {
        let settings = GradingSettings {
            checkoff_patterns: vec![String::new()],
            final_project_patterns: vec![],
            ..GradingSettings::default()
        };
        assert_eq!(
            AssignmentKind::detect("anything", &settings),
            AssignmentKind::Standard
        );
    }

    #[test]
    fn checkoff_full_credit_when_submitted() {
        let submission = Submission {
            student_name: "Ada Lovelace".into(),
            submitted_at: Some("2024-01-01T00:00:00Z".into()),
            ..Submission::default()
        };
        let grade = grade_checkoff(&submission, 10);
        assert_eq!(grade.grade, 10);
        assert!(grade.comment.starts_with("Ada,"));
        assert!(grade.suggestions.is_empty());
    }

    #[test]
    fn checkoff_zero_when_empty() {
        let submission = Submission {
            student_name: String::new(),
            code: Some(String::new()),
            ..Submission::default()
        };
        let grade = grade_checkoff(&submission, 10);
        assert_eq!(grade.grade, 0);
        assert!(grade.comment.starts_with("Student,"));
        assert_eq!(grade.suggestions.len(), 1);
    }

    #[test]
    fn checkoff_grade_becomes_a_grade_entry() {
        let submission = Submission::from_code("Bo Chen", "bo.py", "print(1)");
        let entry = GradeEntry::from(grade_checkoff(&submission, 5));
        assert_eq!(entry.student_name, "Bo Chen");
        assert_eq!(entry.filename.as_deref(), Some("bo.py"));
        assert!((entry.grade - 5.0).abs() < f64::EPSILON);

        let unnamed = GradeEntry::from(grade_checkoff(&Submission::default(), 5));
        assert_eq!(unnamed.filename, None);
        assert!(unnamed.grade.abs() < f64::EPSILON);
    }
}
