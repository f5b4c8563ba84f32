//! Grading-side types that sit around the executor
//!
//! - `assignment` - assignment classification and checkoff grading
//! - `completion` - all-graded checks and reminder cooldowns
//! - `ingest` - loading submissions from a directory or zip download
//! - `response` - pulling the grade JSON out of free-form model text
//! - `session` - per-run context holding submissions and their results

pub mod assignment;
pub mod completion;
pub mod ingest;
pub mod response;
pub mod session;

pub use self::assignment::{AssignmentKind, CheckoffGrade, grade_checkoff};
pub use self::completion::{AssignmentStatus, ContactLog, NextMessage, next_message};
pub use self::response::{GradeEntry, extract_json_object, parse_grades};
pub use self::session::{GradingSession, Submission};
