//! autograder CLI - run student submissions through the sandbox

use anyhow::{Context, Result, bail};
use autograder_core::grading::completion::{self, AssignmentStatus, ContactLog, NextMessage};
use autograder_core::grading::{AssignmentKind, GradingSession, Submission, grade_checkoff, ingest};
use autograder_core::{Executor, ExecutorConfig, Settings};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "autograder")]
#[command(author, version, about = "Sandboxed runner for student programming submissions")]
struct Cli {
    /// Settings file (defaults to $AUTOGRADER_CONFIG, ./config.yaml or ../config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute one program and print the result as JSON
    Run {
        /// Code to execute (or - for stdin)
        code: Option<String>,

        /// Read the program from a file instead
        #[arg(short, long, conflicts_with = "code")]
        file: Option<PathBuf>,

        /// Timeout in seconds (defaults to grading.timeout_seconds)
        #[arg(short, long)]
        timeout: Option<u64>,
    },

    /// Execute every .py file in a directory or zip download
    Batch {
        /// Directory or .zip of submissions
        path: PathBuf,

        /// Programs run at the same time
        #[arg(short, long, default_value = "4")]
        jobs: usize,

        /// Timeout in seconds for each program
        #[arg(short, long)]
        timeout: Option<u64>,

        /// Assignment name; checkoff assignments are graded without running code
        #[arg(short, long)]
        assignment: Option<String>,
    },

    /// Show which grading path an assignment name takes
    Classify {
        /// Assignment name
        name: String,
    },

    /// Decide whether a student is due a celebration or a reminder
    Status {
        /// JSON array of the student's assignment statuses
        grades: PathBuf,

        #[arg(long)]
        course: String,

        #[arg(long)]
        student: String,

        /// Log of celebrated students
        #[arg(long, default_value = "data/celebrated.json")]
        celebrated: PathBuf,

        /// Log of reminded students
        #[arg(long, default_value = "data/reminded.json")]
        reminded: PathBuf,

        /// Record the chosen message in its log
        #[arg(long)]
        record: bool,
    },
}

#[derive(Serialize)]
struct BatchEntry {
    student_name: String,
    filename: Option<String>,
    result: Option<autograder_core::ExecutionResult>,
    grade: Option<autograder_core::grading::GradeEntry>,
}

impl From<Submission> for BatchEntry {
    fn from(submission: Submission) -> Self {
        Self {
            student_name: submission.student_name,
            filename: submission.filename,
            result: submission.run_result,
            grade: submission.grade,
        }
    }
}

#[derive(Serialize)]
struct StatusReport<'a> {
    next: NextMessage,
    all_graded: bool,
    missing: Vec<&'a str>,
    average_percent: Option<f64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("autograder=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let settings = match &cli.config {
        Some(path) => Settings::from_file(path)?,
        None => Settings::discover()?,
    };

    match cli.command {
        Commands::Run {
            code,
            file,
            timeout,
        } => {
            let source = read_source(code.as_deref(), file.as_deref())?;
            let executor = executor_for(&settings, timeout);
            let result = executor.execute(&source, None).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }

        Commands::Batch {
            path,
            jobs,
            timeout,
            assignment,
        } => {
            let submissions = ingest::load(&path)
                .with_context(|| format!("failed to load submissions from {}", path.display()))?;
            let mut session = GradingSession::default();
            for submission in submissions {
                session.push(submission);
            }

            let kind = assignment
                .as_deref()
                .map(|name| AssignmentKind::detect(name, &settings.grading));
            if kind == Some(AssignmentKind::Checkoff) {
                let points = settings.grading.default_points;
                for submission in session.submissions_mut() {
                    submission.grade = Some(grade_checkoff(submission, points).into());
                }
                tracing::info!(points, "checkoff graded without running code");
            } else {
                let executor = executor_for(&settings, timeout);
                let ran = session.run_all(&executor, jobs).await;
                tracing::info!(ran, "batch complete");
            }

            let entries: Vec<BatchEntry> = session
                .into_submissions()
                .into_iter()
                .map(BatchEntry::from)
                .collect();
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }

        Commands::Classify { name } => {
            println!("{}", AssignmentKind::detect(&name, &settings.grading));
        }

        Commands::Status {
            grades,
            course,
            student,
            celebrated,
            reminded,
            record,
        } => {
            let text = std::fs::read_to_string(&grades)
                .with_context(|| format!("failed to read {}", grades.display()))?;
            let statuses: Vec<AssignmentStatus> = serde_json::from_str(&text)
                .with_context(|| format!("invalid statuses in {}", grades.display()))?;

            let mut celebrated_log = ContactLog::load(&celebrated)?;
            let mut reminded_log = ContactLog::load(&reminded)?;
            let now = chrono::Utc::now();
            let cooldown = settings.messages.reminder.deadline_days;

            let next = completion::next_message(
                &statuses,
                celebrated_log.last_contact(&course, &student).is_some(),
                reminded_log.contacted_within(&course, &student, cooldown, now),
            );

            if record {
                let target = match next {
                    NextMessage::Celebrate => Some((&mut celebrated_log, &celebrated)),
                    NextMessage::Remind => Some((&mut reminded_log, &reminded)),
                    NextMessage::Nothing => None,
                };
                if let Some((log, path)) = target {
                    log.record(&course, &student, now);
                    ensure_parent(path)?;
                    log.save(path)?;
                }
            }

            let report = StatusReport {
                next,
                all_graded: completion::all_submitted_graded(&statuses),
                missing: completion::missing_assignments(&statuses),
                average_percent: completion::average_percent(&statuses),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

/// Executor from the settings, with an optional timeout override
fn executor_for(settings: &Settings, timeout: Option<u64>) -> Executor {
    let config = settings.executor_config();
    match timeout {
        Some(secs) => Executor::new(ExecutorConfig {
            timeout: Duration::from_secs(secs.max(1)),
            ..config
        }),
        None => Executor::new(config),
    }
}

fn read_source(code: Option<&str>, file: Option<&Path>) -> Result<String> {
    match (code, file) {
        (_, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        (Some("-"), None) => {
            let mut source = String::new();
            std::io::stdin().read_to_string(&mut source)?;
            Ok(source)
        }
        (Some(code), None) => Ok(code.to_string()),
        (None, None) => bail!("pass code, - for stdin, or --file"),
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    Ok(())
}
