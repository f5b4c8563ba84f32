//! Grading session runs over real submissions.

use std::time::Duration;

use autograder_core::grading::{GradingSession, Submission};
use autograder_core::{ExecutionResult, Executor, ExecutorConfig, Outcome};

fn python_available() -> bool {
    std::process::Command::new("python3")
        .arg("--version")
        .output()
        .is_ok_and(|o| o.status.success())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_run_all_executes_pending_submissions() {
    if !python_available() {
        eprintln!("Skipping: python3 not found");
        return;
    }

    let dir = tempfile::tempdir().unwrap();
    let executor = Executor::new(
        ExecutorConfig::builder()
            .scratch_dir(dir.path())
            .timeout_secs(5)
            .build(),
    );

    let cached = ExecutionResult::completed(0, "cached\n", "", Duration::ZERO);
    let mut already_run = Submission::from_code("Cy", "cy.py", "print('should not run')");
    already_run.run_result = Some(cached.clone());

    let mut session = GradingSession::new("101", "7").with_submissions(vec![
        Submission::from_code("Ann", "ann.py", "print(sum(range(5)))"),
        Submission::from_code("Bo", "bo.py", "raise SystemExit(3)"),
        already_run,
        Submission {
            student_name: "Di".into(),
            ..Submission::default()
        },
    ]);

    let ran = session.run_all(&executor, 2).await;
    assert_eq!(ran, 2);

    let subs = session.submissions();
    let ann = subs[0].run_result.as_ref().unwrap();
    assert!(ann.success());
    assert_eq!(ann.output(), "10\n");

    let bo = subs[1].run_result.as_ref().unwrap();
    assert_eq!(bo.exit_code(), 3);
    assert_eq!(bo.outcome(), Outcome::Completed);

    assert_eq!(subs[2].run_result.as_ref(), Some(&cached));
    assert!(subs[3].run_result.is_none());

    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_sessions_are_independent() {
    if !python_available() {
        eprintln!("Skipping: python3 not found");
        return;
    }

    let executor = Executor::new(ExecutorConfig::default());
    let mut first = GradingSession::new("1", "a")
        .with_submissions(vec![Submission::from_code("Ann", "a.py", "print('a')")]);
    let mut second = GradingSession::new("2", "b")
        .with_submissions(vec![Submission::from_code("Bo", "b.py", "print('b')")]);

    let (ran_first, ran_second) = tokio::join!(
        first.run_all(&executor, 1),
        second.run_all(&executor, 1)
    );
    assert_eq!((ran_first, ran_second), (1, 1));
    assert_eq!(first.submissions()[0].run_result.as_ref().unwrap().output(), "a\n");
    assert_eq!(second.submissions()[0].run_result.as_ref().unwrap().output(), "b\n");
}
