//! Sandboxed execution of a single submission
//!
//! Each call writes the source to its own temp file, runs the interpreter on
//! it in a fresh process group with a scrubbed environment and canned stdin,
//! and enforces a wall-clock limit by killing the whole group. Every failure
//! is folded into the returned [`ExecutionResult`].

use crate::artifact::ScriptArtifact;
use crate::capture::{self, Captured};
use crate::config::{ConfigProvider, ExecutorConfig};
use crate::result::SENTINEL_EXIT_CODE;
use crate::{AutograderError, ExecutionResult, Result, limits};
use nix::errno::Errno;
use nix::sys::signal::{Signal, killpg};
use nix::unistd::Pid;
use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::io::AsyncRead;
use tokio::process::{Child, Command};
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// How long stream readers may lag behind the reaped child
const READER_GRACE: Duration = Duration::from_millis(500);

/// Runs untrusted programs one call at a time; cheap to clone and share
#[derive(Debug, Clone)]
pub struct Executor {
    config: Arc<ExecutorConfig>,
}

/// Shell convention for a signal death: `128 + signal`
const SIGNAL_EXIT_BASE: i32 = 128;

/// A child that exited on its own
struct Exited {
    status: ExitStatus,
    stdout: Captured,
    stderr: Captured,
}

impl Executor {
    #[must_use]
    pub fn new(config: ExecutorConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Executor with the provider's timeout and canned input
    #[must_use]
    pub fn from_provider(provider: &impl ConfigProvider) -> Self {
        Self::new(ExecutorConfig::from_provider(provider))
    }

    #[must_use]
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Run `source` and report how it went.
    ///
    /// `timeout_seconds` overrides the configured limit; `None` or zero uses
    /// the default. This never fails: launch errors and timeouts come back as
    /// results with `exit_code == -1`.
    pub async fn execute(&self, source: &str, timeout_seconds: Option<u64>) -> ExecutionResult {
        let timeout_secs = self.resolve_timeout(timeout_seconds);
        let started = Instant::now();

        let artifact = match ScriptArtifact::create(&self.config.scratch_dir(), source) {
            Ok(artifact) => artifact,
            Err(e) => {
                tracing::error!(error = %e, "could not write script artifact");
                return ExecutionResult::launch_failed(&e, started.elapsed());
            }
        };

        let outcome = self.run(artifact.path(), timeout_secs).await;
        artifact.remove();

        let duration = started.elapsed();
        let duration_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);

        match outcome {
            Ok(exited) => {
                let exit_code = exit_code(exited.status);
                tracing::info!(exit_code, duration_ms, "submission finished");
                ExecutionResult::completed(
                    exit_code,
                    &exited.stdout.text(),
                    &exited.stderr.text(),
                    duration,
                )
            }
            Err(AutograderError::Timeout(secs)) => {
                tracing::warn!(timeout_secs = secs, duration_ms, "submission timed out");
                ExecutionResult::timed_out(secs, duration)
            }
            Err(e) => {
                tracing::error!(error = %e, "submission could not be run");
                ExecutionResult::launch_failed(&e, duration)
            }
        }
    }

    fn resolve_timeout(&self, requested: Option<u64>) -> u64 {
        match requested {
            Some(0) => {
                tracing::warn!("ignoring zero timeout, using configured default");
                self.config.timeout_seconds().max(1)
            }
            Some(secs) => secs,
            None => self.config.timeout_seconds().max(1),
        }
    }

    async fn run(&self, script: &Path, timeout_secs: u64) -> Result<Exited> {
        let timeout = Duration::from_secs(timeout_secs);
        let mut child = self
            .command(script, timeout)
            .spawn()
            .map_err(AutograderError::Spawn)?;
        let pid = child.id();
        tracing::debug!(?pid, timeout_secs, "interpreter spawned");

        let feeder = self.feed_stdin(&mut child);
        let limit = self.config.capture_limit;
        let stdout = child.stdout.take().map(|s| StreamReader::spawn(s, limit));
        let stderr = child.stderr.take().map(|s| StreamReader::spawn(s, limit));

        let waited = tokio::time::timeout(timeout, child.wait()).await;

        // On timeout this is the runaway itself; after a normal exit it
        // kills background processes the program left in its group.
        kill_group(pid);

        let status = match waited {
            Ok(status) => status?,
            Err(_) => {
                if let Err(e) = child.kill().await {
                    tracing::debug!(error = %e, "child already gone after group kill");
                }
                for reader in [stdout.as_ref(), stderr.as_ref()].into_iter().flatten() {
                    reader.task.abort();
                }
                if let Some(feeder) = feeder {
                    feeder.abort();
                }
                return Err(AutograderError::Timeout(timeout_secs));
            }
        };

        if let Some(feeder) = feeder {
            feeder.abort();
        }

        let (stdout, stderr) =
            tokio::join!(StreamReader::finish(stdout), StreamReader::finish(stderr));
        Ok(Exited {
            status,
            stdout,
            stderr,
        })
    }

    fn command(&self, script: &Path, timeout: Duration) -> Command {
        let mut command = std::process::Command::new(&self.config.interpreter);
        command
            .args(&self.config.interpreter_args)
            .arg(script)
            .env_clear()
            .envs(self.config.env.iter().map(|(k, v)| (k, v)))
            .current_dir(self.config.scratch_dir())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0);

        let plan = self.config.limits.plan(timeout);
        if !plan.is_empty() {
            // SAFETY: the hook runs between fork and exec and only issues
            // setrlimit calls over a plan built before the fork.
            #[allow(unsafe_code)]
            unsafe {
                command.pre_exec(move || limits::apply(&plan));
            }
        }

        let mut command = Command::from(command);
        command.kill_on_drop(true);
        command
    }

    /// Write the canned input, then close stdin so extra reads see EOF
    fn feed_stdin(&self, child: &mut Child) -> Option<JoinHandle<()>> {
        let mut stdin = child.stdin.take()?;
        let input = self.config.default_inputs.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = stdin.write_all(input.as_bytes()).await {
                // the program exited or closed stdin without reading it all
                tracing::debug!(error = %e, "canned input not fully delivered");
            }
            drop(stdin);
        }))
    }
}

/// Background capture of one output stream
struct StreamReader {
    task: JoinHandle<Captured>,
    stop: Arc<Notify>,
}

impl StreamReader {
    fn spawn<R>(stream: R, limit: usize) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let stop = Arc::new(Notify::new());
        let cutoff = {
            let stop = Arc::clone(&stop);
            async move { stop.notified().await }
        };
        let task = tokio::spawn(capture::read_bounded_until(stream, limit, cutoff));
        Self { task, stop }
    }

    /// Wait for EOF, or cut the reader off after the grace period and keep
    /// what it already has
    async fn finish(reader: Option<Self>) -> Captured {
        let Some(Self { mut task, stop }) = reader else {
            return Captured::default();
        };
        let joined = match tokio::time::timeout(READER_GRACE, &mut task).await {
            Ok(joined) => joined,
            Err(_) => {
                // a process outside the group still holds the pipe open
                tracing::warn!("stream still open after exit, keeping partial capture");
                stop.notify_one();
                task.await
            }
        };
        joined.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "stream reader failed");
            Captured::default()
        })
    }
}

fn kill_group(pid: Option<u32>) {
    let Some(raw) = pid.and_then(|p| i32::try_from(p).ok()) else {
        return;
    };
    match killpg(Pid::from_raw(raw), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => tracing::warn!(pgid = raw, error = %e, "failed to kill process group"),
    }
}

/// Exit status, or `128 + signal` for a signal death
fn exit_code(status: ExitStatus) -> i32 {
    status
        .code()
        .or_else(|| status.signal().map(|signal| SIGNAL_EXIT_BASE + signal))
        .unwrap_or(SENTINEL_EXIT_CODE)
}
