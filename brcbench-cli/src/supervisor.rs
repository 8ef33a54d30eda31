//! Supervisor Process
//!
//! Builds candidates and runs them as child processes with a hard wall-clock
//! limit.
//!
//! Every child is spawned as the leader of its own process group and owned by
//! a [`ChildGuard`]. A waiter thread blocks in `wait4` so the exit status and
//! the kernel's resource accounting arrive together; the caller waits on a
//! channel with the timeout. On timeout, or when the guard is dropped first,
//! the whole group receives `SIGKILL`, so shells and JVM launchers cannot
//! leave orphans behind.

use crate::planner::Candidate;
use brcbench_core::{ResourceUsage, Timer};
use brcbench_logic::{OutputParser, ParsedOutput};
use std::fs::File;
use std::io::{self, Read};
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStderr, ChildStdout, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Exit code recorded for timeouts and spawn failures
pub const NO_EXIT_CODE: i32 = -1;

/// How long reader threads may lag behind the reaped group before their
/// pipes are abandoned
const PIPE_GRACE: Duration = Duration::from_secs(1);

/// Bytes of stderr kept in build errors
const STDERR_TAIL_BYTES: usize = 2048;

/// Errors from spawning or supervising a child
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("Empty command")]
    EmptyCommand,

    #[error("Failed to spawn {program}: {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to open input {path}: {source}")]
    InputUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to wait for child: {0}")]
    WaitFailed(#[from] io::Error),
}

/// Why a candidate could not be built
#[derive(Debug, Clone, Error)]
pub enum BuildError {
    #[error("No .{extension} sources in {}", .dir.display())]
    MissingSources { dir: PathBuf, extension: String },

    #[error("Failed to start build: {0}")]
    SpawnFailed(String),

    #[error("Build failed with exit code {code}: {stderr}")]
    Failed { code: i32, stderr: String },

    #[error("Build timed out after {0:?}")]
    Timeout(Duration),
}

// ─── Child guard ─────────────────────────────────────────────────────────────

/// Exit status and accounting of a reaped child
#[derive(Debug, Clone, Copy)]
pub struct WaitStatus {
    raw: libc::c_int,
    pub usage: ResourceUsage,
}

impl WaitStatus {
    /// Exit code, or `128 + signal` when killed by a signal
    pub fn exit_code(&self) -> i32 {
        if libc::WIFEXITED(self.raw) {
            libc::WEXITSTATUS(self.raw)
        } else if libc::WIFSIGNALED(self.raw) {
            128 + libc::WTERMSIG(self.raw)
        } else {
            NO_EXIT_CODE
        }
    }

    /// Exited normally with status 0
    pub fn success(&self) -> bool {
        self.exit_code() == 0
    }
}

fn wait4_blocking(pid: libc::pid_t) -> io::Result<WaitStatus> {
    loop {
        let mut raw: libc::c_int = 0;
        // SAFETY: rusage is plain old data; wait4 fills it in
        let mut usage: libc::rusage = unsafe { std::mem::zeroed() };
        let ret = unsafe { libc::wait4(pid, &mut raw, 0, &mut usage) };
        if ret == pid {
            return Ok(WaitStatus {
                raw,
                usage: ResourceUsage::from_rusage(&usage),
            });
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}

/// Send SIGKILL to a process group. ESRCH (group already gone) is ignored.
fn kill_group(pgid: libc::pid_t) {
    let ret = unsafe { libc::killpg(pgid, libc::SIGKILL) };
    if ret == -1 {
        let err = io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::ESRCH) {
            tracing::debug!(pgid, error = %err, "killpg failed");
        }
    }
}

/// Owns a running child process group
///
/// Dropping the guard before the child was reaped kills the group and reaps
/// the leader.
pub struct ChildGuard {
    child: Child,
    pid: libc::pid_t,
    status_rx: Receiver<io::Result<WaitStatus>>,
    reaped: bool,
}

impl ChildGuard {
    /// Spawn `command` as the leader of a new process group
    pub fn spawn(command: &mut Command) -> io::Result<Self> {
        command.process_group(0);
        let child = command.spawn()?;
        let pid = child.id() as libc::pid_t;

        let (tx, status_rx) = mpsc::channel();
        thread::Builder::new()
            .name(format!("brcbench-wait-{pid}"))
            .spawn(move || {
                let _ = tx.send(wait4_blocking(pid));
            })
            .inspect_err(|_| kill_group(pid))?;

        Ok(Self {
            child,
            pid,
            status_rx,
            reaped: false,
        })
    }

    /// Process id of the group leader
    pub fn id(&self) -> u32 {
        self.pid as u32
    }

    /// Take the captured stdout pipe
    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.child.stdout.take()
    }

    /// Take the captured stderr pipe
    pub fn take_stderr(&mut self) -> Option<ChildStderr> {
        self.child.stderr.take()
    }

    /// Wait up to `timeout` for the leader to exit
    ///
    /// Returns `Ok(None)` on timeout; the child is still running. After a
    /// normal exit any remaining group members are killed.
    pub fn wait_timeout(&mut self, timeout: Duration) -> io::Result<Option<WaitStatus>> {
        match self.status_rx.recv_timeout(timeout) {
            Ok(result) => {
                self.reaped = true;
                kill_group(self.pid);
                result.map(Some)
            }
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                self.reaped = true;
                Err(io::Error::other("waiter thread exited without a status"))
            }
        }
    }

    /// Kill the whole group and reap the leader
    pub fn kill(&mut self) -> io::Result<WaitStatus> {
        kill_group(self.pid);
        let result = self
            .status_rx
            .recv()
            .map_err(|_| io::Error::other("waiter thread exited without a status"));
        self.reaped = true;
        result?
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        if !self.reaped {
            kill_group(self.pid);
            let _ = self.status_rx.recv_timeout(Duration::from_secs(5));
        }
    }
}

// ─── Process execution ───────────────────────────────────────────────────────

/// Raw outcome of one supervised process
#[derive(Debug)]
pub struct ProcessOutcome {
    /// Encoded exit code; [`NO_EXIT_CODE`] on timeout
    pub exit_code: i32,
    pub timed_out: bool,
    /// Empty on timeout
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// Spawn to reap
    pub elapsed: Duration,
    pub usage: ResourceUsage,
    /// A process outside the group still held stdout or stderr open after
    /// the grace period; captured output is incomplete
    pub pipes_abandoned: bool,
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        let _ = tx.send(buf);
    });
    rx
}

/// Reader result, or `None` once `deadline` has passed
fn collect(rx: &Receiver<Vec<u8>>, deadline: Instant) -> Option<Vec<u8>> {
    rx.recv_timeout(deadline.saturating_duration_since(Instant::now()))
        .ok()
}

/// Run `argv` to completion or until `timeout`
pub fn execute(argv: &[String], stdin: Stdio, timeout: Duration) -> Result<ProcessOutcome, RunnerError> {
    let (program, args) = argv.split_first().ok_or(RunnerError::EmptyCommand)?;

    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(stdin)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let timer = Timer::start();
    let mut guard = ChildGuard::spawn(&mut command).map_err(|source| RunnerError::SpawnFailed {
        program: program.clone(),
        source,
    })?;
    tracing::debug!(pid = guard.id(), program = %program, "spawned");

    let stdout = drain(guard.take_stdout());
    let stderr = drain(guard.take_stderr());

    let (status, timed_out) = match guard.wait_timeout(timeout)? {
        Some(status) => (status, false),
        None => {
            tracing::debug!(pid = guard.id(), ?timeout, "timed out, killing process group");
            (guard.kill()?, true)
        }
    };
    let elapsed = timer.elapsed();

    // The group is dead; only a descendant that left it can keep a pipe open
    let deadline = Instant::now() + PIPE_GRACE;
    let stdout = collect(&stdout, deadline);
    let stderr = collect(&stderr, deadline);
    let pipes_abandoned = stdout.is_none() || stderr.is_none();
    if pipes_abandoned {
        tracing::warn!(program = %program, "output pipe held open by a detached process, abandoning it");
    }
    let stdout = stdout.unwrap_or_default();
    let stderr = stderr.unwrap_or_default();

    Ok(ProcessOutcome {
        exit_code: if timed_out {
            NO_EXIT_CODE
        } else {
            status.exit_code()
        },
        timed_out,
        stdout: if timed_out { Vec::new() } else { stdout },
        stderr,
        elapsed,
        usage: status.usage,
        pipes_abandoned,
    })
}

// ─── Execution runner ────────────────────────────────────────────────────────

/// Result of one iteration
#[derive(Debug, Clone, Default)]
pub struct RunResult {
    pub elapsed_seconds: f64,
    /// Peak RSS of the child in bytes, 0 when unavailable
    pub memory_delta_bytes: u64,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    /// stdout parsed without grammar errors
    pub output_valid: bool,
    pub timed_out: bool,
    pub format_errors: Vec<String>,
    /// Execution failure, distinct from format errors
    pub error: Option<String>,
    /// Parsed stdout, absent when the process did not exit cleanly
    pub parsed: Option<ParsedOutput>,
}

impl RunResult {
    fn failed(error: String) -> Self {
        Self {
            exit_code: NO_EXIT_CODE,
            error: Some(error),
            ..Self::default()
        }
    }

    /// Size of the captured output
    pub fn output_bytes(&self) -> usize {
        self.stdout.len()
    }
}

/// Builds and runs candidates
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecutionRunner {
    parser: OutputParser,
}

impl ExecutionRunner {
    /// Create a runner that parses output with `parser`
    pub fn new(parser: OutputParser) -> Self {
        Self { parser }
    }

    /// Build a candidate, returning the build duration
    pub fn build(
        &self,
        candidate: &Candidate,
        input: &Path,
        timeout: Duration,
    ) -> Result<Duration, BuildError> {
        if !candidate.is_found() {
            return Err(BuildError::MissingSources {
                dir: candidate.dir.clone(),
                extension: candidate.toolchain.extension.clone(),
            });
        }
        let Some(argv) = candidate.build_argv(input) else {
            return Ok(Duration::ZERO);
        };

        tracing::info!(candidate = %candidate.id, command = %argv.join(" "), "building");
        let outcome = execute(&argv, Stdio::null(), timeout)
            .map_err(|e| BuildError::SpawnFailed(e.to_string()))?;

        if outcome.timed_out {
            return Err(BuildError::Timeout(timeout));
        }
        if outcome.exit_code != 0 {
            return Err(BuildError::Failed {
                code: outcome.exit_code,
                stderr: tail(&String::from_utf8_lossy(&outcome.stderr), STDERR_TAIL_BYTES),
            });
        }
        Ok(outcome.elapsed)
    }

    /// Run a built candidate once with `input` on stdin
    ///
    /// Never fails: every problem is recorded in the returned [`RunResult`].
    pub fn run(&self, candidate: &Candidate, input: &Path, timeout: Duration) -> RunResult {
        let stdin = match File::open(input) {
            Ok(file) => Stdio::from(file),
            Err(source) => {
                let err = RunnerError::InputUnavailable {
                    path: input.to_path_buf(),
                    source,
                };
                return RunResult::failed(err.to_string());
            }
        };

        let outcome = match execute(&candidate.run_argv(input), stdin, timeout) {
            Ok(outcome) => outcome,
            Err(e) => return RunResult::failed(e.to_string()),
        };

        let mut result = RunResult {
            elapsed_seconds: outcome.elapsed.as_secs_f64(),
            memory_delta_bytes: outcome.usage.peak_rss_bytes,
            exit_code: outcome.exit_code,
            stdout: String::from_utf8_lossy(&outcome.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&outcome.stderr).into_owned(),
            timed_out: outcome.timed_out,
            ..RunResult::default()
        };

        if outcome.timed_out {
            result.error = Some(format!("Timed out after {:.1}s", timeout.as_secs_f64()));
            return result;
        }
        if outcome.pipes_abandoned {
            result.stdout.clear();
            result.error = Some("Output left open by a detached background process".to_string());
            return result;
        }
        if outcome.exit_code != 0 {
            let stderr = tail(result.stderr.trim(), STDERR_TAIL_BYTES);
            result.error = Some(if stderr.is_empty() {
                format!("Exited with code {}", outcome.exit_code)
            } else {
                format!("Exited with code {}: {}", outcome.exit_code, stderr)
            });
        }

        let parsed = self.parser.parse(&result.stdout);
        result.output_valid = parsed.is_valid();
        result.format_errors = parsed.error_messages();
        result.parsed = Some(parsed);
        result
    }
}

/// Last `max` bytes of `s`, on a char boundary
fn tail(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut start = s.len() - max;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    format!("...{}", &s[start..])
}
