//! Lifecycle of the external load generator process
//!
//! The supervisor launches the tool in its own process group with stdout and
//! stderr redirected to artifact files, answers non-blocking liveness checks,
//! and tears the whole group down on shutdown.

use chrono::{DateTime, Utc};
use std::fs::File;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Child;
use tracing::{debug, info, warn, Instrument, Span};

use super::command::LaunchSpec;
use super::error::LaunchError;
use crate::error::{HarnessError, Result};

/// Liveness of the launched process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    Running,
    /// Exit code; a signal death is reported as `128 + signal`
    Exited(i32),
}

impl ProcessStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, ProcessStatus::Running)
    }
}

/// Shutdown tuning
#[derive(Debug, Clone)]
pub struct ShutdownPolicy {
    /// Pause between termination rounds
    pub interval: Duration,
    /// SIGTERM rounds before escalating to SIGKILL
    pub term_attempts: u32,
}

impl Default for ShutdownPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            term_attempts: 10,
        }
    }
}

/// What happened during shutdown
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownSummary {
    pub pid: u32,
    pub exit_code: Option<i32>,
    pub signals_sent: u32,
    pub elapsed: Duration,
}

/// A launched load generator. Owned by the supervisor until shutdown.
pub struct ProcessHandle {
    child: Child,
    pid: u32,
    started_at: Instant,
    started_wall: DateTime<Utc>,
    stdout: Option<File>,
    stderr: Option<File>,
    exit_code: Option<i32>,
}

impl ProcessHandle {
    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_wall
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Last observed exit code, `None` while running
    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    pub fn captures_open(&self) -> bool {
        self.stdout.is_some() || self.stderr.is_some()
    }

    /// Non-blocking exit check
    pub fn poll(&mut self) -> std::io::Result<ProcessStatus> {
        if let Some(code) = self.exit_code {
            return Ok(ProcessStatus::Exited(code));
        }

        match self.child.try_wait()? {
            Some(status) => {
                let code = exit_code_of(status);
                self.exit_code = Some(code);
                Ok(ProcessStatus::Exited(code))
            }
            None => Ok(ProcessStatus::Running),
        }
    }

    fn close_captures(&mut self) {
        // Dropping the files closes them; take() makes a second call a no-op
        let closed = self.stdout.take().is_some() | self.stderr.take().is_some();
        if closed {
            debug!(pid = self.pid, "Closed output capture files");
        }
    }

    /// Request termination of the whole process group
    fn signal_group(&mut self, kill: bool) {
        #[cfg(unix)]
        {
            use nix::sys::signal::{killpg, Signal};
            use nix::unistd::Pid;

            // pid 0 would address our own group
            if self.pid != 0 {
                let signal = if kill { Signal::SIGKILL } else { Signal::SIGTERM };
                if let Err(errno) = killpg(Pid::from_raw(self.pid as i32), signal) {
                    debug!(pid = self.pid, %signal, "Failed to terminate: {}", errno);
                }
                return;
            }
        }

        let _ = kill;
        if let Err(e) = self.child.start_kill() {
            debug!(pid = self.pid, "Failed to terminate: {}", e);
        }
    }
}

#[cfg(unix)]
fn exit_code_of(status: std::process::ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status
        .code()
        .or_else(|| status.signal().map(|signal| 128 + signal))
        .unwrap_or(-1)
}

#[cfg(not(unix))]
fn exit_code_of(status: std::process::ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

/// Owns at most one load generator process for its whole lifetime.
pub struct ProcessSupervisor {
    policy: ShutdownPolicy,
    handle: Option<ProcessHandle>,
    summary: Option<ShutdownSummary>,
    span: Span,
}

impl Default for ProcessSupervisor {
    fn default() -> Self {
        Self::new(ShutdownPolicy::default())
    }
}

impl ProcessSupervisor {
    pub fn new(policy: ShutdownPolicy) -> Self {
        Self {
            policy,
            handle: None,
            summary: None,
            span: tracing::info_span!("supervisor"),
        }
    }

    /// Route this supervisor's log events through the caller's span
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn handle(&self) -> Option<&ProcessHandle> {
        self.handle.as_ref()
    }

    /// Launch the load generator described by `spec`.
    ///
    /// Creates (truncating) both capture files and spawns the executable as the
    /// leader of a new process group.
    pub fn start(&mut self, spec: &LaunchSpec) -> std::result::Result<&ProcessHandle, LaunchError> {
        let _enter = self.span.enter();

        if let Some(handle) = &self.handle {
            return Err(LaunchError::AlreadyStarted { pid: handle.pid });
        }

        let executable = spec.resolve_executable()?;
        let stdout = create_capture(&spec.stdout_path)?;
        let stderr = create_capture(&spec.stderr_path)?;

        let mut cmd = tokio::process::Command::new(&executable);

        // Own process group so shutdown can signal every child the tool forks
        #[cfg(unix)]
        {
            cmd.process_group(0);
        }

        cmd.args(&spec.args);
        for (key, value) in &spec.env {
            cmd.env(key, value);
        }
        if let Some(dir) = &spec.working_dir {
            cmd.current_dir(dir);
        }

        cmd.stdin(Stdio::null())
            .stdout(stdio_for(&stdout, &spec.stdout_path)?)
            .stderr(stdio_for(&stderr, &spec.stderr_path)?);

        debug!("Executing load generator: {}", spec.display_command());
        if let Some(ref dir) = spec.working_dir {
            debug!("Working directory: {:?}", dir);
        }
        if !spec.env.is_empty() {
            tracing::trace!("Environment overrides: {:?}", spec.env);
        }

        let child = cmd.spawn().map_err(|source| LaunchError::SpawnFailed {
            command: spec.display_command(),
            source,
        })?;

        let pid = child.id().unwrap_or(0);
        info!(pid, "Started load generator: {}", spec.display_command());

        Ok(self.handle.insert(ProcessHandle {
            child,
            pid,
            started_at: Instant::now(),
            started_wall: Utc::now(),
            stdout: Some(stdout),
            stderr: Some(stderr),
            exit_code: None,
        }))
    }

    /// Non-blocking liveness check
    pub fn poll(&mut self) -> Result<ProcessStatus> {
        let handle = self.handle.as_mut().ok_or(HarnessError::NotStarted)?;
        handle
            .poll()
            .map_err(|e| HarnessError::io("Failed to query load generator status", e))
    }

    /// Decide whether the run is over.
    ///
    /// Returns `Ok(false)` while the tool runs and `Ok(true)` once it exited
    /// cleanly after writing results. A non-zero exit is a `ProcessFailure`
    /// regardless of what the results log contains; a clean exit without
    /// results is `EmptyResults`.
    pub fn check(&mut self, result_log: &Path) -> Result<bool> {
        let status = self.poll()?;
        let _enter = self.span.enter();

        match status {
            ProcessStatus::Running => Ok(false),
            ProcessStatus::Exited(0) => {
                let has_data = std::fs::metadata(result_log)
                    .map(|meta| meta.len() > 0)
                    .unwrap_or(false);
                if has_data {
                    info!("Load generator finished");
                    Ok(true)
                } else {
                    Err(HarnessError::EmptyResults {
                        path: result_log.to_path_buf(),
                    })
                }
            }
            ProcessStatus::Exited(code) => {
                info!("Load generator exit code: {}", code);
                Err(HarnessError::ProcessFailure { exit_code: code })
            }
        }
    }

    /// Stop the load generator if it is still running and release its files.
    ///
    /// Safe to call repeatedly and when `start` never succeeded. Termination
    /// failures are logged and do not stop cleanup.
    pub async fn shutdown(&mut self) -> Option<ShutdownSummary> {
        let span = self.span.clone();
        self.shutdown_inner().instrument(span).await
    }

    async fn shutdown_inner(&mut self) -> Option<ShutdownSummary> {
        if let Some(summary) = &self.summary {
            debug!("Load generator already shut down");
            return Some(summary.clone());
        }

        let Some(handle) = self.handle.as_mut() else {
            debug!("No load generator to shut down");
            return None;
        };

        let mut signals_sent = 0u32;
        loop {
            match handle.poll() {
                Ok(ProcessStatus::Running) => {}
                Ok(ProcessStatus::Exited(_)) => break,
                Err(e) => {
                    warn!(pid = handle.pid, "Cannot query load generator status: {}", e);
                    break;
                }
            }

            let escalate = signals_sent >= self.policy.term_attempts;
            if escalate {
                warn!(pid = handle.pid, "Load generator ignores SIGTERM, killing process group");
            } else {
                info!("Terminating load generator PID: {}", handle.pid);
            }
            handle.signal_group(escalate);
            signals_sent += 1;

            tokio::time::sleep(self.policy.interval).await;
        }

        handle.close_captures();

        let summary = ShutdownSummary {
            pid: handle.pid,
            exit_code: handle.exit_code,
            signals_sent,
            elapsed: handle.elapsed(),
        };
        debug!(
            "Load generator worked for {:.3} seconds",
            summary.elapsed.as_secs_f64()
        );

        self.summary = Some(summary.clone());
        Some(summary)
    }
}

fn create_capture(path: &Path) -> std::result::Result<File, LaunchError> {
    let capture_err = |source| LaunchError::CaptureFile {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(capture_err)?;
    }
    File::create(path).map_err(capture_err)
}

fn stdio_for(file: &File, path: &Path) -> std::result::Result<Stdio, LaunchError> {
    file.try_clone()
        .map(Stdio::from)
        .map_err(|source| LaunchError::CaptureFile {
            path: path.to_path_buf(),
            source,
        })
}
