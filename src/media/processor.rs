use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::MediaCommand;
use crate::error::{Result, VtrimError};

/// What an attached invocation left behind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawOutput {
    /// The process ran; `code` is `None` when it was terminated by a signal
    Exited {
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },
    /// The process could not be started or awaited
    Failed(String),
}

impl RawOutput {
    /// Successful exit with the given stdout and no stderr
    pub fn ok<S: Into<String>>(stdout: S) -> Self {
        Self::Exited {
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Stdout of a clean run (exit 0, nothing on stderr), or why there is none
    pub fn into_stdout(self) -> std::result::Result<String, String> {
        match self {
            Self::Exited { code: Some(0), stdout, stderr } if stderr.trim().is_empty() => Ok(stdout),
            Self::Exited { stderr, .. } if !stderr.trim().is_empty() => Err(stderr.trim().to_string()),
            Self::Exited { code, .. } => Err(format!("exited with status {:?}", code)),
            Self::Failed(error) => Err(error),
        }
    }
}

/// Seam over process execution
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run to completion and capture both streams
    async fn output(&self, command: &MediaCommand) -> RawOutput;

    /// Start without waiting or capturing anything
    fn spawn_detached(&self, command: &MediaCommand) -> std::io::Result<()>;
}

/// Runs commands as real child processes
#[derive(Debug, Default, Clone)]
pub struct SystemRunner;

#[async_trait]
impl ProcessRunner for SystemRunner {
    async fn output(&self, command: &MediaCommand) -> RawOutput {
        debug!("Executing {}: {}", command.description, command);

        let result = Command::new(&command.binary_path)
            .args(&command.args)
            .stdin(Stdio::null())
            .output()
            .await;

        match result {
            Ok(output) => RawOutput::Exited {
                code: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            },
            Err(e) => RawOutput::Failed(format!("Failed to execute {}: {}", command.binary_path, e)),
        }
    }

    fn spawn_detached(&self, command: &MediaCommand) -> std::io::Result<()> {
        debug!("Spawning detached {}: {}", command.description, command);

        Command::new(&command.binary_path)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map(|_child| ())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeKind {
    /// Fire-and-forget; nothing is known about the result
    Detached,
    Completed { elapsed: Duration },
    /// The process result did not have a usable shape
    Unexpected(String),
    /// The transcoder wrote to stderr
    TranscoderError(String),
    /// The process could not run or exited unsuccessfully
    InvocationError(String),
}

/// Result of one external invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    pub program: String,
    pub output: PathBuf,
    pub kind: OutcomeKind,
}

impl CommandOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.kind, OutcomeKind::Detached | OutcomeKind::Completed { .. })
    }

    pub fn is_detached(&self) -> bool {
        matches!(self.kind, OutcomeKind::Detached)
    }

    /// Human-readable status line
    pub fn message(&self) -> String {
        match &self.kind {
            OutcomeKind::Detached => format!(
                "Running {} detached. Output: {}",
                self.program,
                self.output.display()
            ),
            OutcomeKind::Completed { elapsed } => format!(
                "Output: {} ({:.2}s)",
                self.output.display(),
                elapsed.as_secs_f64()
            ),
            OutcomeKind::Unexpected(detail) => format!("Unexpected result: {}", detail),
            OutcomeKind::TranscoderError(stderr) => format!("{} error: {}", self.program, stderr),
            OutcomeKind::InvocationError(error) => format!("error: {}", error),
        }
    }
}

/// Classify an attached invocation.
///
/// Checked in order: unexpected shape, non-empty stderr, invocation error,
/// otherwise success. A non-zero exit status without stderr counts as an
/// invocation error.
pub fn classify(program: &str, raw: RawOutput, output: &Path, elapsed: Duration) -> CommandOutcome {
    let kind = match raw {
        RawOutput::Exited { code: None, .. } => {
            OutcomeKind::Unexpected("process terminated without an exit status".to_string())
        }
        RawOutput::Exited { stderr, .. } if !stderr.trim().is_empty() => {
            OutcomeKind::TranscoderError(stderr.trim().to_string())
        }
        RawOutput::Failed(error) => OutcomeKind::InvocationError(error),
        RawOutput::Exited { code: Some(code), .. } if code != 0 => {
            OutcomeKind::InvocationError(format!("{} exited with status {}", program, code))
        }
        RawOutput::Exited { .. } => OutcomeKind::Completed { elapsed },
    };

    CommandOutcome {
        program: program.to_string(),
        output: output.to_path_buf(),
        kind,
    }
}

/// Execute `command`, attached or detached, and report the outcome
pub async fn run(
    runner: &dyn ProcessRunner,
    command: &MediaCommand,
    output: &Path,
    detached: bool,
) -> CommandOutcome {
    let program = command.program_name();

    if detached {
        let kind = match runner.spawn_detached(command) {
            Ok(()) => OutcomeKind::Detached,
            Err(e) => OutcomeKind::InvocationError(format!("Failed to execute {}: {}", command.binary_path, e)),
        };
        return CommandOutcome {
            program,
            output: output.to_path_buf(),
            kind,
        };
    }

    let started = Instant::now();
    let raw = runner.output(command).await;
    let outcome = classify(&program, raw, output, started.elapsed());

    if outcome.is_success() {
        info!("{} completed: {}", command.description, outcome.message());
    } else {
        warn!("{} failed: {}", command.description, outcome.message());
    }

    outcome
}

/// Append the argument vector and outcome of one invocation to `log_path`
pub async fn write_diagnostic_log(
    log_path: &Path,
    command: &MediaCommand,
    outcome: &CommandOutcome,
) -> Result<()> {
    if let Some(parent) = log_path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let entry = format!(
        "[{}] {}\n{}\n{}\n\n",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        command.description,
        command,
        outcome.message()
    );

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .await
        .map_err(|e| VtrimError::Media(format!("Failed to open log {}: {}", log_path.display(), e)))?;

    file.write_all(entry.as_bytes()).await?;
    file.flush().await?;

    debug!("Diagnostic log written to {}", log_path.display());
    Ok(())
}

/// Write the diagnostic log when a path is given.
/// A failed write is returned as a notice, never as an error.
pub async fn log_invocation(
    log_path: Option<&Path>,
    command: &MediaCommand,
    outcome: &CommandOutcome,
) -> Option<String> {
    let log_path = log_path?;
    match write_diagnostic_log(log_path, command, outcome).await {
        Ok(()) => None,
        Err(e) => {
            let notice = format!("Failed to write diagnostic log: {}", e);
            warn!("{}", notice);
            Some(notice)
        }
    }
}
