// ABOUTME: Process execution seam for the external tools the pipeline wraps.
// ABOUTME: Defines the CommandRunner trait and its tokio-backed implementation.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// A single external command invocation.
///
/// Not `derive(Debug)`: stdin may carry registry credentials, so the
/// manual impl below reports only its length.
#[derive(Clone)]
pub struct ExecRequest {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub stdin: Option<Vec<u8>>,
    /// Stream output to the operator's terminal instead of capturing it.
    pub stream_output: bool,
    /// Hide arguments from logs and error messages (secret material).
    pub redact_args: bool,
}

impl ExecRequest {
    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|a| (*a).to_string()).collect(),
            cwd: None,
            stdin: None,
            stream_output: false,
            redact_args: false,
        }
    }

    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn with_stdin(mut self, bytes: Vec<u8>) -> Self {
        self.stdin = Some(bytes);
        self
    }

    pub fn streamed(mut self) -> Self {
        self.stream_output = true;
        self
    }

    pub fn redacted(mut self) -> Self {
        self.redact_args = true;
        self
    }

    /// The command line as shown to the operator.
    pub fn display(&self) -> String {
        if self.redact_args {
            format!("{} [arguments redacted]", self.program)
        } else if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

impl std::fmt::Debug for ExecRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecRequest")
            .field("command", &self.display())
            .field("cwd", &self.cwd)
            .field("stdin_len", &self.stdin.as_ref().map(|b| b.len()))
            .finish()
    }
}

/// Captured result of a finished command.
#[derive(Debug, Clone)]
pub struct ExecOutput {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Convert a non-zero exit into an error naming the command.
    pub fn require_success(self, request: &ExecRequest) -> Result<ExecOutput, ExecError> {
        if self.success() {
            Ok(self)
        } else {
            Err(ExecError::NonZeroExit {
                command: request.display(),
                code: self.exit_code.unwrap_or(-1),
                stderr: tail(&self.stderr, 500),
            })
        }
    }
}

/// Keep only the last `max` characters of command stderr for error messages.
fn tail(s: &str, max: usize) -> String {
    let trimmed = s.trim();
    let chars: Vec<char> = trimmed.chars().collect();
    if chars.len() <= max {
        trimmed.to_string()
    } else {
        chars[chars.len() - max..].iter().collect()
    }
}

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("failed to spawn {command}: {message}")]
    Spawn { command: String, message: String },

    #[error("`{command}` exited with status {code}: {stderr}")]
    NonZeroExit {
        command: String,
        code: i32,
        stderr: String,
    },

    #[error("failed to write stdin to {command}: {message}")]
    Stdin { command: String, message: String },
}

/// Runs external commands. The trait exists so pipeline stages can be
/// exercised against scripted outputs without the real tools installed.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run the command to completion. Spawn failures are errors; a
    /// non-zero exit status is returned in the output for the caller
    /// to judge (see [`ExecOutput::require_success`]).
    async fn run(&self, request: &ExecRequest) -> Result<ExecOutput, ExecError>;
}

/// The real implementation, backed by `tokio::process`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, request: &ExecRequest) -> Result<ExecOutput, ExecError> {
        tracing::debug!("running {}", request.display());

        let mut cmd = Command::new(&request.program);
        cmd.args(&request.args);

        if let Some(dir) = &request.cwd {
            cmd.current_dir(dir);
        }

        cmd.stdin(if request.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });

        if request.stream_output {
            cmd.stdout(Stdio::inherit());
            cmd.stderr(Stdio::inherit());
        } else {
            cmd.stdout(Stdio::piped());
            cmd.stderr(Stdio::piped());
        }

        let mut child = cmd.spawn().map_err(|e| ExecError::Spawn {
            command: request.display(),
            message: e.to_string(),
        })?;

        if let Some(bytes) = &request.stdin {
            let mut stdin = child.stdin.take();
            if let Some(handle) = stdin.as_mut() {
                handle
                    .write_all(bytes)
                    .await
                    .map_err(|e| ExecError::Stdin {
                        command: request.display(),
                        message: e.to_string(),
                    })?;
            }
            // Drop closes the pipe so the child sees EOF.
            drop(stdin);
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| ExecError::Spawn {
                command: request.display(),
                message: e.to_string(),
            })?;

        Ok(ExecOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
