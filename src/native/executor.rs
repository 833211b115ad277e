use std::process::Stdio;

use tokio::{
    io::AsyncReadExt,
    process::{Child, Command},
    time::{Duration, Instant, sleep_until},
};

use crate::{
    config::RunnerConfig,
    constants::{DRAIN_GRACE, READ_CHUNK_BYTES},
    core::{
        domain::{CapturedOutput, EvaluationRequest, ExitState, ProcessExit},
        traits::executor::{ExecError, Executor, StreamKind},
    },
};

/// Runs the configured shim as a child process:
/// `<program> <args...> --code-file <artifact> --frames <n>`.
#[derive(Clone, Debug)]
pub struct ShimExecutor {
    config: RunnerConfig,
}

impl ShimExecutor {
    pub fn new(config: RunnerConfig) -> Self {
        ShimExecutor { config }
    }

    fn command(&self, request: &EvaluationRequest) -> Command {
        let mut cmd = Command::new(&self.config.shim.program);
        cmd.args(&self.config.shim.args)
            .arg("--code-file")
            .arg(&request.artifact_path)
            .arg("--frames")
            .arg(request.frame_budget.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

/// Bytes read from one pipe, never more than `limit`.
struct BoundedCapture {
    buf: Vec<u8>,
    limit: usize,
    open: bool,
}

impl BoundedCapture {
    fn new(limit: usize) -> Self {
        BoundedCapture {
            buf: Vec::new(),
            limit,
            open: true,
        }
    }

    /// Returns `false` once the limit is crossed.
    fn push(&mut self, chunk: &[u8]) -> bool {
        let room = self.limit.saturating_sub(self.buf.len());
        self.buf.extend_from_slice(&chunk[..chunk.len().min(room)]);
        chunk.len() <= room
    }
}

enum Termination {
    Exited(ExitState),
    TimedOut,
    OutputLimitExceeded(StreamKind),
    ReadFailed(StreamKind, String),
    WaitFailed(String),
}

async fn kill(child: &mut Child) {
    // Sends SIGKILL and reaps.
    if let Err(e) = child.kill().await {
        tracing::warn!(error = %e, "Failed to kill shim");
    }
}

#[async_trait::async_trait]
impl Executor for ShimExecutor {
    #[tracing::instrument(skip(self, request), fields(shim = ?self.config.shim.program))]
    async fn execute(&self, request: &EvaluationRequest) -> Result<ProcessExit, ExecError> {
        let mut child = self
            .command(request)
            .spawn()
            .map_err(|e| ExecError::Spawn {
                msg: format!("{}: {}", self.config.shim.program.to_string_lossy(), e),
            })?;
        tracing::debug!(pid = ?child.id(), "Shim spawned");

        let (Some(mut stdout), Some(mut stderr)) = (child.stdout.take(), child.stderr.take())
        else {
            kill(&mut child).await;
            return Err(ExecError::Spawn {
                msg: "shim stdio was not piped".to_string(),
            });
        };

        let limit = self.config.max_buffer_bytes;
        let mut out = BoundedCapture::new(limit);
        let mut err = BoundedCapture::new(limit);
        let mut out_chunk = vec![0u8; READ_CHUNK_BYTES];
        let mut err_chunk = vec![0u8; READ_CHUNK_BYTES];

        let deadline = Instant::now() + Duration::from_millis(request.timeout_ms);
        let mut drain_deadline = deadline;
        let mut status: Option<ExitState> = None;

        let termination = loop {
            if let Some(status) = status {
                if !out.open && !err.open {
                    break Termination::Exited(status);
                }
            }

            tokio::select! {
                read = stdout.read(&mut out_chunk), if out.open => match read {
                    Ok(0) => out.open = false,
                    Ok(n) => {
                        if !out.push(&out_chunk[..n]) {
                            break Termination::OutputLimitExceeded(StreamKind::Stdout);
                        }
                    }
                    Err(e) => break Termination::ReadFailed(StreamKind::Stdout, e.to_string()),
                },
                read = stderr.read(&mut err_chunk), if err.open => match read {
                    Ok(0) => err.open = false,
                    Ok(n) => {
                        if !err.push(&err_chunk[..n]) {
                            break Termination::OutputLimitExceeded(StreamKind::Stderr);
                        }
                    }
                    Err(e) => break Termination::ReadFailed(StreamKind::Stderr, e.to_string()),
                },
                waited = child.wait(), if status.is_none() => match waited {
                    Ok(exit) => {
                        status = Some(exit.into());
                        drain_deadline = deadline.min(Instant::now() + DRAIN_GRACE);
                    }
                    Err(e) => break Termination::WaitFailed(e.to_string()),
                },
                _ = sleep_until(drain_deadline) => match status {
                    Some(status) => {
                        tracing::warn!("Shim exited but its pipes are still open, stop capturing");
                        break Termination::Exited(status);
                    }
                    None => break Termination::TimedOut,
                },
            }
        };

        let output = CapturedOutput {
            stdout: out.buf,
            stderr: err.buf,
        };
        // Once `wait` has returned the child is reaped and must not be killed.
        let reaped = status.is_some();

        match termination {
            Termination::Exited(status) => {
                tracing::debug!(
                    %status,
                    stdout_bytes = output.stdout.len(),
                    stderr_bytes = output.stderr.len(),
                    "Shim exited"
                );
                Ok(ProcessExit { status, output })
            }
            Termination::TimedOut => {
                tracing::warn!(timeout_ms = request.timeout_ms, "Shim timed out, killing");
                kill(&mut child).await;
                Err(ExecError::TimedOut {
                    timeout_ms: request.timeout_ms,
                    output,
                })
            }
            Termination::OutputLimitExceeded(stream) => {
                tracing::warn!(%stream, limit_bytes = limit, "Shim output over limit");
                if !reaped {
                    kill(&mut child).await;
                }
                Err(ExecError::OutputLimitExceeded {
                    stream,
                    limit_bytes: limit,
                    output,
                })
            }
            Termination::ReadFailed(stream, msg) => {
                tracing::warn!(%stream, error = %msg, "Failed to read shim output");
                if !reaped {
                    kill(&mut child).await;
                }
                Err(ExecError::Read {
                    stream,
                    msg,
                    output,
                })
            }
            Termination::WaitFailed(msg) => {
                if !reaped {
                    kill(&mut child).await;
                }
                Err(ExecError::Wait { msg, output })
            }
        }
    }
}
