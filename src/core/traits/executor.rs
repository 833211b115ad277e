use crate::core::domain::{CapturedOutput, EvaluationRequest, ProcessExit};

/// Owns the child process for exactly one evaluation.
#[mockall::automock]
#[async_trait::async_trait]
pub trait Executor: std::fmt::Debug + Send + Sync {
    async fn execute(&self, request: &EvaluationRequest) -> Result<ProcessExit, ExecError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

impl std::fmt::Display for StreamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamKind::Stdout => write!(f, "stdout"),
            StreamKind::Stderr => write!(f, "stderr"),
        }
    }
}

// Variants that happen after spawn keep whatever output was captured.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExecError {
    #[error("shim did not finish within {timeout_ms}ms and was killed")]
    TimedOut {
        timeout_ms: u64,
        output: CapturedOutput,
    },
    #[error("shim {stream} exceeded the maximum buffer of {limit_bytes} bytes")]
    OutputLimitExceeded {
        stream: StreamKind,
        limit_bytes: usize,
        output: CapturedOutput,
    },
    #[error("failed to spawn shim: {msg}")]
    Spawn { msg: String },
    #[error("failed to read shim {stream}: {msg}")]
    Read {
        stream: StreamKind,
        msg: String,
        output: CapturedOutput,
    },
    #[error("failed to wait for shim: {msg}")]
    Wait { msg: String, output: CapturedOutput },
}

impl ExecError {
    pub fn output(&self) -> Option<&CapturedOutput> {
        match self {
            ExecError::TimedOut { output, .. }
            | ExecError::OutputLimitExceeded { output, .. }
            | ExecError::Read { output, .. }
            | ExecError::Wait { output, .. } => Some(output),
            ExecError::Spawn { .. } => None,
        }
    }
}
