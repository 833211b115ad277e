use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};

use crate::constants::{
    DEFAULT_FRAME_BUDGET, DEFAULT_TIMEOUT_MS, ERR_EMPTY_OUTPUT, ERR_OUTPUT_NOT_JSON,
    ERR_REPORTED_FAILURE, ERR_RUNTIME_EXEC, ERR_RUNTIME_TIMEOUT,
};

/// One evaluation of one artifact.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EvaluationRequest {
    pub artifact_path: PathBuf,
    pub frame_budget: u32,
    pub timeout_ms: u64,
}

impl EvaluationRequest {
    /// Missing or zero parameters fall back to the defaults.
    pub fn new<T>(artifact_path: T, frame_budget: Option<u32>, timeout_ms: Option<u64>) -> Self
    where
        T: AsRef<Path>,
    {
        EvaluationRequest {
            artifact_path: artifact_path.as_ref().into(),
            frame_budget: frame_budget
                .filter(|frames| *frames > 0)
                .unwrap_or(DEFAULT_FRAME_BUDGET),
            timeout_ms: timeout_ms
                .filter(|ms| *ms > 0)
                .unwrap_or(DEFAULT_TIMEOUT_MS),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CapturedOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CapturedOutput {
    pub fn new<O, E>(stdout: O, stderr: E) -> Self
    where
        O: Into<Vec<u8>>,
        E: Into<Vec<u8>>,
    {
        CapturedOutput {
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    /// Non-blank stderr lines, in order.
    pub fn stderr_lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.stderr)
            .lines()
            .map(str::trim_end)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExitState {
    pub code: Option<i32>,
    pub signal: Option<i32>,
}

impl ExitState {
    pub fn code(code: i32) -> Self {
        ExitState {
            code: Some(code),
            signal: None,
        }
    }

    pub fn signal(signal: i32) -> Self {
        ExitState {
            code: None,
            signal: Some(signal),
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<std::process::ExitStatus> for ExitState {
    fn from(status: std::process::ExitStatus) -> Self {
        #[cfg(unix)]
        let signal = std::os::unix::process::ExitStatusExt::signal(&status);
        #[cfg(not(unix))]
        let signal = None;

        ExitState {
            code: status.code(),
            signal,
        }
    }
}

impl std::fmt::Display for ExitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.code, self.signal) {
            (Some(code), _) => write!(f, "status {}", code),
            (None, Some(signal)) => write!(f, "signal {}", signal),
            (None, None) => write!(f, "unknown status"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ProcessExit {
    pub status: ExitState,
    pub output: CapturedOutput,
}

/// Result object printed by the shim, after coercion.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ShimReport {
    pub ok: bool,
    pub elapsed_ms: Option<f64>,
    pub crashed: bool,
    pub logs: Vec<String>,
    pub errors: Vec<String>,
    pub signals: Map<String, Value>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessErrorKind {
    Timeout,
    Exec,
}

impl ProcessErrorKind {
    pub fn tag(&self) -> &'static str {
        match self {
            ProcessErrorKind::Timeout => ERR_RUNTIME_TIMEOUT,
            ProcessErrorKind::Exec => ERR_RUNTIME_EXEC,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum RunOutcome {
    Success(ShimReport),
    ProcessError {
        kind: ProcessErrorKind,
        detail: String,
        stderr: Vec<String>,
    },
    EmptyOutput {
        stderr: Vec<String>,
    },
    MalformedOutput {
        detail: String,
        raw_preview: String,
        stderr: Vec<String>,
    },
}

impl RunOutcome {
    /// Collapses the outcome into the caller-facing shape.
    /// `measured_ms` is used when the shim did not report its own timing.
    pub fn into_result(self, measured_ms: f64) -> RunResult {
        match self {
            RunOutcome::Success(report) => {
                let mut errors = report.errors;
                if !report.ok && errors.is_empty() {
                    errors.push(ERR_REPORTED_FAILURE.to_string());
                }
                RunResult {
                    ok: report.ok,
                    elapsed_ms: report.elapsed_ms.unwrap_or(measured_ms),
                    crashed: report.crashed,
                    logs: report.logs,
                    errors,
                    signals: Some(report.signals),
                }
            }
            RunOutcome::ProcessError {
                kind,
                detail,
                stderr,
            } => RunResult::failed(measured_ms, stderr, vec![kind.tag().to_string(), detail]),
            RunOutcome::EmptyOutput { stderr } => {
                RunResult::failed(measured_ms, stderr, vec![ERR_EMPTY_OUTPUT.to_string()])
            }
            RunOutcome::MalformedOutput {
                detail,
                raw_preview,
                stderr,
            } => RunResult::failed(
                measured_ms,
                stderr,
                vec![ERR_OUTPUT_NOT_JSON.to_string(), detail, raw_preview],
            ),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FailureKind {
    Timeout,
    RuntimeCrash,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub ok: bool,
    pub elapsed_ms: f64,
    pub crashed: bool,
    pub logs: Vec<String>,
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signals: Option<Map<String, Value>>,
}

impl RunResult {
    fn failed(elapsed_ms: f64, logs: Vec<String>, errors: Vec<String>) -> Self {
        RunResult {
            ok: false,
            elapsed_ms,
            crashed: true,
            logs,
            errors,
            signals: None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.errors.iter().any(|error| {
            let error = error.to_lowercase();
            error.contains(ERR_RUNTIME_TIMEOUT) || error.contains("timed out")
        })
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        if self.ok {
            None
        } else if self.is_timeout() {
            Some(FailureKind::Timeout)
        } else {
            Some(FailureKind::RuntimeCrash)
        }
    }
}
