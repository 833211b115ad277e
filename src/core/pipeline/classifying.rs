use serde_json::{Map, Value};

use crate::{
    constants::RAW_OUTPUT_PREVIEW_CHARS,
    core::{
        domain::{CapturedOutput, ProcessErrorKind, ProcessExit, RunOutcome, ShimReport},
        traits::executor::ExecError,
    },
};

/// Folds the executor result into exactly one of the four outcomes.
pub fn classify(execution: Result<ProcessExit, ExecError>) -> RunOutcome {
    match execution {
        Err(err) => {
            let kind = match err {
                ExecError::TimedOut { .. } => ProcessErrorKind::Timeout,
                _ => ProcessErrorKind::Exec,
            };
            let stderr = err
                .output()
                .map(CapturedOutput::stderr_lines)
                .unwrap_or_default();
            RunOutcome::ProcessError {
                kind,
                detail: err.to_string(),
                stderr,
            }
        }
        Ok(exit) if !exit.status.success() => RunOutcome::ProcessError {
            kind: ProcessErrorKind::Exec,
            detail: format!("shim exited with {}", exit.status),
            stderr: exit.output.stderr_lines(),
        },
        Ok(exit) => classify_stdout(&exit.output),
    }
}

fn classify_stdout(output: &CapturedOutput) -> RunOutcome {
    let stdout = output.stdout_text();
    let trimmed = stdout.trim();
    let stderr = output.stderr_lines();

    if trimmed.is_empty() {
        return RunOutcome::EmptyOutput { stderr };
    }

    // Only the first JSON value counts; anything after it is ignored.
    let mut values = serde_json::Deserializer::from_str(trimmed).into_iter::<Value>();
    match values.next() {
        Some(Ok(Value::Object(object))) => {
            let trailing = trimmed[values.byte_offset()..].trim();
            if !trailing.is_empty() {
                tracing::warn!(
                    trailing_bytes = trailing.len(),
                    "Ignoring shim output after the first JSON value"
                );
            }
            RunOutcome::Success(report_from_object(object))
        }
        Some(Ok(other)) => RunOutcome::MalformedOutput {
            detail: format!("expected a JSON object, found {}", json_kind(&other)),
            raw_preview: preview(trimmed),
            stderr,
        },
        Some(Err(err)) => RunOutcome::MalformedOutput {
            detail: err.to_string(),
            raw_preview: preview(trimmed),
            stderr,
        },
        None => RunOutcome::EmptyOutput { stderr },
    }
}

fn report_from_object(object: Map<String, Value>) -> ShimReport {
    let elapsed_ms = object
        .get("elapsedMs")
        .or_else(|| object.get("ms"))
        .and_then(Value::as_f64)
        .filter(|ms| ms.is_finite() && *ms >= 0.0);

    ShimReport {
        ok: truthy(object.get("ok")),
        elapsed_ms,
        crashed: truthy(object.get("crashed")),
        logs: string_list(object.get("logs")),
        errors: string_list(object.get("errors")),
        signals: match object.get("signals") {
            Some(Value::Object(signals)) => signals.clone(),
            _ => Map::new(),
        },
    }
}

fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Number(number)) => number.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::String(text)) => !text.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

/// Kept only if every element is a string.
fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| item.as_str().map(str::to_string))
            .collect::<Option<Vec<_>>>()
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn preview(raw: &str) -> String {
    raw.chars().take(RAW_OUTPUT_PREVIEW_CHARS).collect()
}
