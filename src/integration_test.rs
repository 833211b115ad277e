use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tempfile::TempDir;

use crate::config::{RunnerConfig, ShimCommand};
use crate::constants::{
    ERR_EMPTY_OUTPUT, ERR_OUTPUT_NOT_JSON, ERR_RUNTIME_EXEC, ERR_RUNTIME_TIMEOUT,
    RAW_OUTPUT_PREVIEW_CHARS,
};
use crate::core::domain::{EvaluationRequest, FailureKind};
use crate::core::pipeline::running::Runner;
use crate::native::executor::ShimExecutor;

// The shim runs the artifact as a shell script with the frame budget in $FRAMES.
const SHIM: &str = r#"FRAMES="$4" exec /bin/sh "$2""#;

fn runner() -> Runner {
    runner_with_limit(1024 * 1024)
}

fn runner_with_limit(max_buffer_bytes: usize) -> Runner {
    let config = RunnerConfig::new(ShimCommand::new("/bin/sh", ["-c", SHIM, "shim"]))
        .with_max_buffer_bytes(max_buffer_bytes);
    Runner::new(Arc::new(ShimExecutor::new(config)))
}

fn write_artifact(dir: &TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("snippet.sh");
    std::fs::write(&path, body).expect("Failed to write artifact");
    path
}

fn request(path: &Path, timeout_ms: u64) -> EvaluationRequest {
    EvaluationRequest::new(path, Some(12), Some(timeout_ms))
}

#[tokio::test]
async fn test_well_formed_ok_result() {
    let dir = tempfile::tempdir().unwrap();
    let artifact = write_artifact(
        &dir,
        r#"echo "loading" >&2
printf '{"ok":true,"elapsedMs":8,"crashed":false,"logs":["ran %s frames"],"errors":[],"signals":{"frames":%s}}\n' "$FRAMES" "$FRAMES"
"#,
    );

    let result = runner().run(request(&artifact, 2000)).await;

    assert!(result.ok, "unexpected result: {:?}", result);
    assert!(!result.crashed);
    assert!(result.errors.is_empty());
    assert_eq!(result.elapsed_ms, 8.0);
    assert_eq!(result.logs, vec!["ran 12 frames"]);
    assert_eq!(
        result.signals.and_then(|signals| signals.get("frames").cloned()),
        Some(serde_json::json!(12))
    );
}

#[tokio::test]
async fn test_sleeping_artifact_times_out() {
    let dir = tempfile::tempdir().unwrap();
    let artifact = write_artifact(&dir, "echo 'frame 1' >&2\nsleep 10\n");
    let started = Instant::now();

    let result = runner().run(request(&artifact, 300)).await;

    assert!(started.elapsed() < Duration::from_secs(3));
    assert!(!result.ok);
    assert!(result.crashed);
    assert_eq!(result.errors[0], ERR_RUNTIME_TIMEOUT);
    assert_eq!(result.logs, vec!["frame 1"]);
    assert_eq!(result.failure_kind(), Some(FailureKind::Timeout));
    assert!(result.elapsed_ms >= 300.0);
}

#[tokio::test]
async fn test_non_zero_exit_without_output() {
    let dir = tempfile::tempdir().unwrap();
    let artifact = write_artifact(&dir, "exit 1\n");

    let result = runner().run(request(&artifact, 2000)).await;

    assert!(!result.ok);
    assert!(result.crashed);
    assert_eq!(result.errors[0], ERR_RUNTIME_EXEC);
    assert_eq!(result.failure_kind(), Some(FailureKind::RuntimeCrash));
}

#[tokio::test]
async fn test_missing_artifact_is_exec_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("does-not-exist.sh");

    let result = runner().run(request(&missing, 2000)).await;

    assert!(!result.ok);
    assert_eq!(result.errors[0], ERR_RUNTIME_EXEC);
}

#[tokio::test]
async fn test_whitespace_only_output() {
    let dir = tempfile::tempdir().unwrap();
    let artifact = write_artifact(&dir, "printf '  \\n\\t\\n'\n");

    let result = runner().run(request(&artifact, 2000)).await;

    assert!(!result.ok);
    assert!(result.crashed);
    assert_eq!(result.errors, vec![ERR_EMPTY_OUTPUT]);
}

#[tokio::test]
async fn test_not_json_output() {
    let dir = tempfile::tempdir().unwrap();
    let artifact = write_artifact(&dir, "echo not-json\n");

    let result = runner().run(request(&artifact, 2000)).await;

    assert!(!result.ok);
    assert!(result.crashed);
    assert_eq!(result.errors[0], ERR_OUTPUT_NOT_JSON);
    assert!(result.errors.iter().any(|error| error == "not-json"));
}

#[tokio::test]
async fn test_long_garbage_output_is_truncated() {
    let dir = tempfile::tempdir().unwrap();
    let artifact = write_artifact(
        &dir,
        "i=0\nwhile [ $i -lt 100 ]; do printf 'garbage-garbage-garbage-garbage-garbage-garbage-'; i=$((i+1)); done\n",
    );

    let result = runner().run(request(&artifact, 3000)).await;

    assert_eq!(result.errors[0], ERR_OUTPUT_NOT_JSON);
    let raw = &result.errors[2];
    assert!(raw.starts_with("garbage-"));
    assert_eq!(raw.chars().count(), RAW_OUTPUT_PREVIEW_CHARS);
}

#[tokio::test]
async fn test_same_artifact_twice_classifies_the_same() {
    let dir = tempfile::tempdir().unwrap();
    let artifact = write_artifact(&dir, "echo '{\"ok\":false,\"errors\":[\"no_canvas\"]}'\n");
    let runner = runner();

    let first = runner.run(request(&artifact, 2000)).await;
    let second = runner.run(request(&artifact, 2000)).await;

    assert!(!first.ok);
    assert_eq!(first.errors, vec!["no_canvas"]);
    assert_eq!((first.ok, &first.errors), (second.ok, &second.errors));
}

#[tokio::test]
async fn test_flooding_stdout_is_process_error() {
    let dir = tempfile::tempdir().unwrap();
    let artifact = write_artifact(&dir, "while :; do echo flood-flood-flood; done\n");
    let started = Instant::now();

    let result = runner_with_limit(4096).run(request(&artifact, 5000)).await;

    assert!(started.elapsed() < Duration::from_secs(4));
    assert!(!result.ok);
    assert!(result.crashed);
    assert_eq!(result.errors[0], ERR_RUNTIME_EXEC);
    assert!(result.errors[1].contains("stdout"));
}
