use std::path::PathBuf;

use clap::Parser;

use crate::{
    config::{RunnerConfig, ShimCommand},
    constants::{
        DEFAULT_FRAME_BUDGET, DEFAULT_MAX_BUFFER_BYTES, DEFAULT_SHIM_PROGRAM, DEFAULT_SHIM_SCRIPT,
        DEFAULT_TIMEOUT_MS,
    },
    core::domain::EvaluationRequest,
};

/// Runs one generated snippet through the runtime shim and prints the
/// normalized result as JSON on stdout.
#[derive(Debug, Parser)]
#[command(name = "snippet-runner", version)]
pub struct Args {
    /// Artifact to evaluate
    #[arg(long = "code-file")]
    pub code_file: PathBuf,

    /// Frame budget passed to the shim (0 means default)
    #[arg(long, default_value_t = DEFAULT_FRAME_BUDGET)]
    pub frames: u32,

    /// Hard kill deadline for the shim (0 means default)
    #[arg(long = "timeout-ms", default_value_t = DEFAULT_TIMEOUT_MS)]
    pub timeout_ms: u64,

    /// Shim program
    #[arg(long, env = "SNIPPET_RUNNER_SHIM", default_value = DEFAULT_SHIM_PROGRAM)]
    pub shim: String,

    /// Arguments placed before `--code-file`; an empty value is dropped
    #[arg(
        long = "shim-arg",
        env = "SNIPPET_RUNNER_SHIM_ARGS",
        value_delimiter = ',',
        allow_hyphen_values = true,
        default_value = DEFAULT_SHIM_SCRIPT
    )]
    pub shim_args: Vec<String>,

    /// Per-stream cap on captured stdout/stderr
    #[arg(long = "max-buffer-bytes", default_value_t = DEFAULT_MAX_BUFFER_BYTES)]
    pub max_buffer_bytes: usize,

    #[arg(long)]
    pub pretty: bool,
}

impl Args {
    pub fn config(&self) -> RunnerConfig {
        let shim = ShimCommand::new(
            &self.shim,
            self.shim_args.iter().filter(|arg| !arg.is_empty()),
        );
        RunnerConfig::new(shim).with_max_buffer_bytes(self.max_buffer_bytes)
    }

    pub fn request(&self) -> EvaluationRequest {
        EvaluationRequest::new(&self.code_file, Some(self.frames), Some(self.timeout_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["snippet-runner", "--code-file", "a.js"]).unwrap();

        let request = args.request();
        assert_eq!(request.artifact_path, PathBuf::from("a.js"));
        assert_eq!(request.frame_budget, 60);
        assert_eq!(request.timeout_ms, 1500);
        assert!(!args.pretty);

        let config = args.config();
        assert_eq!(config.shim.program, "node");
        assert_eq!(config.shim.args, vec![OsString::from("runtime_shim.js")]);
        assert_eq!(config.max_buffer_bytes, DEFAULT_MAX_BUFFER_BYTES);
    }

    #[test]
    fn test_overrides() {
        let args = Args::try_parse_from([
            "snippet-runner",
            "--code-file",
            "b.js",
            "--frames",
            "0",
            "--timeout-ms",
            "250",
            "--shim",
            "/usr/bin/deno",
            "--shim-arg",
            "run",
            "--shim-arg",
            "--allow-read,shim.ts",
            "--max-buffer-bytes",
            "4096",
            "--pretty",
        ])
        .unwrap();

        let request = args.request();
        assert_eq!(request.frame_budget, 60);
        assert_eq!(request.timeout_ms, 250);

        let config = args.config();
        assert_eq!(config.shim.program, "/usr/bin/deno");
        assert_eq!(
            config.shim.args,
            vec![
                OsString::from("run"),
                OsString::from("--allow-read"),
                OsString::from("shim.ts")
            ]
        );
        assert_eq!(config.max_buffer_bytes, 4096);
        assert!(args.pretty);
    }

    #[test]
    fn test_empty_shim_arg_means_none() {
        let args = Args::try_parse_from([
            "snippet-runner",
            "--code-file",
            "c.js",
            "--shim",
            "./shim",
            "--shim-arg",
            "",
        ])
        .unwrap();

        assert!(args.config().shim.args.is_empty());
    }

    #[test]
    fn test_code_file_is_required() {
        assert!(Args::try_parse_from(["snippet-runner"]).is_err());
    }
}
