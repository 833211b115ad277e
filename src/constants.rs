use std::time::Duration;

pub const DEFAULT_FRAME_BUDGET: u32 = 60;
pub const DEFAULT_TIMEOUT_MS: u64 = 1500;
pub const DEFAULT_MAX_BUFFER_BYTES: usize = 10 * 1024 * 1024;

pub const DEFAULT_SHIM_PROGRAM: &str = "node";
pub const DEFAULT_SHIM_SCRIPT: &str = "runtime_shim.js";

/// Upper bound on the raw stdout copy attached to a malformed-output result.
pub const RAW_OUTPUT_PREVIEW_CHARS: usize = 2000;

/// How long pipes may stay open after the shim itself exited
/// (e.g. inherited by a grandchild) before capture stops.
pub const DRAIN_GRACE: Duration = Duration::from_millis(250);

pub const READ_CHUNK_BYTES: usize = 8 * 1024;

pub const ERR_RUNTIME_TIMEOUT: &str = "runtime_timeout";
pub const ERR_RUNTIME_EXEC: &str = "runtime_exec_error";
pub const ERR_EMPTY_OUTPUT: &str = "empty_runtime_output";
pub const ERR_OUTPUT_NOT_JSON: &str = "runtime_output_not_json";
pub const ERR_REPORTED_FAILURE: &str = "runtime_reported_failure";
