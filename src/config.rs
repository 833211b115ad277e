use std::ffi::OsString;

use crate::constants::{DEFAULT_MAX_BUFFER_BYTES, DEFAULT_SHIM_PROGRAM, DEFAULT_SHIM_SCRIPT};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("shim program must not be empty")]
    EmptyShimProgram,
    #[error("max buffer size must be greater than zero")]
    ZeroBufferLimit,
}

/// Fixed entry point that loads an artifact and reports on it.
///
/// The runner appends `--code-file <path> --frames <n>` after `args`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShimCommand {
    pub program: OsString,
    pub args: Vec<OsString>,
}

impl ShimCommand {
    pub fn new<P, I, A>(program: P, args: I) -> Self
    where
        P: Into<OsString>,
        I: IntoIterator<Item = A>,
        A: Into<OsString>,
    {
        ShimCommand {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl Default for ShimCommand {
    fn default() -> Self {
        ShimCommand::new(DEFAULT_SHIM_PROGRAM, [DEFAULT_SHIM_SCRIPT])
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    pub shim: ShimCommand,
    /// Per-stream cap on captured stdout/stderr bytes.
    pub max_buffer_bytes: usize,
}

impl RunnerConfig {
    pub fn new(shim: ShimCommand) -> Self {
        RunnerConfig {
            shim,
            ..Default::default()
        }
    }

    pub fn with_max_buffer_bytes(self, max_buffer_bytes: usize) -> Self {
        Self {
            max_buffer_bytes,
            ..self
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.shim.program.is_empty() {
            return Err(ConfigError::EmptyShimProgram);
        }
        if self.max_buffer_bytes == 0 {
            return Err(ConfigError::ZeroBufferLimit);
        }
        Ok(())
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        RunnerConfig {
            shim: ShimCommand::default(),
            max_buffer_bytes: DEFAULT_MAX_BUFFER_BYTES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = RunnerConfig::default();

        assert_eq!(config.shim.program, "node");
        assert_eq!(config.shim.args, vec![OsString::from("runtime_shim.js")]);
        assert_eq!(config.max_buffer_bytes, 10 * 1024 * 1024);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_validate_rejects_empty_program() {
        let config = RunnerConfig::new(ShimCommand::new("", Vec::<String>::new()));

        assert_eq!(config.validate(), Err(ConfigError::EmptyShimProgram));
    }

    #[test]
    fn test_validate_rejects_zero_buffer() {
        let config = RunnerConfig::default().with_max_buffer_bytes(0);

        assert_eq!(config.validate(), Err(ConfigError::ZeroBufferLimit));
    }
}
