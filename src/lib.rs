//! Runs one untrusted, machine-generated snippet through a runtime shim in a
//! child process and turns whatever happens into a [`RunResult`].
//!
//! [`RunResult`]: crate::core::domain::RunResult

pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
/// Implementations of core traits backed by real OS processes.
pub mod native;
pub mod stubs;

#[cfg(test)]
mod integration_test;
