//! Stable re-exports for consumers (`cli` and external crates).
//!
//! Prefer importing from `tapline_core::api` instead of reaching into internal modules.

pub use crate::config::{
    load_default, load_from_path, AppConfig, LoggingConfig, RunnerConfig, TranscriptConfig,
};
pub use crate::error::{CliError, RunnerError};
pub use crate::runner::{
    run_command, run_session, LogEvent, LogMultiplexer, PumpStats, RunCommandArgs,
    RunSessionArgs, RunnerPlugin, RunnerResult, RunnerSession, RunnerStartArgs,
    ShellRunnerPlugin, StreamTag,
};
