mod exit;
mod io_pump;
mod run;
mod runtime;
mod shell;
mod transcript;
mod traits;
pub mod types;

pub use exit::normalize_exit;
pub use io_pump::{line_reader, pump_input, pump_stderr, pump_stdout, write_line};
pub use run::{run_command, run_session, RunCommandArgs, RunSessionArgs};
pub use shell::ShellRunnerPlugin;
pub use traits::{RunnerPlugin, RunnerSession};
pub use transcript::{format_entry, EventSender, LogMultiplexer};
pub use types::{
    LogEvent, PumpStats, RunOutcome, RunPhase, RunnerResult, RunnerStartArgs, StreamTag,
};
