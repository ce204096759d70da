use std::time::Duration;

/// Origin of a relayed line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamTag {
    /// Read from our stdin, sent to the child.
    Input,
    /// Read from the child's stdout.
    Output,
    /// Read from the child's stderr.
    Error,
}

impl StreamTag {
    /// Single-character transcript marker.
    pub fn marker(self) -> u8 {
        match self {
            StreamTag::Input => b'>',
            StreamTag::Output => b'<',
            StreamTag::Error => b'E',
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StreamTag::Input => "stdin",
            StreamTag::Output => "stdout",
            StreamTag::Error => "stderr",
        }
    }
}

/// One line read from one of the three streams, delimiter stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    pub tag: StreamTag,
    pub line: Vec<u8>,
}

/// Lifecycle of one run. Declaration order is the only allowed direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RunPhase {
    Created,
    Started,
    Piping,
    InputClosed,
    Draining,
    SubprocessExited,
    Done,
    Aborted,
}

#[derive(Debug, Clone)]
pub struct RunnerStartArgs {
    pub command: String,
    pub shell: String,
    pub shell_arg: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PumpStats {
    pub lines: u64,
    pub bytes: u64,
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub exit_code: i32,
}

#[derive(Debug, Clone)]
pub struct RunnerResult {
    pub run_id: String,
    pub exit_code: i32,
    pub duration_ms: u64,
    pub stdin: PumpStats,
    pub stdout: PumpStats,
    pub stderr: PumpStats,
    pub transcript_entries: u64,
    /// Input pump was still blocked on its source when the child went away.
    pub input_abandoned: bool,
}

impl RunnerResult {
    pub(crate) fn duration_from(elapsed: Duration) -> u64 {
        u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
    }
}
