//! Supervisor loop: drives the log multiplexer in the calling task while the
//! three pumps run, collects the first error, and waits for the child.
use std::time::Instant;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::task::{JoinError, JoinHandle};

use crate::config::TranscriptConfig;
use crate::error::RunnerError;

use super::io_pump;
use super::traits::RunnerSession;
use super::transcript::LogMultiplexer;
use super::types::{PumpStats, RunPhase, RunnerResult};

pub struct RunSessionRuntimeInput<'a> {
    pub session: Box<dyn RunnerSession>,
    pub input: Box<dyn AsyncRead + Unpin + Send>,
    pub output: Box<dyn AsyncWrite + Unpin + Send>,
    pub error: Box<dyn AsyncWrite + Unpin + Send>,
    pub transcript: Box<dyn AsyncWrite + Unpin + Send>,
    pub transcript_cfg: &'a TranscriptConfig,
    pub run_id: &'a str,
}

struct PhaseTracker<'a> {
    run_id: &'a str,
    current: RunPhase,
}

impl<'a> PhaseTracker<'a> {
    fn new(run_id: &'a str) -> Self {
        Self {
            run_id,
            current: RunPhase::Created,
        }
    }

    fn advance(&mut self, next: RunPhase) {
        if next <= self.current {
            return;
        }
        tracing::debug!(run_id = %self.run_id, from = ?self.current, to = ?next, "run phase");
        self.current = next;
    }
}

type PumpHandle = JoinHandle<Result<PumpStats, RunnerError>>;

struct Pumps {
    input: PumpHandle,
    output: PumpHandle,
    error: PumpHandle,
}

impl Pumps {
    fn abort_all(&self) {
        self.input.abort();
        self.output.abort();
        self.error.abort();
    }
}

#[derive(Default)]
struct Collected {
    stdin: Option<PumpStats>,
    stdout: Option<PumpStats>,
    stderr: Option<PumpStats>,
    exit_code: Option<i32>,
    input_abandoned: bool,
}

impl Collected {
    fn child_done(&self) -> bool {
        self.exit_code.is_some() && self.stdout.is_some() && self.stderr.is_some()
    }

    fn input_settled(&self) -> bool {
        self.stdin.is_some() || self.input_abandoned
    }
}

fn join_pump(
    task: &'static str,
    res: Result<Result<PumpStats, RunnerError>, JoinError>,
) -> Result<PumpStats, RunnerError> {
    match res {
        Ok(r) => r,
        Err(e) => Err(RunnerError::Task {
            task,
            message: e.to_string(),
        }),
    }
}

pub async fn run_session_runtime(
    input: RunSessionRuntimeInput<'_>,
) -> Result<RunnerResult, RunnerError> {
    let RunSessionRuntimeInput {
        mut session,
        input: source,
        output,
        error,
        transcript,
        transcript_cfg,
        run_id,
    } = input;

    let started_at = Instant::now();
    let mut phase = PhaseTracker::new(run_id);

    let child_stdin = session
        .stdin()
        .ok_or_else(|| RunnerError::Spawn("no stdin".into()))?;
    let child_stdout = session
        .stdout()
        .ok_or_else(|| RunnerError::Spawn("no stdout".into()))?;
    let child_stderr = session
        .stderr()
        .ok_or_else(|| RunnerError::Spawn("no stderr".into()))?;
    phase.advance(RunPhase::Started);

    let (mut mux, events) = LogMultiplexer::new(transcript, transcript_cfg)?;
    let mut pumps = Pumps {
        input: io_pump::pump_input(source, child_stdin, events.clone()),
        output: io_pump::pump_stdout(child_stdout, output, events.clone()),
        error: io_pump::pump_stderr(child_stderr, error, events),
    };
    phase.advance(RunPhase::Piping);

    let collected = match drive(&mut mux, &mut pumps, session.as_mut(), &mut phase).await {
        Ok(c) => c,
        Err(e) => {
            phase.advance(RunPhase::Aborted);
            tracing::error!(error.kind = "run.aborted", error.message = %e, run_id = %run_id);
            pumps.abort_all();
            return Err(e);
        }
    };

    let transcript_entries = mux.entries();
    mux.finish().await?;
    phase.advance(RunPhase::Done);

    Ok(RunnerResult {
        run_id: run_id.to_string(),
        exit_code: collected.exit_code.unwrap_or(1),
        duration_ms: RunnerResult::duration_from(started_at.elapsed()),
        stdin: collected.stdin.unwrap_or_default(),
        stdout: collected.stdout.unwrap_or_default(),
        stderr: collected.stderr.unwrap_or_default(),
        transcript_entries,
        input_abandoned: collected.input_abandoned,
    })
}

async fn drive<W>(
    mux: &mut LogMultiplexer<W>,
    pumps: &mut Pumps,
    session: &mut dyn RunnerSession,
    phase: &mut PhaseTracker<'_>,
) -> Result<Collected, RunnerError>
where
    W: AsyncWrite + Unpin,
{
    let mut c = Collected::default();
    let mut events_open = true;

    let wait_fut = session.wait();
    tokio::pin!(wait_fut);

    loop {
        // The child and both of its streams are gone; a line still arriving on
        // our stdin has nowhere to go.
        if c.child_done() && !c.input_settled() {
            if !pumps.input.is_finished() {
                pumps.input.abort();
            }
            // A pump that finished (or failed) before the abort still reports here.
            match (&mut pumps.input).await {
                Err(e) if e.is_cancelled() => {
                    tracing::debug!(
                        "child finished before stdin was exhausted; dropped input pump"
                    );
                    c.input_abandoned = true;
                }
                res => {
                    c.stdin = Some(join_pump("stdin", res)?);
                    phase.advance(RunPhase::InputClosed);
                }
            }
        }
        if !events_open && c.child_done() && c.input_settled() {
            return Ok(c);
        }

        tokio::select! {
            ev = mux.recv(), if events_open => match ev {
                Some(ev) => mux.record(&ev).await?,
                None => events_open = false,
            },

            res = &mut pumps.input, if !c.input_settled() => {
                c.stdin = Some(join_pump("stdin", res)?);
                phase.advance(RunPhase::InputClosed);
                if c.stdout.is_none() || c.stderr.is_none() {
                    phase.advance(RunPhase::Draining);
                }
            }

            res = &mut pumps.output, if c.stdout.is_none() => {
                c.stdout = Some(join_pump("stdout", res)?);
            }

            res = &mut pumps.error, if c.stderr.is_none() => {
                c.stderr = Some(join_pump("stderr", res)?);
            }

            res = &mut wait_fut, if c.exit_code.is_none() => {
                let outcome = res?;
                tracing::debug!(exit_code = outcome.exit_code, "child exited");
                c.exit_code = Some(outcome.exit_code);
                phase.advance(RunPhase::SubprocessExited);
            }
        }
    }
}
