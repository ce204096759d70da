use std::path::Path;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::Instrument;

use crate::config::AppConfig;
use crate::error::RunnerError;

use super::runtime;
use super::shell::ShellRunnerPlugin;
use super::traits::{RunnerPlugin, RunnerSession};
use super::types::{RunnerResult, RunnerStartArgs};

pub struct RunSessionArgs<'a> {
    pub session: Box<dyn RunnerSession>,
    pub input: Box<dyn AsyncRead + Unpin + Send>,
    pub output: Box<dyn AsyncWrite + Unpin + Send>,
    pub error: Box<dyn AsyncWrite + Unpin + Send>,
    pub transcript: Box<dyn AsyncWrite + Unpin + Send>,
    pub cfg: &'a AppConfig,
    pub run_id: &'a str,
}

pub async fn run_session(args: RunSessionArgs<'_>) -> Result<RunnerResult, RunnerError> {
    runtime::run_session_runtime(runtime::RunSessionRuntimeInput {
        session: args.session,
        input: args.input,
        output: args.output,
        error: args.error,
        transcript: args.transcript,
        transcript_cfg: &args.cfg.transcript,
        run_id: args.run_id,
    })
    .await
}

pub struct RunCommandArgs<'a> {
    pub command: &'a str,
    pub log_path: &'a Path,
    pub cfg: &'a AppConfig,
    pub input: Box<dyn AsyncRead + Unpin + Send>,
    pub output: Box<dyn AsyncWrite + Unpin + Send>,
    pub error: Box<dyn AsyncWrite + Unpin + Send>,
}

impl<'a> RunCommandArgs<'a> {
    /// Relay through this process's own stdin/stdout/stderr.
    pub fn with_process_stdio(command: &'a str, log_path: &'a Path, cfg: &'a AppConfig) -> Self {
        Self {
            command,
            log_path,
            cfg,
            input: Box::new(tokio::io::stdin()),
            output: Box::new(tokio::io::stdout()),
            error: Box::new(tokio::io::stderr()),
        }
    }
}

/// Creates (truncating) the transcript file, starts `command` through the
/// configured shell and relays until the child and its streams are done.
/// Config is checked first, then the log file is created, then the child spawned.
pub async fn run_command(args: RunCommandArgs<'_>) -> Result<RunnerResult, RunnerError> {
    let run_id = uuid::Uuid::new_v4().to_string();
    let span = tracing::info_span!("run", run_id = %run_id);

    async move {
        args.cfg.transcript.validate()?;

        let transcript = tokio::fs::File::create(args.log_path)
            .await
            .map_err(|source| RunnerError::LogFile {
                path: args.log_path.display().to_string(),
                source,
            })?;

        let start = RunnerStartArgs {
            command: args.command.to_string(),
            shell: args.cfg.runner.shell.clone(),
            shell_arg: args.cfg.runner.shell_arg.clone(),
        };
        let runner = ShellRunnerPlugin::new();
        let session = runner
            .start_session(&start)
            .await
            .map_err(|e| RunnerError::Spawn(format!("{} ({})", e, runner.name())))?;

        let result = run_session(RunSessionArgs {
            session,
            input: args.input,
            output: args.output,
            error: args.error,
            transcript: Box::new(transcript),
            cfg: args.cfg,
            run_id: &run_id,
        })
        .await?;

        tracing::info!(
            exit_code = result.exit_code,
            duration_ms = result.duration_ms,
            entries = result.transcript_entries,
            "run finished"
        );
        Ok(result)
    }
    .instrument(span)
    .await
}
