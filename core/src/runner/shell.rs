use anyhow::Result;
use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::process::{Child, Command};

use super::exit::normalize_exit;
use super::traits::{RunnerPlugin, RunnerSession};
use super::types::{RunOutcome, RunnerStartArgs};

/// Runs the command string through a command interpreter so pipes and
/// redirections in it work.
pub struct ShellRunnerPlugin {}

impl ShellRunnerPlugin {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for ShellRunnerPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RunnerPlugin for ShellRunnerPlugin {
    fn name(&self) -> &str {
        "shell"
    }

    async fn start_session(&self, args: &RunnerStartArgs) -> Result<Box<dyn RunnerSession>> {
        let child = Command::new(&args.shell)
            .arg(&args.shell_arg)
            .arg(&args.command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| anyhow::anyhow!("{}: {}", args.shell, e))?;

        tracing::debug!(shell = %args.shell, pid = ?child.id(), "child started");
        Ok(Box::new(ShellRunnerSession { child }))
    }
}

struct ShellRunnerSession {
    child: Child,
}

#[async_trait]
impl RunnerSession for ShellRunnerSession {
    fn stdin(&mut self) -> Option<Box<dyn AsyncWrite + Unpin + Send>> {
        self.child
            .stdin
            .take()
            .map(|s| Box::new(s) as Box<dyn AsyncWrite + Unpin + Send>)
    }

    fn stdout(&mut self) -> Option<Box<dyn AsyncRead + Unpin + Send>> {
        self.child
            .stdout
            .take()
            .map(|s| Box::new(s) as Box<dyn AsyncRead + Unpin + Send>)
    }

    fn stderr(&mut self) -> Option<Box<dyn AsyncRead + Unpin + Send>> {
        self.child
            .stderr
            .take()
            .map(|s| Box::new(s) as Box<dyn AsyncRead + Unpin + Send>)
    }

    async fn wait(&mut self) -> Result<RunOutcome> {
        let status = self.child.wait().await?;
        Ok(RunOutcome {
            exit_code: normalize_exit(status),
        })
    }
}
