use std::ffi::OsString;
use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser};
use tapline_core::api::{AppConfig, CliError};

/// Run a command and log all stdin, stdout and stderr to a log file, while
/// exposing stdin, stdout and stderr transparently.
#[derive(Parser, Debug)]
#[command(name = "tapline", version)]
pub struct Args {
    /// Command to run under the proxy (executed by `<shell> -c`).
    #[arg(long = "cmd", value_name = "COMMAND")]
    pub cmd: Option<String>,

    /// Path to log file. Truncated if it exists.
    #[arg(long = "log-path", visible_alias = "logPath", value_name = "PATH")]
    pub log_path: Option<PathBuf>,

    /// Command interpreter used to run COMMAND.
    #[arg(long)]
    pub shell: Option<String>,

    /// Exit with the command's exit code instead of 0.
    #[arg(long)]
    pub propagate_exit_code: bool,
}

/// Long flags that also accept the single-dash spelling (`-cmd`, `-logPath`).
const LEGACY_LONG_FLAGS: &[&str] = &[
    "cmd",
    "log-path",
    "logPath",
    "shell",
    "propagate-exit-code",
];
const VALUE_FLAGS: &[&str] = &["cmd", "log-path", "logPath", "shell"];

impl Args {
    pub fn parse_from_env() -> Self {
        Self::parse_from(normalize_legacy_flags(std::env::args_os()))
    }

    /// Both required flags, or a usage error carrying the help text.
    pub fn required(&self) -> Result<(&str, &Path), CliError> {
        let cmd = self.cmd.as_deref().filter(|s| !s.is_empty());
        let log_path = self
            .log_path
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty());
        match (cmd, log_path) {
            (Some(cmd), Some(log_path)) => Ok((cmd, log_path)),
            (None, _) => Err(usage_error("--cmd")),
            (_, None) => Err(usage_error("--log-path")),
        }
    }

    pub fn apply_to(&self, cfg: &mut AppConfig) {
        if let Some(shell) = self.shell.as_deref().filter(|s| !s.trim().is_empty()) {
            cfg.runner.shell = shell.to_string();
        }
        if self.propagate_exit_code {
            cfg.runner.propagate_exit_code = true;
        }
    }
}

fn usage_error(missing: &str) -> CliError {
    let help = Args::command().render_help();
    CliError::Usage(format!("missing required flag {missing}\n\n{help}"))
}

/// Rewrites `-cmd`, `-logPath=x` and friends to their `--` form so the
/// single-dash spellings keep working. Values following a flag and
/// everything after `--` are left alone.
pub fn normalize_legacy_flags<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    let mut out = Vec::new();
    let mut iter = args.into_iter();
    if let Some(program) = iter.next() {
        out.push(program);
    }

    let mut expect_value = false;
    let mut passthrough = false;
    for arg in iter {
        if passthrough || expect_value {
            expect_value = false;
            out.push(arg);
            continue;
        }
        let Some(s) = arg.to_str() else {
            out.push(arg);
            continue;
        };
        if s == "--" {
            passthrough = true;
            out.push(arg);
            continue;
        }

        let name = s
            .strip_prefix("--")
            .or_else(|| s.strip_prefix('-'))
            .unwrap_or("");
        let (flag, inline_value) = match name.split_once('=') {
            Some((flag, _)) => (flag, true),
            None => (name, false),
        };
        if !LEGACY_LONG_FLAGS.contains(&flag) {
            out.push(arg);
            continue;
        }

        expect_value = VALUE_FLAGS.contains(&flag) && !inline_value;
        out.push(OsString::from(format!("--{name}")));
    }
    out
}
