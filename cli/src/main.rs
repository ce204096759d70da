use tapline::commands::cli;
use tapline_core::api::{run_command, CliError, RunCommandArgs, RunnerError};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

static LOG_GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
    std::sync::OnceLock::new();

#[tokio::main]
async fn main() {
    let exit = match real_main().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{e}");
            exit_code_for_error(&e)
        }
    };

    // Don't wait on the blocking stdin reader during runtime shutdown.
    std::process::exit(exit);
}

async fn real_main() -> Result<i32, CliError> {
    let args = cli::Args::parse_from_env();
    let (command, log_path) = args.required()?;

    let mut cfg =
        tapline_core::config::load_default().map_err(|e| CliError::Config(e.to_string()))?;
    args.apply_to(&mut cfg);
    init_tracing(&cfg.logging).map_err(CliError::Config)?;

    let result = run_command(RunCommandArgs::with_process_stdio(command, log_path, &cfg)).await?;
    if result.input_abandoned {
        tracing::debug!("stdin still open when the command finished");
    }

    if cfg.runner.propagate_exit_code {
        Ok(result.exit_code)
    } else {
        Ok(0)
    }
}

fn exit_code_for_error(e: &CliError) -> i32 {
    // 1: usage
    // 11: config error
    // 20: log file / spawn / stream IO error
    // 50: internal/uncategorized
    match e {
        CliError::Usage(_) => 1,
        CliError::Config(_) => 11,
        CliError::Runner(re) => match re {
            RunnerError::Config(_) => 11,
            RunnerError::Spawn(_) => 20,
            RunnerError::StreamIo { .. } => 20,
            RunnerError::LogFile { .. } => 20,
            RunnerError::Transcript(_) => 20,
            RunnerError::Task { .. } => 50,
            RunnerError::Plugin(_) => 50,
        },
    }
}

fn init_tracing(logging: &tapline_core::config::LoggingConfig) -> Result<(), String> {
    if !logging.enabled {
        return Ok(());
    }

    let filter = match std::env::var("RUST_LOG") {
        Ok(v) if !v.trim().is_empty() => EnvFilter::from_default_env(),
        _ => EnvFilter::try_new(logging.level.clone()).map_err(|e| e.to_string())?,
    };

    let mut maybe_writer = None;

    if logging.file {
        let dir = match logging
            .directory
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            Some(d) => std::path::PathBuf::from(d),
            None => std::env::temp_dir().join("tapline"),
        };

        std::fs::create_dir_all(&dir).map_err(|e| format!("create log dir failed: {e}"))?;
        let file_name = format!("tapline.{}.log", std::process::id());
        let appender = tracing_appender::rolling::never(dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);
        let _ = LOG_GUARD.set(guard);
        maybe_writer = Some(non_blocking);
    }

    if !logging.console && maybe_writer.is_none() {
        return Ok(());
    }

    // Console output lands between the child's relayed stderr lines, so keep
    // each record to one short, clearly prefixed line.
    let console_layer = logging.console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(atty::is(atty::Stream::Stderr))
            .with_target(false)
            .without_time()
            .compact()
    });

    let file_layer = maybe_writer.map(|w| {
        tracing_subscriber::fmt::layer()
            .with_writer(w)
            .with_ansi(false)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    if logging.console {
        tracing::debug!(
            level = %logging.level,
            "console logging shares stderr with the relayed command"
        );
    }
    Ok(())
}
