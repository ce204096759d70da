use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("runner failed: {0}")]
    Runner(#[from] RunnerError),
}

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("config error: {0}")]
    Config(String),
    #[error("spawn failed: {0}")]
    Spawn(String),
    #[error("stream io error: {stream} {source}")]
    StreamIo {
        stream: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot create log file {path}: {source}")]
    LogFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("transcript write failed: {0}")]
    Transcript(#[source] std::io::Error),
    #[error("pump task {task} failed: {message}")]
    Task {
        task: &'static str,
        message: String,
    },
    #[error("plugin error: {0}")]
    Plugin(#[from] anyhow::Error),
}

impl RunnerError {
    pub(crate) fn stream_io(stream: &'static str) -> impl FnOnce(std::io::Error) -> Self {
        move |source| RunnerError::StreamIo { stream, source }
    }
}
