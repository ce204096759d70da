use futures::{Stream, TryStreamExt};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::task::JoinHandle;

use crate::error::RunnerError;

use super::transcript::EventSender;
use super::types::{LogEvent, PumpStats, StreamTag};

const READ_BUF_BYTES: usize = 16 * 1024;

/// Lazy sequence of lines read from `rd`. The `\n` delimiter (and a `\r`
/// right before it) is stripped. A trailing segment without a delimiter is
/// yielded as the last line.
pub fn line_reader<R>(rd: R) -> impl Stream<Item = std::io::Result<Vec<u8>>>
where
    R: AsyncRead + Unpin,
{
    let reader = BufReader::with_capacity(READ_BUF_BYTES, rd);
    futures::stream::try_unfold(reader, |mut reader| async move {
        let next = read_line(&mut reader).await;
        next.map(|line| line.map(|line| (line, reader)))
    })
}

async fn read_line<R>(reader: &mut BufReader<R>) -> std::io::Result<Option<Vec<u8>>>
where
    R: AsyncRead + Unpin,
{
    let mut line = Vec::new();
    if reader.read_until(b'\n', &mut line).await? == 0 {
        return Ok(None);
    }
    trim_newline(&mut line);
    Ok(Some(line))
}

fn trim_newline(buf: &mut Vec<u8>) {
    if buf.last() == Some(&b'\n') {
        buf.pop();
    }
    if buf.last() == Some(&b'\r') {
        buf.pop();
    }
}

/// Writes `line` plus a single `\n` and flushes.
pub async fn write_line<W>(wr: &mut W, line: &[u8]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    wr.write_all(line).await?;
    wr.write_all(b"\n").await?;
    wr.flush().await
}

/// Our stdin -> child stdin. The child's stdin is closed once `rd` is exhausted.
pub fn pump_input<R, W>(rd: R, wr: W, events: EventSender) -> JoinHandle<Result<PumpStats, RunnerError>>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    pump(rd, wr, StreamTag::Input, "child stdin", events)
}

/// Child stdout -> `wr` (normally our stdout).
pub fn pump_stdout<R, W>(rd: R, wr: W, events: EventSender) -> JoinHandle<Result<PumpStats, RunnerError>>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    pump(rd, wr, StreamTag::Output, "stdout", events)
}

/// Child stderr -> `wr` (normally our stderr).
pub fn pump_stderr<R, W>(rd: R, wr: W, events: EventSender) -> JoinHandle<Result<PumpStats, RunnerError>>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    pump(rd, wr, StreamTag::Error, "stderr", events)
}

fn pump<R, W>(
    rd: R,
    mut wr: W,
    tag: StreamTag,
    sink: &'static str,
    events: EventSender,
) -> JoinHandle<Result<PumpStats, RunnerError>>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let source = match tag {
            StreamTag::Input => "stdin",
            StreamTag::Output => "child stdout",
            StreamTag::Error => "child stderr",
        };
        let lines = line_reader(rd);
        tokio::pin!(lines);

        let mut stats = PumpStats::default();
        let mut unlogged_warned = false;
        while let Some(line) = lines
            .try_next()
            .await
            .map_err(RunnerError::stream_io(source))?
        {
            stats.lines += 1;
            stats.bytes += line.len() as u64;

            // Log before forwarding: an echo of this line can't be dequeued ahead of it.
            let logged = events.send(LogEvent {
                tag,
                line: line.clone(),
            });
            if !logged && !unlogged_warned {
                tracing::warn!(
                    stream = tag.label(),
                    "transcript closed; lines are relayed but not logged"
                );
                unlogged_warned = true;
            }
            write_line(&mut wr, &line)
                .await
                .map_err(RunnerError::stream_io(sink))?;
        }

        drop(wr);
        tracing::debug!(
            stream = tag.label(),
            lines = stats.lines,
            bytes = stats.bytes,
            "pump finished"
        );
        Ok(stats)
    })
}
