//! Log multiplexer: the single writer of the transcript file.
//!
//! Pumps hold an [`EventSender`]; the [`LogMultiplexer`] owns the queue and
//! appends one entry per dequeued event, stamped with the time it was
//! dequeued.
use chrono::{DateTime, Local};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use crate::config::TranscriptConfig;
use crate::error::RunnerError;

use super::types::LogEvent;

#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<LogEvent>,
}

impl EventSender {
    /// Returns false once the multiplexer is gone.
    pub fn send(&self, event: LogEvent) -> bool {
        self.tx.send(event).is_ok()
    }
}

pub(crate) fn event_channel() -> (EventSender, mpsc::UnboundedReceiver<LogEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSender { tx }, rx)
}

/// `<timestamp> <marker> <line>\n`
pub fn format_entry(ts: &DateTime<Local>, timestamp_format: &str, event: &LogEvent) -> Vec<u8> {
    let stamp = ts.format(timestamp_format).to_string();
    let mut entry = Vec::with_capacity(stamp.len() + event.line.len() + 4);
    entry.extend_from_slice(stamp.as_bytes());
    entry.push(b' ');
    entry.push(event.tag.marker());
    entry.push(b' ');
    entry.extend_from_slice(&event.line);
    entry.push(b'\n');
    entry
}

pub struct LogMultiplexer<W> {
    rx: mpsc::UnboundedReceiver<LogEvent>,
    sink: W,
    timestamp_format: String,
    flush_each_entry: bool,
    entries: u64,
}

impl<W> LogMultiplexer<W>
where
    W: AsyncWrite + Unpin,
{
    pub fn new(sink: W, cfg: &TranscriptConfig) -> Result<(Self, EventSender), RunnerError> {
        cfg.validate()?;
        let (events, rx) = event_channel();
        Ok((
            Self {
                rx,
                sink,
                timestamp_format: cfg.timestamp_format.clone(),
                flush_each_entry: cfg.flush_each_entry,
                entries: 0,
            },
            events,
        ))
    }

    /// Next queued event; `None` once every sender is dropped and the queue is empty.
    /// Cancel safe.
    pub async fn recv(&mut self) -> Option<LogEvent> {
        self.rx.recv().await
    }

    pub async fn record(&mut self, event: &LogEvent) -> Result<(), RunnerError> {
        self.record_at(&Local::now(), event).await
    }

    pub async fn record_at(
        &mut self,
        ts: &DateTime<Local>,
        event: &LogEvent,
    ) -> Result<(), RunnerError> {
        let entry = format_entry(ts, &self.timestamp_format, event);
        self.sink
            .write_all(&entry)
            .await
            .map_err(RunnerError::Transcript)?;
        if self.flush_each_entry {
            self.sink.flush().await.map_err(RunnerError::Transcript)?;
        }
        self.entries += 1;
        tracing::trace!(stream = event.tag.label(), bytes = event.line.len(), "entry recorded");
        Ok(())
    }

    pub fn entries(&self) -> u64 {
        self.entries
    }

    /// Records everything until all senders are gone.
    pub async fn run(mut self) -> Result<(u64, W), RunnerError> {
        while let Some(event) = self.recv().await {
            self.record(&event).await?;
        }
        self.finish().await
    }

    pub async fn finish(mut self) -> Result<(u64, W), RunnerError> {
        self.sink.flush().await.map_err(RunnerError::Transcript)?;
        Ok((self.entries, self.sink))
    }
}
