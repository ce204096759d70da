#![allow(dead_code)]

use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use tapline_core::config::AppConfig;
use tokio::io::AsyncWrite;

/// Width of a `%b %e %H:%M:%S%.3f` timestamp.
const STAMP_LEN: usize = 19;

#[derive(Clone, Default)]
pub struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    pub fn contents(&self) -> Vec<u8> {
        self.0.lock().unwrap().clone()
    }
}

impl AsyncWrite for SharedBuf {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

/// Splits a transcript into `(marker, payload)` pairs, checking the timestamp shape.
pub fn parse_transcript(raw: &[u8]) -> Vec<(char, Vec<u8>)> {
    let mut entries = Vec::new();
    let body = raw.strip_suffix(b"\n").unwrap_or(raw);
    if body.is_empty() {
        return entries;
    }
    for entry in body.split(|&b| b == b'\n') {
        assert!(entry.len() >= STAMP_LEN + 3, "short entry: {:?}", entry);
        let stamp = std::str::from_utf8(&entry[..STAMP_LEN]).unwrap();
        assert_eq!(&stamp[15..16], ".", "no millis in {stamp:?}");
        assert_eq!(entry[STAMP_LEN], b' ');
        assert_eq!(entry[STAMP_LEN + 2], b' ');
        entries.push((entry[STAMP_LEN + 1] as char, entry[STAMP_LEN + 3..].to_vec()));
    }
    entries
}

pub fn payloads(entries: &[(char, Vec<u8>)], marker: char) -> Vec<Vec<u8>> {
    entries
        .iter()
        .filter(|(m, _)| *m == marker)
        .map(|(_, p)| p.clone())
        .collect()
}

pub fn lines(items: &[&str]) -> Vec<Vec<u8>> {
    items.iter().map(|s| s.as_bytes().to_vec()).collect()
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("tapline_core=debug"))
        .with_test_writer()
        .try_init();
}

pub fn test_config() -> AppConfig {
    AppConfig::default()
}
