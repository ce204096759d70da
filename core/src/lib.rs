//! Relay a shell command's stdin, stdout and stderr while recording a
//! timestamped, interleaved transcript of all three.

pub mod api;
pub mod config;
pub mod error;
pub mod runner;
