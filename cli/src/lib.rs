//! tapline library - exposes the CLI surface for tests.

pub mod commands;
