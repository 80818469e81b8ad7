//! Process-wide `tracing` setup for forgemind binaries.
//!
//! Output goes to stderr, human-readable or JSON, filtered by `RUST_LOG`
//! when set and by the configured level otherwise.

pub mod logging;
