//! forgemind operator surface: CLI configuration, the interactive console
//! and plain-text reports over orchestrator snapshots.

pub mod console;
pub mod environment;
pub mod report;
