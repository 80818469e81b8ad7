//! Core domain model and in-memory state for the ForgeMind orchestrator.
//!
//! The state containers ([`task_store::TaskStore`],
//! [`agent_tracker::AgentTracker`], [`log_sink::LogSink`],
//! [`activity::ActivityFeed`]) are cheap to clone and share one
//! [`event_bus::EventBus`], which is how the presentation layer observes
//! pipeline progress.

pub mod activity;
pub mod agent_tracker;
pub mod config;
pub mod event_bus;
pub mod log_sink;
pub mod task_store;
pub mod types;
