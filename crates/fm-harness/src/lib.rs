//! Harness: reliability primitives for calls into external collaborators.
//!
//! - [`retry`]: bounded exponential-backoff retry with an async observer
//!   that reports each failure and each scheduled retry.
//! - [`best_effort`]: fire-and-forget execution whose failures are reported
//!   but never propagated.

pub mod best_effort;
pub mod retry;
