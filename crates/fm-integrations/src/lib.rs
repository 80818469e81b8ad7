//! External collaborators of the orchestrator.
//!
//! Each integration is an async trait in [`collaborators`]; the pipeline
//! only sees the [`Collaborators`] bundle. [`simulated`] provides stand-ins
//! that wait a configurable latency and answer with canned or random data.

pub mod collaborators;
pub mod error;
pub mod generation;
pub mod rng;
pub mod simulated;

pub use collaborators::Collaborators;
pub use error::{IntegrationError, Result};
pub use generation::Generated;
