pub mod error;
pub mod observer;
pub mod orchestrator;
pub mod pipeline;
pub mod queue;

pub use error::{InitError, IntentError, PipelineError};
pub use orchestrator::{Orchestrator, StartOutcome};
pub use pipeline::{Pipeline, TaskOutcome};
