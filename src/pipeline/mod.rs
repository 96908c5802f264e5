//! Blog creation pipeline.
//!
//! [`orchestrator`] sequences the fixed 15-step workflow for one note;
//! [`runner`] drives batches of notes, tolerating per-note failures.

pub mod orchestrator;
pub mod runner;

pub use orchestrator::{
    BlogPipeline, PipelineError, PipelineRun, RunStatus, StepRecord, StepStatus, STEP_NAMES,
};
pub use runner::{BatchRunner, BatchStats, NoteExecution};
