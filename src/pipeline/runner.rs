//! Batch driver for processing many notes through the pipeline.
//!
//! The orchestrator handles exactly one note per run; the batch runner
//! iterates a set of notes, catches per-note failures, and keeps going.
//! There is no cross-note state beyond the shared adapters.

use std::time::{Duration, Instant};

use crate::models::{BlogPost, Note};

use super::orchestrator::{BlogPipeline, RunStatus};

/// Outcome of processing one note in a batch.
#[derive(Debug)]
pub struct NoteExecution {
    /// Input note filename.
    pub filename: String,
    /// Whether the run completed.
    pub completed: bool,
    /// Wall-clock processing time for this note.
    pub duration: Duration,
    /// The artifact, when the run completed.
    pub artifact: Option<BlogPost>,
    /// The abort error, when it did not.
    pub error: Option<String>,
}

/// Aggregate statistics for a batch.
#[derive(Debug, Clone, Default)]
pub struct BatchStats {
    pub total: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub average_duration: Duration,
}

impl BatchStats {
    fn record(&mut self, completed: bool, duration: Duration) {
        self.total += 1;
        if completed {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }

        // Incremental average: avg = avg + (new - avg) / n
        let n = self.total as f64;
        let old_avg = self.average_duration.as_secs_f64();
        let new_avg = old_avg + (duration.as_secs_f64() - old_avg) / n;
        self.average_duration = Duration::from_secs_f64(new_avg);
    }
}

/// Drives a batch of notes through one pipeline instance.
pub struct BatchRunner<'a> {
    pipeline: &'a BlogPipeline,
}

impl<'a> BatchRunner<'a> {
    pub fn new(pipeline: &'a BlogPipeline) -> Self {
        Self { pipeline }
    }

    /// Processes the notes in order, tolerating individual failures.
    pub async fn run_notes(
        &self,
        notes: impl IntoIterator<Item = Note>,
    ) -> (Vec<NoteExecution>, BatchStats) {
        let mut executions = Vec::new();
        let mut stats = BatchStats::default();

        for note in notes {
            let started = Instant::now();
            let run = self
                .pipeline
                .run_tracked(&note.content, &note.filename)
                .await;
            let duration = started.elapsed();
            let completed = run.status == RunStatus::Completed;

            let execution = match run.into_result() {
                Ok(artifact) => {
                    tracing::info!(
                        filename = %note.filename,
                        output = %artifact.filename,
                        "note processed"
                    );
                    NoteExecution {
                        filename: note.filename.clone(),
                        completed,
                        duration,
                        artifact: Some(artifact),
                        error: None,
                    }
                }
                Err(err) => {
                    tracing::error!(filename = %note.filename, error = %err, "note failed");
                    NoteExecution {
                        filename: note.filename.clone(),
                        completed,
                        duration,
                        artifact: None,
                        error: Some(err.to_string()),
                    }
                }
            };

            stats.record(completed, duration);
            executions.push(execution);
        }

        tracing::info!(
            total = stats.total,
            succeeded = stats.succeeded,
            failed = stats.failed,
            "batch processing complete"
        );
        (executions, stats)
    }
}
