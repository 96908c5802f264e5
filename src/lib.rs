//! blogforge: notes-to-blog pipeline built on LLM, image, and search APIs.
//!
//! This library runs a fixed 15-step workflow that turns a raw text note
//! into a publishable blog post. The interesting machinery is the
//! [`pipeline`] orchestrator and the external-call resilience layer in
//! [`limits`] and [`services`]; the [`agents`] wrap prompt construction
//! and best-effort response parsing per role.

// Core modules
pub mod agents;
pub mod cli;
pub mod config;
pub mod error;
pub mod limits;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{AgentError, ConfigError, ModelError};
pub use models::{BlogPost, Note};
pub use pipeline::{BlogPipeline, PipelineError, PipelineRun};
