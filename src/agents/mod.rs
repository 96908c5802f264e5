//! Role workers for the blog pipeline.
//!
//! Each worker owns one domain responsibility and is built from one or
//! more adapter calls plus best-effort parsing of free-form LLM output
//! into structured data. Workers for required content (analysis,
//! research, writing) raise [`crate::error::AgentError`] when their
//! output cannot be produced; imagery and metadata degrade to typed
//! fallbacks instead, since the post can ship without them.

pub mod analyzer;
pub mod imagery;
pub mod metadata;
pub mod researcher;
pub mod writer;

pub use analyzer::ContentAnalyzer;
pub use imagery::ImageCoordinator;
pub use metadata::MetadataBuilder;
pub use researcher::Researcher;
pub use writer::ContentWriter;
