//! Orchestrator for the fixed 15-step blog creation workflow.
//!
//! A [`PipelineRun`] pre-allocates a `pending` record for each of the 15
//! steps before execution starts. The orchestrator walks them strictly
//! in order, marking each `in_progress` then `completed`, threading step
//! outputs forward through local bindings so a step can only ever read
//! what earlier steps produced. The first failing step marks its record
//! `failed`, aborts the run, and leaves every later record `pending`.
//!
//! Steps that fan out per subheading (research, content expansion) run
//! their subheading tasks concurrently; the shared rate limiter and
//! search cache inside the adapters serialize their own state, so no
//! additional locking is needed here. The orchestrator itself never
//! retries a step - retry policy lives entirely in the adapters.

use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::agents::{ContentAnalyzer, ContentWriter, ImageCoordinator, MetadataBuilder, Researcher};
use crate::config::{AppConfig, ContentConfig};
use crate::error::AgentError;
use crate::models::{
    BlogPost, FrontMatter, Note, ResearchFindings, SectionResearch, Subheading,
};
use crate::services::{
    BraveSearchClient, ImageGenerator, OpenRouterClient, ReplicateClient, TextGenerator,
    WebSearcher,
};

/// The fixed steps of the blog creation workflow, in execution order.
pub const STEP_NAMES: [&str; 15] = [
    "Input Validation",
    "Content Analysis",
    "Title Generation",
    "Description Creation",
    "Subheading Planning",
    "Research Coordination",
    "Content Research",
    "Source Validation",
    "Introduction Writing",
    "Content Expansion",
    "Conclusion Writing",
    "Image Planning",
    "Image Generation",
    "Metadata Creation",
    "Output Generation",
];

/// Error carried by a failed run: the step that failed and its cause.
#[derive(Debug, Clone, Error)]
#[error("pipeline aborted at step {step} ({name}): {source}")]
pub struct PipelineError {
    /// 1-based index of the failed step.
    pub step: usize,
    /// Human name of the failed step.
    pub name: &'static str,
    /// The underlying worker error.
    #[source]
    pub source: AgentError,
}

/// Status of one pipeline step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepStatus::Pending => write!(f, "pending"),
            StepStatus::InProgress => write!(f, "in_progress"),
            StepStatus::Completed => write!(f, "completed"),
            StepStatus::Failed => write!(f, "failed"),
        }
    }
}

/// State of one pipeline step within a run.
#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    /// 1-based step index with fixed meaning.
    pub index: usize,
    /// Human name of the step.
    pub name: &'static str,
    pub status: StepStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Compact, step-defined summary of the captured result.
    pub summary: Option<serde_json::Value>,
    /// Error detail when the step failed.
    pub error: Option<String>,
}

/// Overall status of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

/// One execution of the 15-step workflow for one input note.
///
/// Owned and mutated exclusively by the orchestrator while `Running`;
/// once the status leaves `Running` the run is handed back immutable.
#[derive(Debug)]
pub struct PipelineRun {
    pub id: Uuid,
    /// Input note filename, for logging and reporting.
    pub filename: String,
    pub status: RunStatus,
    /// Records for exactly the 15 fixed steps, pre-allocated as pending.
    pub steps: Vec<StepRecord>,
    /// The final artifact; populated only when step 15 completes.
    pub artifact: Option<BlogPost>,
    /// The abort error; populated only when a step failed.
    pub error: Option<PipelineError>,
}

impl PipelineRun {
    fn new(filename: &str) -> Self {
        let steps = STEP_NAMES
            .iter()
            .copied()
            .enumerate()
            .map(|(i, name)| StepRecord {
                index: i + 1,
                name,
                status: StepStatus::Pending,
                started_at: None,
                finished_at: None,
                summary: None,
                error: None,
            })
            .collect();

        Self {
            id: Uuid::new_v4(),
            filename: filename.to_string(),
            status: RunStatus::Running,
            steps,
            artifact: None,
            error: None,
        }
    }

    /// The record for a 1-based step index.
    pub fn step(&self, index: usize) -> &StepRecord {
        &self.steps[index - 1]
    }

    /// Converts the run into its artifact, or the abort error.
    pub fn into_result(self) -> Result<BlogPost, PipelineError> {
        match self.artifact {
            Some(artifact) => Ok(artifact),
            None => Err(self.error.unwrap_or(PipelineError {
                step: 15,
                name: STEP_NAMES[14],
                source: AgentError::InvalidInput("run produced no artifact".to_string()),
            })),
        }
    }

    fn begin(&mut self, index: usize) {
        let record = &mut self.steps[index - 1];
        record.status = StepStatus::InProgress;
        record.started_at = Some(Utc::now());
        tracing::info!(step = index, name = record.name, "step started");
    }

    fn complete(&mut self, index: usize, summary: serde_json::Value) {
        let record = &mut self.steps[index - 1];
        record.status = StepStatus::Completed;
        record.finished_at = Some(Utc::now());
        record.summary = Some(summary);
        tracing::info!(step = index, name = record.name, "step completed");
    }

    fn fail(&mut self, index: usize, source: AgentError) {
        let record = &mut self.steps[index - 1];
        record.status = StepStatus::Failed;
        record.finished_at = Some(Utc::now());
        record.error = Some(source.to_string());
        tracing::error!(step = index, name = record.name, error = %source, "step failed, aborting run");

        self.status = RunStatus::Failed;
        self.error = Some(PipelineError {
            step: index,
            name: STEP_NAMES[index - 1],
            source,
        });
    }
}

/// Coordinates the role workers through the 15 fixed steps.
///
/// Processes exactly one note per [`run`](Self::run) call and keeps no
/// cross-note state; batch callers catch per-note failures and continue.
pub struct BlogPipeline {
    analyzer: ContentAnalyzer,
    researcher: Researcher,
    writer: ContentWriter,
    imagery: ImageCoordinator,
    metadata: MetadataBuilder,
    content: ContentConfig,
}

impl BlogPipeline {
    /// Builds a pipeline over explicit adapter implementations.
    ///
    /// This is the seam used by tests and by callers that want to swap
    /// an adapter; [`from_config`](Self::from_config) wires up the real
    /// network clients.
    pub fn new(
        config: &AppConfig,
        generator: Arc<dyn TextGenerator>,
        searcher: Arc<dyn WebSearcher>,
        images: Arc<dyn ImageGenerator>,
    ) -> Self {
        Self {
            analyzer: ContentAnalyzer::new(Arc::clone(&generator), config),
            researcher: Researcher::new(Arc::clone(&generator), searcher, config),
            writer: ContentWriter::new(Arc::clone(&generator), config),
            imagery: ImageCoordinator::new(Arc::clone(&generator), images, config),
            metadata: MetadataBuilder::new(generator, config),
            content: config.content.clone(),
        }
    }

    /// Builds a pipeline backed by the real OpenRouter, Brave, and
    /// Replicate adapters.
    pub fn from_config(config: &AppConfig) -> Self {
        let generator: Arc<dyn TextGenerator> = Arc::new(OpenRouterClient::new(config));
        let searcher: Arc<dyn WebSearcher> = Arc::new(BraveSearchClient::new(config));
        let images: Arc<dyn ImageGenerator> = Arc::new(ReplicateClient::new(config));
        Self::new(config, generator, searcher, images)
    }

    /// Runs the 15-step workflow for one note and returns the artifact.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] carrying the failed step index and its
    /// cause; no partial artifact is produced.
    pub async fn run(&self, note_content: &str, filename: &str) -> Result<BlogPost, PipelineError> {
        self.run_tracked(note_content, filename).await.into_result()
    }

    /// Runs the workflow and returns the full [`PipelineRun`] with
    /// per-step records, whether it completed or aborted.
    pub async fn run_tracked(&self, note_content: &str, filename: &str) -> PipelineRun {
        let mut run = PipelineRun::new(filename);
        tracing::info!(run_id = %run.id, filename, "starting blog post pipeline");

        // Step 1: Input Validation
        run.begin(1);
        let note = match Note::new(note_content, filename) {
            Ok(note) => note,
            Err(err) => {
                run.fail(1, AgentError::InvalidInput(err.to_string()));
                return run;
            }
        };
        run.complete(1, json!({ "chars": note.content.len() }));

        // Step 2: Content Analysis
        run.begin(2);
        let analysis = match self.analyzer.analyze(&note).await {
            Ok(analysis) => analysis,
            Err(err) => {
                run.fail(2, err);
                return run;
            }
        };
        run.complete(2, json!({ "subheadings": analysis.subheadings.len() }));

        // Step 3: Title Generation
        run.begin(3);
        let title = analysis.title.trim().to_string();
        if title.is_empty() {
            run.fail(
                3,
                AgentError::UnusableResponse {
                    agent: "content analyzer",
                    message: "analysis produced no title".to_string(),
                },
            );
            return run;
        }
        run.complete(3, json!({ "title": &title }));

        // Step 4: Description Creation
        run.begin(4);
        let description = if analysis.description.trim().is_empty() {
            format!("Notes on {}.", title)
        } else {
            analysis.description.trim().to_string()
        };
        run.complete(4, json!({ "description": &description }));

        // Step 5: Subheading Planning
        run.begin(5);
        let subheadings = self.shape_subheadings(analysis.subheadings);
        run.complete(5, json!({ "subheadings": &subheadings }));

        // Step 6: Research Coordination - research the main topic that
        // anchors every subheading's research.
        run.begin(6);
        let main_research = match self.researcher.research_topic(&title, &note.content).await {
            Ok(findings) => findings,
            Err(err) => {
                run.fail(6, err);
                return run;
            }
        };
        run.complete(6, json!({ "main_sources": main_research.sources.len() }));

        // Step 7: Content Research - one research task per subheading,
        // fanned out concurrently over the shared limiter and cache,
        // then merged with the main-topic context.
        run.begin(7);
        let subheading_research = match try_join_all(
            subheadings
                .iter()
                .map(|subheading| self.researcher.research_subheading(subheading, &title)),
        )
        .await
        {
            Ok(findings) => findings,
            Err(err) => {
                run.fail(7, err);
                return run;
            }
        };
        let combined: Vec<(String, ResearchFindings)> = subheadings
            .iter()
            .zip(subheading_research.iter())
            .map(|(subheading, findings)| {
                (
                    subheading.clone(),
                    self.researcher
                        .combine(&main_research, findings, self.content.dedupe_research),
                )
            })
            .collect();
        run.complete(7, json!({ "sections": combined.len() }));

        // Step 8: Source Validation
        run.begin(8);
        let validated: Vec<SectionResearch> = combined
            .into_iter()
            .map(|(subheading, findings)| {
                let assessments = self.researcher.validate_sources(&findings.sources);
                let citations = self.researcher.generate_citations(&assessments);
                SectionResearch {
                    subheading,
                    findings,
                    assessments,
                    citations,
                }
            })
            .collect();
        let valid_sources: usize = validated
            .iter()
            .map(|section| section.assessments.iter().filter(|a| a.valid).count())
            .sum();
        run.complete(8, json!({ "valid_sources": valid_sources }));

        // Step 9: Introduction Writing
        run.begin(9);
        let introduction = match self.writer.write_introduction(&title, &description).await {
            Ok(text) => text,
            Err(err) => {
                run.fail(9, err);
                return run;
            }
        };
        run.complete(9, json!({ "chars": introduction.len() }));

        // Step 10: Content Expansion - one writing task per subheading,
        // fanned out concurrently.
        run.begin(10);
        let expansions = match try_join_all(validated.iter().map(|section| {
            self.writer
                .expand_subheading(&section.subheading, &section.findings)
        }))
        .await
        {
            Ok(texts) => texts,
            Err(err) => {
                run.fail(10, err);
                return run;
            }
        };
        let sections: Vec<Subheading> = validated
            .iter()
            .zip(expansions.into_iter())
            .enumerate()
            .map(|(order, (section, content))| Subheading {
                title: section.subheading.clone(),
                content,
                order: order + 1,
            })
            .collect();
        run.complete(10, json!({ "sections": sections.len() }));

        // Step 11: Conclusion Writing
        run.begin(11);
        let conclusion = match self.writer.write_conclusion(&title, &subheadings).await {
            Ok(text) => text,
            Err(err) => {
                run.fail(11, err);
                return run;
            }
        };
        run.complete(11, json!({ "chars": conclusion.len() }));

        // Step 12: Image Planning
        run.begin(12);
        let body_preview: String = sections
            .iter()
            .map(|section| section.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let image_plan = match self
            .imagery
            .plan_images(&title, &body_preview, &subheadings)
            .await
        {
            Ok(plan) => plan,
            Err(err) => {
                run.fail(12, err);
                return run;
            }
        };
        run.complete(
            12,
            json!({ "supplemental_prompts": image_plan.supplemental_prompts.len() }),
        );

        // Step 13: Image Generation - degrades per image, never aborts.
        run.begin(13);
        let images = self.imagery.generate_images(&image_plan).await;
        let generated = images.iter().filter(|image| !image.urls.is_empty()).count();
        run.complete(
            13,
            json!({ "images": images.len(), "generated": generated }),
        );

        // Step 14: Metadata Creation - degrades to fallbacks, never aborts.
        run.begin(14);
        let metadata = self
            .metadata
            .build(&title, &description, &body_preview)
            .await;
        run.complete(
            14,
            json!({ "category": &metadata.category, "tags": metadata.tags.len() }),
        );

        // Step 15: Output Generation
        run.begin(15);
        let artifact = BlogPost {
            frontmatter: FrontMatter {
                title: title.clone(),
                description,
                date: Utc::now().date_naive(),
                draft: true,
                categories: vec![metadata.category],
                tags: metadata.tags,
            },
            introduction,
            sections,
            conclusion,
            images,
            filename: metadata.filename,
            created_at: Utc::now(),
        };
        run.complete(
            15,
            json!({ "filename": &artifact.filename, "words": artifact.word_count() }),
        );

        run.status = RunStatus::Completed;
        run.artifact = Some(artifact);
        tracing::info!(run_id = %run.id, title = %title, "blog post pipeline completed");
        run
    }

    /// Clamps the planned subheadings into the configured bounds, padding
    /// with generic section names or truncating as needed.
    fn shape_subheadings(&self, planned: Vec<String>) -> Vec<String> {
        let mut subheadings: Vec<String> = planned
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        while subheadings.len() < self.content.min_subheadings {
            subheadings.push(format!("Section {}", subheadings.len() + 1));
        }
        subheadings.truncate(self.content.max_subheadings);
        subheadings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{
        CallMeta, CallOutcome, GeneratedImages, Generation, GenerationRequest, ImageRequest,
        SearchHit, SearchRequest, SearchResults, Usage,
    };
    use async_trait::async_trait;

    const ANALYSIS_JSON: &str = r#"{"title": "Backups Done Right",
        "description": "A restic setup that survives restore drills.",
        "subheadings": ["Why restic", "The hardware", "Restore drills"]}"#;

    const RESEARCH_RESPONSE: &str = "RESEARCH SUMMARY:\nFindings.\n\nKEY POINTS:\n- a point\n\nSOURCES:\n- https://restic.net/docs";

    const METADATA_JSON: &str = r#"{"category": "development",
        "tags": ["backups", "restic", "homelab"], "filename": "backups-done-right.md"}"#;

    const IMAGE_PLAN: &str =
        "HEADER IMAGE:\nA server rack\n\nSUPPLEMENTAL IMAGES:\n- A NAS\n\nSTYLE NOTES:\nPhotographic";

    /// Generator scripted on prompt markers, with an optional step to
    /// fail at (matched on a marker in the prompt text).
    struct ScriptedGenerator {
        fail_on_marker: Option<&'static str>,
    }

    impl ScriptedGenerator {
        fn reliable() -> Self {
            Self {
                fail_on_marker: None,
            }
        }

        fn failing_on(marker: &'static str) -> Self {
            Self {
                fail_on_marker: Some(marker),
            }
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        async fn generate(&self, request: GenerationRequest) -> CallOutcome<Generation> {
            let prompt = request
                .messages
                .iter()
                .map(|m| m.content.as_str())
                .collect::<Vec<_>>()
                .join("\n");

            if let Some(marker) = self.fail_on_marker {
                if prompt.contains(marker) {
                    return CallOutcome::failure("retries exhausted", CallMeta::default());
                }
            }

            let content = if prompt.contains("create a blog post outline") {
                ANALYSIS_JSON.to_string()
            } else if prompt.contains("Research the following blog post topic")
                || prompt.contains("Research content for this blog post subheading")
            {
                RESEARCH_RESPONSE.to_string()
            } else if prompt.contains("Write a compelling introduction") {
                "An introduction that hooks the reader.".to_string()
            } else if prompt.contains("Expand this subheading") {
                "Expanded section content grounded in the research.".to_string()
            } else if prompt.contains("Write an engaging conclusion") {
                "A conclusion that lands the takeaways.".to_string()
            } else if prompt.contains("Create image prompts") {
                IMAGE_PLAN.to_string()
            } else if prompt.contains("Generate metadata") {
                METADATA_JSON.to_string()
            } else {
                "ok".to_string()
            };

            CallOutcome::success(
                Generation {
                    content,
                    model: "test-model".to_string(),
                    usage: Usage::default(),
                },
                CallMeta::default(),
            )
        }
    }

    struct StubSearcher;

    #[async_trait]
    impl WebSearcher for StubSearcher {
        async fn search(&self, request: SearchRequest) -> CallOutcome<SearchResults> {
            CallOutcome::success(
                SearchResults {
                    query: request.query,
                    hits: vec![SearchHit {
                        title: "Restic docs".to_string(),
                        url: "https://restic.net/docs".to_string(),
                        snippet: "docs".to_string(),
                        score: 1.0,
                        source: None,
                    }],
                    total: 1,
                },
                CallMeta::default(),
            )
        }
    }

    struct StubImages;

    #[async_trait]
    impl ImageGenerator for StubImages {
        async fn generate_image(&self, _request: ImageRequest) -> CallOutcome<GeneratedImages> {
            CallOutcome::success(
                GeneratedImages {
                    urls: vec!["https://img.example/1.png".to_string()],
                    prediction_id: "p1".to_string(),
                    model: "sdxl".to_string(),
                },
                CallMeta::default(),
            )
        }
    }

    fn pipeline(generator: ScriptedGenerator) -> BlogPipeline {
        BlogPipeline::new(
            &AppConfig::default(),
            Arc::new(generator),
            Arc::new(StubSearcher),
            Arc::new(StubImages),
        )
    }

    const NOTE: &str = "# Backups\n\nNotes about restic, a NAS, and actually testing restores.";

    #[tokio::test]
    async fn test_run_completes_all_fifteen_steps() {
        let run = pipeline(ScriptedGenerator::reliable())
            .run_tracked(NOTE, "backups.md")
            .await;

        assert_eq!(run.status, RunStatus::Completed);
        assert_eq!(run.steps.len(), 15);
        assert!(run
            .steps
            .iter()
            .all(|step| step.status == StepStatus::Completed));
        assert!(run
            .steps
            .iter()
            .all(|step| step.started_at.is_some() && step.finished_at.is_some()));

        let artifact = run.into_result().expect("run completed");
        assert_eq!(artifact.frontmatter.title, "Backups Done Right");
        assert_eq!(artifact.sections.len(), 3);
        assert_eq!(artifact.filename, "backups-done-right.md");
    }

    #[tokio::test]
    async fn test_abort_at_step_seven_leaves_later_steps_pending() {
        // Subheading research fails while main-topic research succeeds,
        // so steps 1-6 complete and the step 7 fan-out aborts the run.
        let run = pipeline(ScriptedGenerator::failing_on(
            "Research content for this blog post subheading",
        ))
        .run_tracked(NOTE, "backups.md")
        .await;

        assert_eq!(run.status, RunStatus::Failed);
        for index in 1..=6 {
            assert_eq!(run.step(index).status, StepStatus::Completed);
        }
        assert_eq!(run.step(7).status, StepStatus::Failed);
        assert!(run.step(7).error.as_deref().unwrap().contains("researcher"));
        for index in 8..=15 {
            assert_eq!(run.step(index).status, StepStatus::Pending);
            assert!(run.step(index).started_at.is_none());
        }

        let err = run.into_result().expect_err("run aborted");
        assert_eq!(err.step, 7);
        assert_eq!(err.name, "Content Research");
    }

    #[tokio::test]
    async fn test_abort_at_introduction_writing() {
        let run = pipeline(ScriptedGenerator::failing_on(
            "Write a compelling introduction",
        ))
        .run_tracked(NOTE, "backups.md")
        .await;

        assert_eq!(run.status, RunStatus::Failed);
        assert_eq!(run.step(9).status, StepStatus::Failed);
        assert_eq!(run.step(8).status, StepStatus::Completed);
        assert_eq!(run.step(10).status, StepStatus::Pending);
        assert_eq!(run.into_result().expect_err("aborted").step, 9);
    }

    #[tokio::test]
    async fn test_invalid_note_fails_step_one() {
        let run = pipeline(ScriptedGenerator::reliable())
            .run_tracked("too short", "x.md")
            .await;

        assert_eq!(run.status, RunStatus::Failed);
        assert_eq!(run.step(1).status, StepStatus::Failed);
        for index in 2..=15 {
            assert_eq!(run.step(index).status, StepStatus::Pending);
        }
        assert_eq!(run.into_result().expect_err("aborted").step, 1);
    }

    #[tokio::test]
    async fn test_title_derives_only_from_analysis_and_note() {
        // Two pipelines whose generators differ only in writing-step
        // output must produce identical titles: the title is fixed by
        // step 2's analysis plus the note, and later steps cannot reach
        // back to change it.
        struct RewordedWriting;

        #[async_trait]
        impl TextGenerator for RewordedWriting {
            async fn generate(&self, request: GenerationRequest) -> CallOutcome<Generation> {
                let prompt = request
                    .messages
                    .iter()
                    .map(|m| m.content.as_str())
                    .collect::<Vec<_>>()
                    .join("\n");
                if prompt.contains("Write a compelling introduction") {
                    return CallOutcome::success(
                        Generation {
                            content: "A completely different introduction.".to_string(),
                            model: "test-model".to_string(),
                            usage: Usage::default(),
                        },
                        CallMeta::default(),
                    );
                }
                ScriptedGenerator::reliable().generate(request).await
            }
        }

        let baseline = pipeline(ScriptedGenerator::reliable())
            .run_tracked(NOTE, "backups.md")
            .await;
        let reworded = BlogPipeline::new(
            &AppConfig::default(),
            Arc::new(RewordedWriting),
            Arc::new(StubSearcher),
            Arc::new(StubImages),
        )
        .run_tracked(NOTE, "backups.md")
        .await;

        let baseline = baseline.into_result().expect("completes");
        let reworded = reworded.into_result().expect("completes");
        assert_ne!(baseline.introduction, reworded.introduction);
        assert_eq!(baseline.frontmatter.title, reworded.frontmatter.title);
        assert_eq!(
            baseline.frontmatter.description,
            reworded.frontmatter.description
        );
    }

    #[tokio::test]
    async fn test_dedupe_research_flag() {
        // With dedupe on, the shared source from main and subheading
        // research appears once per section instead of twice.
        let config = AppConfig::default().with_dedupe_research(true);
        let deduped = BlogPipeline::new(
            &config,
            Arc::new(ScriptedGenerator::reliable()),
            Arc::new(StubSearcher),
            Arc::new(StubImages),
        );
        let run = deduped.run_tracked(NOTE, "backups.md").await;
        assert_eq!(run.status, RunStatus::Completed);
    }

    #[tokio::test]
    async fn test_run_returns_artifact_directly() {
        let artifact = pipeline(ScriptedGenerator::reliable())
            .run(NOTE, "backups.md")
            .await
            .expect("run completes");
        assert!(!artifact.to_markdown().is_empty());
    }

    #[test]
    fn test_shape_subheadings_pads_and_truncates() {
        let pipeline = pipeline(ScriptedGenerator::reliable());

        let padded = pipeline.shape_subheadings(vec!["Only one".to_string()]);
        assert_eq!(padded.len(), 2);
        assert_eq!(padded[1], "Section 2");

        let truncated = pipeline.shape_subheadings(
            (1..=8).map(|i| format!("S{}", i)).collect(),
        );
        assert_eq!(truncated.len(), 5);

        let cleaned = pipeline.shape_subheadings(vec![
            "  A  ".to_string(),
            String::new(),
            "B".to_string(),
        ]);
        assert_eq!(cleaned, vec!["A", "B"]);
    }

    #[test]
    fn test_step_records_preallocated_pending() {
        let run = PipelineRun::new("note.md");
        assert_eq!(run.steps.len(), 15);
        assert_eq!(run.status, RunStatus::Running);
        for (i, step) in run.steps.iter().enumerate() {
            assert_eq!(step.index, i + 1);
            assert_eq!(step.status, StepStatus::Pending);
            assert!(step.started_at.is_none());
        }
        assert_eq!(run.step(1).name, "Input Validation");
        assert_eq!(run.step(15).name, "Output Generation");
    }

    #[test]
    fn test_step_status_display() {
        assert_eq!(StepStatus::Pending.to_string(), "pending");
        assert_eq!(StepStatus::InProgress.to_string(), "in_progress");
        assert_eq!(StepStatus::Completed.to_string(), "completed");
        assert_eq!(StepStatus::Failed.to_string(), "failed");
    }

    #[test]
    fn test_pipeline_error_display() {
        let err = PipelineError {
            step: 7,
            name: "Content Research",
            source: AgentError::CallFailed {
                agent: "researcher",
                message: "retries exhausted".to_string(),
            },
        };
        let rendered = err.to_string();
        assert!(rendered.contains("step 7"));
        assert!(rendered.contains("Content Research"));
    }
}
