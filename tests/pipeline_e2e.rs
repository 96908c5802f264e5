//! End-to-end pipeline tests over scripted adapters.
//!
//! These tests drive the full 15-step workflow through the public API
//! with in-process adapter implementations, so no network access is
//! needed. Real-adapter integration lives behind the `health` CLI
//! command and requires live API keys.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use blogforge::agents::metadata::AVAILABLE_CATEGORIES;
use blogforge::config::AppConfig;
use blogforge::pipeline::{BlogPipeline, RunStatus, StepStatus};
use blogforge::services::{
    CallMeta, CallOutcome, GeneratedImages, Generation, GenerationRequest, ImageGenerator,
    ImageRequest, SearchHit, SearchRequest, SearchResults, TextGenerator, Usage, WebSearcher,
};

const ANALYSIS_JSON: &str = r#"{
    "title": "Understanding X",
    "description": "A practical look at X and why it matters.",
    "subheadings": ["What X Is", "Where X Helps", "Getting Started"]
}"#;

const RESEARCH_RESPONSE: &str = "RESEARCH SUMMARY:\nX is widely documented.\n\nKEY POINTS:\n- X has a stable core\n- Adoption is growing\n\nSOURCES:\n- https://docs.example/x\n\nCONTENT SUGGESTIONS:\nLead with a concrete example.";

const METADATA_JSON: &str = r#"{
    "category": "development",
    "tags": ["x", "tooling", "guides"],
    "filename": "understanding-x.md"
}"#;

const IMAGE_PLAN_RESPONSE: &str = "HEADER IMAGE:\nAn abstract render of X\n\nSUPPLEMENTAL IMAGES:\n- A diagram of X internals\n\nSTYLE NOTES:\nClean and minimal";

/// Scripted generator keyed on prompt markers. Optionally fails when a
/// marker is present, and counts calls for concurrency assertions.
struct ScriptedGenerator {
    fail_marker: Option<&'static str>,
    calls: AtomicUsize,
}

impl ScriptedGenerator {
    fn reliable() -> Self {
        Self {
            fail_marker: None,
            calls: AtomicUsize::new(0),
        }
    }

    fn failing_on(marker: &'static str) -> Self {
        Self {
            fail_marker: Some(marker),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, request: GenerationRequest) -> CallOutcome<Generation> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let prompt = request
            .messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        if let Some(marker) = self.fail_marker {
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
            "X deserves a closer look, and this post gives it one.".to_string()
        } else if prompt.contains("Expand this subheading") {
            "This section expands the subheading with researched detail.".to_string()
        } else if prompt.contains("Write an engaging conclusion") {
            "X rewards the time you put into it; start small and iterate.".to_string()
        } else if prompt.contains("Create image prompts") {
            IMAGE_PLAN_RESPONSE.to_string()
        } else if prompt.contains("Generate metadata") {
            METADATA_JSON.to_string()
        } else {
            "ok".to_string()
        };

        CallOutcome::success(
            Generation {
                content,
                model: "scripted".to_string(),
                usage: Usage::default(),
            },
            CallMeta::default(),
        )
    }
}

struct StaticSearcher {
    calls: AtomicUsize,
}

impl StaticSearcher {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl WebSearcher for StaticSearcher {
    async fn search(&self, request: SearchRequest) -> CallOutcome<SearchResults> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        CallOutcome::success(
            SearchResults {
                query: request.query,
                hits: vec![SearchHit {
                    title: "X documentation".to_string(),
                    url: "https://docs.example/x".to_string(),
                    snippet: "Official docs for X".to_string(),
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
    async fn generate_image(&self, request: ImageRequest) -> CallOutcome<GeneratedImages> {
        CallOutcome::success(
            GeneratedImages {
                urls: vec![format!("https://cdn.example/{}.png", request.prompt.len())],
                prediction_id: "pred-1".to_string(),
                model: "sdxl".to_string(),
            },
            CallMeta::default(),
        )
    }
}

fn build_pipeline(generator: ScriptedGenerator) -> BlogPipeline {
    BlogPipeline::new(
        &AppConfig::default(),
        Arc::new(generator),
        Arc::new(StaticSearcher::new()),
        Arc::new(StubImages),
    )
}

#[tokio::test]
async fn end_to_end_note_becomes_complete_post() {
    let pipeline = build_pipeline(ScriptedGenerator::reliable());
    let run = pipeline
        .run_tracked("# My Topic\n\nSome content about X.", "note1.md")
        .await;

    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.steps.len(), 15);
    assert!(run
        .steps
        .iter()
        .all(|step| step.status == StepStatus::Completed));

    let post = run.into_result().expect("run completed");

    assert!(!post.frontmatter.title.is_empty());
    assert!(!post.frontmatter.description.is_empty());
    assert!(post.sections.len() >= 2);
    assert!(!post.introduction.is_empty());
    assert!(!post.conclusion.is_empty());

    let category = &post.frontmatter.categories[0];
    assert!(AVAILABLE_CATEGORIES.contains(&category.as_str()));
    assert!(post.frontmatter.tags.len() >= 2 && post.frontmatter.tags.len() <= 5);

    // The rendered artifact is a self-contained markdown document.
    let markdown = post.to_markdown();
    assert!(markdown.starts_with("+++"));
    assert!(markdown.contains("## What X Is"));
    assert!(markdown.contains("## Conclusion"));
}

#[tokio::test]
async fn failed_research_aborts_with_step_index_and_pending_tail() {
    let pipeline = build_pipeline(ScriptedGenerator::failing_on(
        "Research content for this blog post subheading",
    ));
    let run = pipeline
        .run_tracked("# My Topic\n\nSome content about X.", "note1.md")
        .await;

    assert_eq!(run.status, RunStatus::Failed);
    for index in 1..=6 {
        assert_eq!(run.step(index).status, StepStatus::Completed);
    }
    assert_eq!(run.step(7).status, StepStatus::Failed);
    for index in 8..=15 {
        assert_eq!(run.step(index).status, StepStatus::Pending);
    }

    let err = run.into_result().expect_err("run aborted");
    assert_eq!(err.step, 7);
    assert!(err.to_string().contains("Content Research"));
}

#[tokio::test]
async fn failed_metadata_degrades_instead_of_aborting() {
    let pipeline = build_pipeline(ScriptedGenerator::failing_on("Generate metadata"));
    let post = pipeline
        .run("# My Topic\n\nSome content about X.", "note1.md")
        .await
        .expect("metadata failure degrades to fallbacks");

    let category = &post.frontmatter.categories[0];
    assert!(AVAILABLE_CATEGORIES.contains(&category.as_str()));
    assert!(post.frontmatter.tags.len() >= 2);
    assert!(post.filename.ends_with(".md"));
}

#[tokio::test]
async fn per_subheading_research_hits_searcher_once_per_query() {
    let searcher = Arc::new(StaticSearcher::new());
    let pipeline = BlogPipeline::new(
        &AppConfig::default(),
        Arc::new(ScriptedGenerator::reliable()),
        Arc::clone(&searcher) as Arc<dyn WebSearcher>,
        Arc::new(StubImages),
    );

    let run = pipeline
        .run_tracked("# My Topic\n\nSome content about X.", "note1.md")
        .await;
    assert_eq!(run.status, RunStatus::Completed);

    // One search for the main topic plus one per planned subheading.
    assert_eq!(searcher.calls.load(Ordering::SeqCst), 4);
}
