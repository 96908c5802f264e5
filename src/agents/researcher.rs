//! Researcher: gathers web sources and synthesizes findings.
//!
//! For each topic or subheading the researcher runs a (cached) web
//! search for sources, then asks the LLM to synthesize them into a
//! structured set of findings. The response parser is best-effort: it
//! recognizes `RESEARCH SUMMARY:` / `KEY POINTS:` / `SOURCES:` /
//! `CONTENT SUGGESTIONS:` headers with bullet lists, and falls back to
//! treating the whole response as the summary.
//!
//! A failed search degrades to LLM-only research (sources stay empty);
//! a failed synthesis aborts the step, since downstream writing depends
//! on it.

use std::collections::HashSet;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::error::AgentError;
use crate::models::{ResearchFindings, SourceAssessment};
use crate::services::{GenerationRequest, Message, SearchRequest, TextGenerator, WebSearcher};

const AGENT_NAME: &str = "researcher";

const SYSTEM_PROMPT: &str = "You are a research specialist. You synthesize web findings into \
accurate, well-sourced material for blog posts. Structure every answer with the section \
headers RESEARCH SUMMARY:, KEY POINTS:, SOURCES:, and CONTENT SUGGESTIONS:, using '- ' \
bullets inside KEY POINTS and SOURCES.";

const TOPIC_PROMPT: &str = r#"Research the following blog post topic.

TOPIC: {topic}

CONTEXT: {context}

WEB SOURCES FOUND:
{sources}

Synthesize the findings. Cover the key facts a reader would expect, and keep every claim
attributable to one of the sources where possible."#;

const SUBHEADING_PROMPT: &str = r#"Research content for this blog post subheading.

SUBHEADING: {subheading}

BLOG CONTEXT: {context}

WEB SOURCES FOUND:
{sources}

Focus on information that will help expand this section with valuable, accurate content."#;

/// Role worker for research coordination (steps 6-8).
pub struct Researcher {
    generator: Arc<dyn TextGenerator>,
    searcher: Arc<dyn WebSearcher>,
    model: String,
    temperature: f64,
    max_tokens: u32,
    search_results: u32,
}

impl Researcher {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        searcher: Arc<dyn WebSearcher>,
        config: &AppConfig,
    ) -> Self {
        Self {
            generator,
            searcher,
            model: config.llm.default_model.clone(),
            temperature: config.llm.temperature,
            max_tokens: config.llm.max_tokens,
            search_results: config.content.search_results,
        }
    }

    /// Researches the post's main topic.
    pub async fn research_topic(
        &self,
        topic: &str,
        context: &str,
    ) -> Result<ResearchFindings, AgentError> {
        let sources = self.gather_sources(topic).await;
        let prompt = TOPIC_PROMPT
            .replace("{topic}", topic)
            .replace("{context}", context)
            .replace("{sources}", &format_sources(&sources));

        let findings = self.synthesize(prompt, sources).await?;
        tracing::info!(topic, sources = findings.sources.len(), "topic research completed");
        Ok(findings)
    }

    /// Researches one subheading within the post's context.
    pub async fn research_subheading(
        &self,
        subheading: &str,
        blog_context: &str,
    ) -> Result<ResearchFindings, AgentError> {
        let query = format!("{} {}", blog_context, subheading);
        let sources = self.gather_sources(&query).await;
        let prompt = SUBHEADING_PROMPT
            .replace("{subheading}", subheading)
            .replace("{context}", blog_context)
            .replace("{sources}", &format_sources(&sources));

        let mut findings = self.synthesize(prompt, sources).await?;
        findings.subheading = Some(subheading.to_string());
        tracing::info!(subheading, "subheading research completed");
        Ok(findings)
    }

    /// Combines main-topic research with subheading research.
    ///
    /// Concatenates key points and sources; with `dedupe` set, repeated
    /// entries are dropped preserving first-seen order.
    pub fn combine(
        &self,
        main: &ResearchFindings,
        sub: &ResearchFindings,
        dedupe: bool,
    ) -> ResearchFindings {
        let mut key_points: Vec<String> = main
            .key_points
            .iter()
            .chain(sub.key_points.iter())
            .cloned()
            .collect();
        let mut sources: Vec<String> = main
            .sources
            .iter()
            .chain(sub.sources.iter())
            .cloned()
            .collect();

        if dedupe {
            key_points = dedupe_preserving_order(key_points);
            sources = dedupe_preserving_order(sources);
        }

        ResearchFindings {
            summary: format!("{} {}", main.summary, sub.summary).trim().to_string(),
            key_points,
            sources,
            content_suggestions: sub.content_suggestions.clone(),
            subheading: sub.subheading.clone(),
        }
    }

    /// Assesses source credibility with a bounded heuristic: a source is
    /// valid when it is an absolute http(s) URL with a host.
    pub fn validate_sources(&self, sources: &[String]) -> Vec<SourceAssessment> {
        sources
            .iter()
            .map(|source| {
                let valid = is_plausible_url(source);
                SourceAssessment {
                    url: source.clone(),
                    valid,
                    reason: if valid {
                        "well-formed http(s) URL".to_string()
                    } else {
                        "not an absolute http(s) URL".to_string()
                    },
                }
            })
            .collect()
    }

    /// Formats simple web citations for the valid sources.
    pub fn generate_citations(&self, assessments: &[SourceAssessment]) -> Vec<String> {
        assessments
            .iter()
            .filter(|assessment| assessment.valid)
            .map(|assessment| format!("Source: <{}>", assessment.url))
            .collect()
    }

    /// Runs the web search, degrading to no sources on failure.
    async fn gather_sources(&self, query: &str) -> Vec<String> {
        let request = SearchRequest::new(query).with_num_results(self.search_results);
        let outcome = self.searcher.search(request).await;
        match outcome.into_result() {
            Ok(results) => results.hits.into_iter().map(|hit| hit.url).collect(),
            Err(message) => {
                tracing::warn!(query, error = %message, "search failed, continuing without sources");
                Vec::new()
            }
        }
    }

    /// Asks the LLM to synthesize and parses the sectioned response.
    async fn synthesize(
        &self,
        prompt: String,
        search_sources: Vec<String>,
    ) -> Result<ResearchFindings, AgentError> {
        let request = GenerationRequest::new(
            self.model.clone(),
            vec![Message::system(SYSTEM_PROMPT), Message::user(prompt)],
        )
        .with_temperature(self.temperature)
        .with_max_tokens(self.max_tokens);

        let content = self
            .generator
            .generate(request)
            .await
            .into_result()
            .map_err(|message| AgentError::CallFailed {
                agent: AGENT_NAME,
                message,
            })?;

        let mut findings = parse_research_response(&content.content);
        // Search sources come first; parsed sources extend them.
        let parsed = std::mem::take(&mut findings.sources);
        findings.sources = search_sources;
        findings.sources.extend(parsed);
        Ok(findings)
    }
}

/// Parses the sectioned research response. Unrecognized content before
/// the first header is ignored; a response with no headers at all
/// becomes the summary.
fn parse_research_response(response: &str) -> ResearchFindings {
    #[derive(PartialEq, Clone, Copy)]
    enum Section {
        None,
        Summary,
        KeyPoints,
        Sources,
        Suggestions,
    }

    let mut findings = ResearchFindings::default();
    let mut current = Section::None;
    let mut saw_header = false;

    for line in response.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let upper = line.to_uppercase();
        if upper.contains("RESEARCH SUMMARY:") {
            current = Section::Summary;
            saw_header = true;
            continue;
        } else if upper.contains("KEY POINTS:") {
            current = Section::KeyPoints;
            saw_header = true;
            continue;
        } else if upper.contains("SOURCES:") {
            current = Section::Sources;
            saw_header = true;
            continue;
        } else if upper.contains("CONTENT SUGGESTIONS:") {
            current = Section::Suggestions;
            saw_header = true;
            continue;
        }

        match current {
            Section::Summary => {
                findings.summary.push_str(line);
                findings.summary.push(' ');
            }
            Section::KeyPoints => {
                if let Some(point) = bullet_text(line) {
                    findings.key_points.push(point);
                }
            }
            Section::Sources => {
                if let Some(source) = bullet_text(line) {
                    findings.sources.push(source);
                }
            }
            Section::Suggestions => {
                findings.content_suggestions.push_str(line);
                findings.content_suggestions.push(' ');
            }
            Section::None => {}
        }
    }

    findings.summary = findings.summary.trim().to_string();
    findings.content_suggestions = findings.content_suggestions.trim().to_string();

    if !saw_header {
        findings.summary = response.trim().to_string();
    }
    findings
}

/// Strips a leading `- `, `* `, or `• ` bullet marker.
fn bullet_text(line: &str) -> Option<String> {
    for marker in ["- ", "* ", "• "] {
        if let Some(rest) = line.strip_prefix(marker) {
            let text = rest.trim();
            if !text.is_empty() {
                return Some(text.to_string());
            }
        }
    }
    None
}

fn is_plausible_url(source: &str) -> bool {
    let rest = source
        .strip_prefix("https://")
        .or_else(|| source.strip_prefix("http://"));
    match rest {
        Some(rest) => {
            let host = rest.split('/').next().unwrap_or("");
            host.contains('.') && !host.contains(' ')
        }
        None => false,
    }
}

fn dedupe_preserving_order(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

/// Formats gathered source URLs for prompt inclusion.
fn format_sources(sources: &[String]) -> String {
    if sources.is_empty() {
        return "(no web sources available)".to_string();
    }
    sources
        .iter()
        .map(|source| format!("- {}", source))
        .collect::<Vec<_>>()
        .join("\n")
}
