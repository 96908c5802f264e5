//! Content writer: introduction, section expansion, conclusion.
//!
//! Writing output is required by every later step, so adapter failures
//! abort rather than degrade.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::error::AgentError;
use crate::models::ResearchFindings;
use crate::services::{GenerationRequest, Message, TextGenerator};

const AGENT_NAME: &str = "content writer";

const SYSTEM_PROMPT: &str = "You are a content writer. You produce engaging, well-structured \
blog post prose with a consistent tone. Respond with the requested text only, no preamble.";

const INTRODUCTION_PROMPT: &str = r#"Write a compelling introduction for this blog post.

TITLE: {title}
DESCRIPTION: {description}

The introduction should hook the reader, establish the topic and its importance, and preview
what the reader will learn. Keep it concise but impactful (2-3 paragraphs)."#;

const EXPANSION_PROMPT: &str = r#"Expand this subheading into comprehensive, engaging content.

SUBHEADING: {subheading}
RESEARCH SUMMARY: {summary}
KEY POINTS:
{key_points}
SOURCES:
{sources}

Cover the subheading thoroughly, incorporate the research naturally, and keep the section
flowing with the rest of the post. Write 2-4 paragraphs."#;

const CONCLUSION_PROMPT: &str = r#"Write an engaging conclusion for this blog post.

TITLE: {title}
SECTIONS COVERED:
{sections}

Summarize the main takeaways, reinforce the value provided, and end with a strong
call-to-action or thought-provoking statement. Keep it concise (1-2 paragraphs)."#;

/// Role worker for writing steps (9-11).
pub struct ContentWriter {
    generator: Arc<dyn TextGenerator>,
    model: String,
    temperature: f64,
    max_tokens: u32,
}

impl ContentWriter {
    pub fn new(generator: Arc<dyn TextGenerator>, config: &AppConfig) -> Self {
        Self {
            generator,
            model: config.llm.default_model.clone(),
            temperature: config.llm.temperature,
            max_tokens: config.llm.max_tokens,
        }
    }

    /// Writes the post introduction.
    pub async fn write_introduction(
        &self,
        title: &str,
        description: &str,
    ) -> Result<String, AgentError> {
        let prompt = INTRODUCTION_PROMPT
            .replace("{title}", title)
            .replace("{description}", description);
        let text = self.generate_text(prompt).await?;
        tracing::info!(title, "introduction written");
        Ok(text)
    }

    /// Expands one subheading using its combined research.
    pub async fn expand_subheading(
        &self,
        subheading: &str,
        research: &ResearchFindings,
    ) -> Result<String, AgentError> {
        let key_points = bullet_list(&research.key_points);
        let sources = bullet_list(&research.sources);
        let prompt = EXPANSION_PROMPT
            .replace("{subheading}", subheading)
            .replace("{summary}", &research.summary)
            .replace("{key_points}", &key_points)
            .replace("{sources}", &sources);

        let text = self.generate_text(prompt).await?;
        tracing::info!(subheading, "subheading expanded");
        Ok(text)
    }

    /// Writes the post conclusion from the covered section titles.
    pub async fn write_conclusion(
        &self,
        title: &str,
        section_titles: &[String],
    ) -> Result<String, AgentError> {
        let sections = bullet_list(section_titles);
        let prompt = CONCLUSION_PROMPT
            .replace("{title}", title)
            .replace("{sections}", &sections);

        let text = self.generate_text(prompt).await?;
        tracing::info!(title, "conclusion written");
        Ok(text)
    }

    async fn generate_text(&self, prompt: String) -> Result<String, AgentError> {
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

        let text = content.content.trim().to_string();
        if text.is_empty() {
            return Err(AgentError::UnusableResponse {
                agent: AGENT_NAME,
                message: "generation returned empty text".to_string(),
            });
        }
        Ok(text)
    }
}

fn bullet_list(items: &[String]) -> String {
    if items.is_empty() {
        return "(none)".to_string();
    }
    items
        .iter()
        .map(|item| format!("- {}", item))
        .collect::<Vec<_>>()
        .join("\n")
}
