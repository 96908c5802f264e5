//! Content analyzer: turns a raw note into a post outline.
//!
//! Asks the LLM for a JSON outline (title, description, subheadings).
//! When the response cannot be parsed as JSON the analyzer derives a
//! best-effort outline from the note itself, so a reachable LLM always
//! yields a usable analysis; only an adapter failure aborts the step.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::error::AgentError;
use crate::models::{Note, NoteAnalysis};
use crate::services::{GenerationRequest, Message, TextGenerator};
use crate::utils::json_extraction::extract_json;

const AGENT_NAME: &str = "content analyzer";

const SYSTEM_PROMPT: &str = "You are a content analysis specialist. You transform raw notes \
into structured blog post outlines with compelling titles, concise descriptions, and logical \
subheadings. Respond with JSON only.";

const ANALYZE_PROMPT: &str = r#"Analyze the following raw notes and create a blog post outline.

NOTES:
{notes}

Respond with JSON in exactly this shape:
{
    "title": "Suggested blog post title",
    "description": "Suggested description (2-3 sentences)",
    "subheadings": ["First subheading", "Second subheading", "Third subheading"],
    "analysis_notes": "Any additional insights about the content structure"
}"#;

/// Fallback subheadings used when neither the LLM nor the note yields a
/// usable structure.
const DEFAULT_SUBHEADINGS: [&str; 3] = ["Introduction", "Main Content", "Conclusion"];

/// Role worker for note analysis (pipeline steps 2-5 draw on its output).
pub struct ContentAnalyzer {
    generator: Arc<dyn TextGenerator>,
    model: String,
    temperature: f64,
    max_tokens: u32,
}

impl ContentAnalyzer {
    pub fn new(generator: Arc<dyn TextGenerator>, config: &AppConfig) -> Self {
        Self {
            generator,
            model: config.llm.default_model.clone(),
            temperature: config.llm.temperature,
            max_tokens: config.llm.max_tokens,
        }
    }

    /// Analyzes a note into a structured outline.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::CallFailed` when the generation adapter
    /// reports a failure; parse problems degrade to a note-derived
    /// outline instead of erroring.
    pub async fn analyze(&self, note: &Note) -> Result<NoteAnalysis, AgentError> {
        let prompt = ANALYZE_PROMPT.replace("{notes}", &note.content);
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

        let analysis = match parse_analysis(&content.content) {
            Some(analysis) => analysis,
            None => {
                tracing::warn!(
                    filename = %note.filename,
                    "analysis response was not valid JSON, deriving outline from note"
                );
                derive_from_note(note)
            }
        };

        tracing::info!(
            filename = %note.filename,
            title = %analysis.title,
            subheadings = analysis.subheadings.len(),
            "note analysis completed"
        );
        Ok(analysis)
    }
}

/// Parses the LLM response into an analysis, requiring a non-empty title.
fn parse_analysis(content: &str) -> Option<NoteAnalysis> {
    let json = extract_json(content)?;
    let analysis: NoteAnalysis = serde_json::from_str(&json).ok()?;
    if analysis.title.trim().is_empty() {
        return None;
    }
    Some(analysis)
}

/// Derives an outline directly from the note content: the first markdown
/// heading (or first line) becomes the title, the first paragraph after
/// it the description.
fn derive_from_note(note: &Note) -> NoteAnalysis {
    let mut title = None;
    let mut description = String::new();

    for line in note.content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if title.is_none() {
            title = Some(line.trim_start_matches('#').trim().to_string());
            continue;
        }
        description = line.to_string();
        break;
    }

    let title = title.unwrap_or_else(|| "Untitled Post".to_string());
    if description.is_empty() {
        description = format!("Notes on {}.", title);
    }

    NoteAnalysis {
        title,
        description,
        subheadings: DEFAULT_SUBHEADINGS.iter().map(|s| s.to_string()).collect(),
        analysis_notes: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{CallMeta, CallOutcome, Generation, Usage};
    use async_trait::async_trait;

    /// Generator returning a fixed response, or a failure when `response`
    /// is `None`.
    struct FixedGenerator {
        response: Option<String>,
    }

    #[async_trait]
    impl TextGenerator for FixedGenerator {
        async fn generate(&self, _request: GenerationRequest) -> CallOutcome<Generation> {
            match &self.response {
                Some(content) => CallOutcome::success(
                    Generation {
                        content: content.clone(),
                        model: "test-model".to_string(),
                        usage: Usage::default(),
                    },
                    CallMeta::default(),
                ),
                None => CallOutcome::failure("retries exhausted", CallMeta::default()),
            }
        }
    }

    fn analyzer_with(response: Option<&str>) -> ContentAnalyzer {
        let config = AppConfig::default();
        ContentAnalyzer::new(
            Arc::new(FixedGenerator {
                response: response.map(String::from),
            }),
            &config,
        )
    }

    fn note() -> Note {
        Note::new(
            "# Homelab Backups\n\nHow I back up my homelab with restic and a NAS.",
            "backups.md",
        )
        .expect("valid note")
    }

    #[tokio::test]
    async fn test_parses_json_response() {
        let response = r#"{"title": "Backups Done Right", "description": "A restic setup.",
            "subheadings": ["Why restic", "The NAS", "Restore drills"]}"#;
        let analysis = analyzer_with(Some(response))
            .analyze(&note())
            .await
            .expect("analysis succeeds");

        assert_eq!(analysis.title, "Backups Done Right");
        assert_eq!(analysis.subheadings.len(), 3);
    }

    #[tokio::test]
    async fn test_parses_fenced_json_response() {
        let response = "Here is the outline:\n```json\n{\"title\": \"T\", \"description\": \"D\", \"subheadings\": [\"A\", \"B\"]}\n```";
        let analysis = analyzer_with(Some(response))
            .analyze(&note())
            .await
            .expect("analysis succeeds");
        assert_eq!(analysis.title, "T");
        assert_eq!(analysis.subheadings, vec!["A", "B"]);
    }

    #[tokio::test]
    async fn test_unparseable_response_derives_from_note() {
        let analysis = analyzer_with(Some("I could not produce JSON, sorry."))
            .analyze(&note())
            .await
            .expect("fallback still succeeds");

        assert_eq!(analysis.title, "Homelab Backups");
        assert_eq!(
            analysis.description,
            "How I back up my homelab with restic and a NAS."
        );
        assert_eq!(analysis.subheadings.len(), 3);
    }

    #[tokio::test]
    async fn test_empty_title_in_json_falls_back() {
        let response = r#"{"title": "  ", "description": "D", "subheadings": ["A"]}"#;
        let analysis = analyzer_with(Some(response))
            .analyze(&note())
            .await
            .expect("fallback still succeeds");
        assert_eq!(analysis.title, "Homelab Backups");
    }

    #[tokio::test]
    async fn test_adapter_failure_propagates() {
        let result = analyzer_with(None).analyze(&note()).await;
        assert!(matches!(
            result,
            Err(AgentError::CallFailed {
                agent: "content analyzer",
                ..
            })
        ));
    }
}
