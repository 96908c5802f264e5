//! Domain models for notes, research data, and the final blog post.
//!
//! Step payload types (`NoteAnalysis`, `ResearchFindings`, `ImagePlan`,
//! `PostMetadata`) carry structured data between pipeline steps; the
//! orchestrator assembles them into a [`BlogPost`] after step 15.

use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Minimum number of characters a note must contain after trimming.
pub const MIN_NOTE_CHARS: usize = 10;

/// Raw input note to be turned into a blog post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    /// Raw note content.
    pub content: String,
    /// Original filename, used for logging and output naming fallback.
    pub filename: String,
    /// When the note entered the pipeline.
    pub created_at: DateTime<Utc>,
}

impl Note {
    /// Creates a validated note from raw content.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::ContentTooShort` when the trimmed content is
    /// under [`MIN_NOTE_CHARS`] characters.
    pub fn new(content: impl Into<String>, filename: impl Into<String>) -> Result<Self, ModelError> {
        let content = content.into().trim().to_string();
        if content.len() < MIN_NOTE_CHARS {
            return Err(ModelError::ContentTooShort {
                length: content.len(),
                minimum: MIN_NOTE_CHARS,
            });
        }
        Ok(Self {
            content,
            filename: filename.into(),
            created_at: Utc::now(),
        })
    }

    /// Reads and validates a note from disk.
    pub fn from_file(path: &Path) -> Result<Self, ModelError> {
        let content = std::fs::read_to_string(path)?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "note.txt".to_string());
        Self::new(content, filename)
    }
}

/// Structured outcome of analyzing a note (steps 2-5 draw from this).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteAnalysis {
    /// Suggested blog post title.
    pub title: String,
    /// Suggested description (2-3 sentences).
    #[serde(default)]
    pub description: String,
    /// Planned subheadings in reading order.
    #[serde(default)]
    pub subheadings: Vec<String>,
    /// Free-form observations about the content structure.
    #[serde(default)]
    pub analysis_notes: Option<String>,
}

/// Research findings for a topic or subheading.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResearchFindings {
    /// Synthesized summary of what was found.
    pub summary: String,
    /// Bullet-point facts worth working into the post.
    pub key_points: Vec<String>,
    /// Source URLs backing the findings.
    pub sources: Vec<String>,
    /// Suggestions for how to use the material.
    pub content_suggestions: String,
    /// The subheading this research targets, if any.
    #[serde(default)]
    pub subheading: Option<String>,
}

/// Credibility assessment for one source URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceAssessment {
    pub url: String,
    pub valid: bool,
    pub reason: String,
}

/// Research for one subheading after source validation (step 8 output).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionResearch {
    pub subheading: String,
    pub findings: ResearchFindings,
    pub assessments: Vec<SourceAssessment>,
    pub citations: Vec<String>,
}

/// Planned image prompts for a post (step 12 output).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagePlan {
    /// Prompt for the header image.
    pub header_prompt: String,
    /// Prompts for supplemental images, in content order.
    pub supplemental_prompts: Vec<String>,
    /// Style guidance shared by all images.
    pub style_notes: String,
}

/// Where an image sits within the post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageKind {
    Header,
    Supplemental,
}

/// A generated image, or its placeholder when generation was skipped or
/// failed (imagery is non-critical and degrades rather than aborting).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageAsset {
    pub kind: ImageKind,
    pub prompt: String,
    pub alt_text: String,
    /// URLs returned by the image service; empty when degraded.
    pub urls: Vec<String>,
    /// Placeholder marker carried in the rendered post when `urls` is empty.
    pub placeholder: Option<String>,
}

/// SEO metadata selected for the post (step 14 output).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostMetadata {
    /// One of the nine fixed categories.
    pub category: String,
    /// Two to five tags.
    pub tags: Vec<String>,
    /// Slugified output filename ending in `.md`.
    pub filename: String,
}

/// Frontmatter rendered at the top of the generated markdown file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrontMatter {
    pub title: String,
    pub description: String,
    pub date: NaiveDate,
    pub draft: bool,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
}

impl FrontMatter {
    /// Renders the frontmatter block in Zola's TOML style.
    pub fn render(&self) -> String {
        let categories = self
            .categories
            .iter()
            .map(|c| format!("\"{}\"", c))
            .collect::<Vec<_>>()
            .join(", ");
        let tags = self
            .tags
            .iter()
            .map(|t| format!("\"{}\"", t))
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "+++\ntitle = \"{}\"\ndescription = \"{}\"\ndate = {}\ndraft = {}\n\n[taxonomies]\ncategories = [{}]\ntags = [{}]\n+++\n",
            self.title.replace('"', "'"),
            self.description.replace('"', "'"),
            self.date.format("%Y-%m-%d"),
            self.draft,
            categories,
            tags
        )
    }
}

/// One expanded content section of the post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subheading {
    pub title: String,
    pub content: String,
    pub order: usize,
}

/// The final artifact produced by a completed pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlogPost {
    pub frontmatter: FrontMatter,
    pub introduction: String,
    pub sections: Vec<Subheading>,
    pub conclusion: String,
    pub images: Vec<ImageAsset>,
    pub filename: String,
    pub created_at: DateTime<Utc>,
}

impl BlogPost {
    /// Total word count across introduction, sections, and conclusion.
    pub fn word_count(&self) -> usize {
        let mut total = self.introduction.split_whitespace().count()
            + self.conclusion.split_whitespace().count();
        for section in &self.sections {
            total += section.content.split_whitespace().count();
        }
        total
    }

    /// Estimated reading time in minutes at ~200 words per minute.
    pub fn reading_time(&self) -> usize {
        std::cmp::max(1, self.word_count() / 200)
    }

    /// Renders the complete markdown file: frontmatter, introduction,
    /// sections, conclusion, and an image appendix.
    pub fn to_markdown(&self) -> String {
        let mut parts = vec![self.frontmatter.render(), self.introduction.clone()];

        for section in &self.sections {
            parts.push(format!("## {}\n\n{}", section.title, section.content));
        }

        parts.push(format!("## Conclusion\n\n{}", self.conclusion));

        if !self.images.is_empty() {
            let mut image_lines = vec!["## Images".to_string()];
            for image in &self.images {
                if let Some(first_url) = image.urls.first() {
                    image_lines.push(format!("![{}]({})", image.alt_text, first_url));
                } else if let Some(placeholder) = &image.placeholder {
                    image_lines.push(format!("**Prompt:** {}", image.prompt));
                    image_lines.push(format!("**Placeholder:** {}", placeholder));
                    image_lines.push(format!("**Alt Text:** {}", image.alt_text));
                }
            }
            parts.push(image_lines.join("\n\n"));
        }

        parts.join("\n\n")
    }
}
