//! Metadata builder: category, tags, and output filename.
//!
//! Metadata is non-critical: every failure mode degrades to a
//! deterministic fallback (keyword-based category, per-category tags,
//! title-derived filename), so this worker never aborts a run.

use std::sync::Arc;

use serde::Deserialize;

use crate::config::AppConfig;
use crate::models::PostMetadata;
use crate::services::{GenerationRequest, Message, TextGenerator};
use crate::utils::json_extraction::extract_json;

/// The fixed set of categories a post may be filed under.
pub const AVAILABLE_CATEGORIES: [&str; 9] = [
    "development",
    "computer",
    "home",
    "ai",
    "business",
    "crafting",
    "health",
    "diy",
    "recipes",
];

const SYSTEM_PROMPT: &str = "You are an SEO metadata specialist. You select categories, write \
tags, and name files for blog posts. Respond with JSON only.";

const METADATA_PROMPT: &str = r#"Generate metadata for this blog post.

TITLE: {title}
DESCRIPTION: {description}
CONTENT PREVIEW: {preview}

AVAILABLE CATEGORIES: {categories}

Respond with JSON in exactly this shape:
{
    "category": "one of the available categories",
    "tags": ["two", "to", "five", "tags"],
    "filename": "seo-friendly-filename.md"
}"#;

/// Role worker for metadata creation (step 14).
pub struct MetadataBuilder {
    generator: Arc<dyn TextGenerator>,
    model: String,
    temperature: f64,
    max_tokens: u32,
    min_tags: usize,
    max_tags: usize,
    preview_chars: usize,
}

/// Shape the LLM is asked to produce.
#[derive(Debug, Deserialize)]
struct MetadataResponse {
    #[serde(default)]
    category: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    filename: String,
}

impl MetadataBuilder {
    pub fn new(generator: Arc<dyn TextGenerator>, config: &AppConfig) -> Self {
        Self {
            generator,
            model: config.llm.default_model.clone(),
            temperature: config.llm.temperature,
            max_tokens: config.llm.max_tokens,
            min_tags: config.content.min_tags,
            max_tags: config.content.max_tags,
            preview_chars: config.content.preview_chars,
        }
    }

    /// Builds post metadata, degrading to deterministic fallbacks when
    /// the LLM fails or answers out of contract.
    pub async fn build(&self, title: &str, description: &str, content: &str) -> PostMetadata {
        let preview: String = content.chars().take(self.preview_chars).collect();
        let prompt = METADATA_PROMPT
            .replace("{title}", title)
            .replace("{description}", description)
            .replace("{preview}", &preview)
            .replace("{categories}", &AVAILABLE_CATEGORIES.join(", "));

        let request = GenerationRequest::new(
            self.model.clone(),
            vec![Message::system(SYSTEM_PROMPT), Message::user(prompt)],
        )
        .with_temperature(self.temperature)
        .with_max_tokens(self.max_tokens);

        let response = match self.generator.generate(request).await.into_result() {
            Ok(content) => parse_metadata(&content.content),
            Err(message) => {
                tracing::warn!(title, error = %message, "metadata generation failed, using fallbacks");
                None
            }
        };

        let (category, tags, filename) = match response {
            Some(parsed) => {
                let category = self.resolve_category(&parsed.category, title, content);
                let tags = self.resolve_tags(parsed.tags, &category);
                let filename = resolve_filename(&parsed.filename, title);
                (category, tags, filename)
            }
            None => {
                let category = keyword_category(title, content).to_string();
                let tags = self.resolve_tags(Vec::new(), &category);
                (category, tags, resolve_filename("", title))
            }
        };

        tracing::info!(title, category = %category, tags = tags.len(), "metadata created");
        PostMetadata {
            category,
            tags,
            filename,
        }
    }

    /// Validates the chosen category, falling back to keyword matching.
    fn resolve_category(&self, chosen: &str, title: &str, content: &str) -> String {
        let normalized = chosen.trim().to_lowercase();
        if AVAILABLE_CATEGORIES.contains(&normalized.as_str()) {
            normalized
        } else {
            tracing::warn!(chosen = %chosen, "category not in fixed set, using keyword fallback");
            keyword_category(title, content).to_string()
        }
    }

    /// Clamps tags to the configured bounds, topping up from the
    /// per-category fallback set when too few survive cleanup.
    fn resolve_tags(&self, raw: Vec<String>, category: &str) -> Vec<String> {
        let mut tags: Vec<String> = raw
            .into_iter()
            .map(|tag| tag.trim().to_lowercase())
            .filter(|tag| tag.len() > 1)
            .collect();
        tags.dedup();

        if tags.len() < self.min_tags {
            for fallback in fallback_tags(category) {
                if !tags.contains(&fallback.to_string()) {
                    tags.push(fallback.to_string());
                }
                if tags.len() >= self.min_tags {
                    break;
                }
            }
        }
        tags.truncate(self.max_tags);
        tags
    }
}

/// Parses the metadata JSON out of a free-form response.
fn parse_metadata(content: &str) -> Option<MetadataResponse> {
    let json = extract_json(content)?;
    serde_json::from_str(&json).ok()
}

/// Keyword-based category fallback.
fn keyword_category(title: &str, content: &str) -> &'static str {
    let text = format!("{} {}", title, content).to_lowercase();
    let rules: [(&[&str], &'static str); 9] = [
        (&["code", "programming", "software", "development"], "development"),
        (&["ai", "artificial intelligence", "machine learning"], "ai"),
        (&["computer", "tech", "technology"], "computer"),
        (&["business", "marketing", "entrepreneur"], "business"),
        (&["health", "fitness", "wellness"], "health"),
        (&["craft", "art", "creative"], "crafting"),
        (&["diy", "do it yourself", "project"], "diy"),
        (&["recipe", "cooking", "food"], "recipes"),
        (&["home", "house", "garden"], "home"),
    ];

    for (keywords, category) in rules {
        if keywords.iter().any(|keyword| text.contains(keyword)) {
            return category;
        }
    }
    "development"
}

/// Per-category fallback tags.
fn fallback_tags(category: &str) -> &'static [&'static str] {
    match category {
        "development" => &["programming", "coding", "software"],
        "computer" => &["technology", "tech", "computing"],
        "home" => &["household", "lifestyle", "home-improvement"],
        "ai" => &["artificial-intelligence", "machine-learning", "automation"],
        "business" => &["entrepreneurship", "marketing", "strategy"],
        "crafting" => &["art", "creative", "handmade"],
        "health" => &["wellness", "fitness", "lifestyle"],
        "diy" => &["projects", "how-to", "tutorial"],
        "recipes" => &["cooking", "food", "kitchen"],
        _ => &["blog", "article"],
    }
}

/// Cleans the proposed filename, deriving one from the title when the
/// proposal is unusable.
fn resolve_filename(proposed: &str, title: &str) -> String {
    let cleaned = slugify(proposed.trim().trim_end_matches(".md"));
    if !cleaned.is_empty() {
        return format!("{}.md", cleaned);
    }

    let from_title = slugify(title);
    if from_title.is_empty() {
        "blog-post.md".to_string()
    } else {
        format!("{}.md", from_title)
    }
}

/// Lowercases and reduces a string to `[a-z0-9-]`, collapsing runs of
/// other characters into single hyphens.
fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut last_was_hyphen = true; // suppress leading hyphen

    for ch in text.to_lowercase().chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch);
            last_was_hyphen = false;
        } else if !last_was_hyphen {
            slug.push('-');
            last_was_hyphen = true;
        }
    }

    slug.trim_end_matches('-').to_string()
}
