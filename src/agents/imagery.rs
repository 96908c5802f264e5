//! Image coordinator: prompt planning and image generation.
//!
//! Planning asks the LLM for a header prompt, supplemental prompts, and
//! style notes, parsed from `HEADER IMAGE:` / `SUPPLEMENTAL IMAGES:` /
//! `STYLE NOTES:` sections. Generation runs the image adapter per
//! prompt; a failed generation degrades that image to a placeholder
//! entry instead of aborting the run, since a post can ship without
//! pictures.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::error::AgentError;
use crate::models::{ImageAsset, ImageKind, ImagePlan};
use crate::services::{
    GenerationRequest, ImageGenerator, ImageRequest, Message, TextGenerator,
};

const AGENT_NAME: &str = "image coordinator";

const SYSTEM_PROMPT: &str = "You are an image planning specialist. You write detailed, \
effective prompts for image generation models. Structure every answer with the section \
headers HEADER IMAGE:, SUPPLEMENTAL IMAGES:, and STYLE NOTES:, using '- ' bullets or \
numbered lines inside SUPPLEMENTAL IMAGES.";

const PLAN_PROMPT: &str = r#"Create image prompts for this blog post.

TITLE: {title}
SUBHEADINGS:
{subheadings}
CONTENT PREVIEW: {preview}

Produce one compelling header image prompt, 2-3 supplemental image prompts for key
sections, and style guidance that keeps the set visually consistent."#;

/// Role worker for imagery steps (12-13).
pub struct ImageCoordinator {
    generator: Arc<dyn TextGenerator>,
    images: Arc<dyn ImageGenerator>,
    model: String,
    temperature: f64,
    max_tokens: u32,
    width: u32,
    height: u32,
    max_images: usize,
    preview_chars: usize,
}

impl ImageCoordinator {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        images: Arc<dyn ImageGenerator>,
        config: &AppConfig,
    ) -> Self {
        Self {
            generator,
            images,
            model: config.llm.default_model.clone(),
            temperature: config.llm.temperature,
            max_tokens: config.llm.max_tokens,
            width: config.image.width,
            height: config.image.height,
            max_images: config.image.max_images_per_post,
            preview_chars: config.content.preview_chars,
        }
    }

    /// Plans the image prompts for a post.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::CallFailed` when the generation adapter
    /// fails; an unparseable response degrades to a title-derived plan.
    pub async fn plan_images(
        &self,
        title: &str,
        content: &str,
        subheadings: &[String],
    ) -> Result<ImagePlan, AgentError> {
        let subheadings_list = subheadings
            .iter()
            .map(|s| format!("- {}", s))
            .collect::<Vec<_>>()
            .join("\n");
        let preview: String = content.chars().take(self.preview_chars).collect();
        let prompt = PLAN_PROMPT
            .replace("{title}", title)
            .replace("{subheadings}", &subheadings_list)
            .replace("{preview}", &preview);

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

        let mut plan = parse_image_plan(&content.content);
        if plan.header_prompt.is_empty() {
            tracing::warn!(title, "image plan had no header prompt, deriving one");
            plan.header_prompt = format!(
                "Professional header image representing {}, high quality, engaging",
                title
            );
        }
        tracing::info!(
            title,
            supplemental = plan.supplemental_prompts.len(),
            "image plan created"
        );
        Ok(plan)
    }

    /// Generates images for a plan, degrading failures to placeholders.
    ///
    /// The header image is generated first, then supplemental images in
    /// plan order, capped at the configured per-post maximum.
    pub async fn generate_images(&self, plan: &ImagePlan) -> Vec<ImageAsset> {
        let mut assets = Vec::new();

        assets.push(
            self.generate_one(&plan.header_prompt, ImageKind::Header, "Header image")
                .await,
        );

        for (index, prompt) in plan.supplemental_prompts.iter().enumerate() {
            if assets.len() >= self.max_images {
                tracing::warn!(
                    max_images = self.max_images,
                    dropped = plan.supplemental_prompts.len() - index,
                    "image budget reached, skipping remaining prompts"
                );
                break;
            }
            let alt_text = format!("Supplemental image {}", index + 1);
            assets.push(
                self.generate_one(prompt, ImageKind::Supplemental, &alt_text)
                    .await,
            );
        }

        assets
    }

    async fn generate_one(&self, prompt: &str, kind: ImageKind, alt_text: &str) -> ImageAsset {
        let request = ImageRequest::new(prompt).with_dimensions(self.width, self.height);
        let outcome = self.images.generate_image(request).await;

        match outcome.into_result() {
            Ok(generated) => ImageAsset {
                kind,
                prompt: prompt.to_string(),
                alt_text: alt_text.to_string(),
                urls: generated.urls,
                placeholder: None,
            },
            Err(message) => {
                tracing::warn!(prompt, error = %message, "image generation degraded to placeholder");
                ImageAsset {
                    kind,
                    prompt: prompt.to_string(),
                    alt_text: alt_text.to_string(),
                    urls: Vec::new(),
                    placeholder: Some(placeholder_marker(kind, prompt)),
                }
            }
        }
    }
}

fn placeholder_marker(kind: ImageKind, prompt: &str) -> String {
    match kind {
        ImageKind::Header => format!("[HEADER_IMAGE: {}]", prompt),
        ImageKind::Supplemental => format!("[SUPPLEMENTAL_IMAGE: {}]", prompt),
    }
}

/// Parses the sectioned image-plan response.
fn parse_image_plan(response: &str) -> ImagePlan {
    #[derive(PartialEq, Clone, Copy)]
    enum Section {
        None,
        Header,
        Supplemental,
        Style,
    }

    let mut plan = ImagePlan {
        header_prompt: String::new(),
        supplemental_prompts: Vec::new(),
        style_notes: String::new(),
    };
    let mut current = Section::None;

    for line in response.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let upper = line.to_uppercase();
        if upper.contains("HEADER IMAGE:") {
            current = Section::Header;
            continue;
        } else if upper.contains("SUPPLEMENTAL IMAGES:") {
            current = Section::Supplemental;
            continue;
        } else if upper.contains("STYLE NOTES:") {
            current = Section::Style;
            continue;
        }

        match current {
            Section::Header => {
                plan.header_prompt.push_str(line);
                plan.header_prompt.push(' ');
            }
            Section::Supplemental => {
                if let Some(prompt) = list_item_text(line) {
                    plan.supplemental_prompts.push(prompt);
                }
            }
            Section::Style => {
                plan.style_notes.push_str(line);
                plan.style_notes.push(' ');
            }
            Section::None => {}
        }
    }

    plan.header_prompt = plan.header_prompt.trim().to_string();
    plan.style_notes = plan.style_notes.trim().to_string();
    plan
}

/// Strips a `- ` bullet or `1. `-style numbering from a list line.
fn list_item_text(line: &str) -> Option<String> {
    if let Some(rest) = line.strip_prefix("- ") {
        let text = rest.trim();
        return (!text.is_empty()).then(|| text.to_string());
    }

    let mut parts = line.splitn(2, ". ");
    let (head, tail) = (parts.next()?, parts.next()?);
    if head.chars().all(|c| c.is_ascii_digit()) && !head.is_empty() {
        let text = tail.trim();
        return (!text.is_empty()).then(|| text.to_string());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{CallMeta, CallOutcome, GeneratedImages, Generation, Usage};
    use async_trait::async_trait;

    struct FixedGenerator {
        response: String,
    }

    #[async_trait]
    impl TextGenerator for FixedGenerator {
        async fn generate(&self, _request: GenerationRequest) -> CallOutcome<Generation> {
            CallOutcome::success(
                Generation {
                    content: self.response.clone(),
                    model: "test-model".to_string(),
                    usage: Usage::default(),
                },
                CallMeta::default(),
            )
        }
    }

    struct FixedImages {
        fail: bool,
    }

    #[async_trait]
    impl ImageGenerator for FixedImages {
        async fn generate_image(&self, request: ImageRequest) -> CallOutcome<GeneratedImages> {
            if self.fail {
                CallOutcome::failure("render farm down", CallMeta::default())
            } else {
                CallOutcome::success(
                    GeneratedImages {
                        urls: vec![format!("https://img.example/{}.png", request.prompt.len())],
                        prediction_id: "p1".to_string(),
                        model: "sdxl".to_string(),
                    },
                    CallMeta::default(),
                )
            }
        }
    }

    const PLAN_RESPONSE: &str = r#"HEADER IMAGE:
A wide shot of a tidy homelab rack, dramatic lighting

SUPPLEMENTAL IMAGES:
1. Close-up of a NAS with drive bays open
- A terminal showing a restic snapshot list

STYLE NOTES:
Consistent cool color palette, photographic"#;

    fn coordinator(fail_images: bool) -> ImageCoordinator {
        ImageCoordinator::new(
            Arc::new(FixedGenerator {
                response: PLAN_RESPONSE.to_string(),
            }),
            Arc::new(FixedImages { fail: fail_images }),
            &AppConfig::default(),
        )
    }

    #[test]
    fn test_parse_image_plan_sections() {
        let plan = parse_image_plan(PLAN_RESPONSE);
        assert!(plan.header_prompt.contains("homelab rack"));
        assert_eq!(plan.supplemental_prompts.len(), 2);
        assert!(plan.supplemental_prompts[0].contains("NAS"));
        assert!(plan.style_notes.contains("palette"));
    }

    #[test]
    fn test_parse_empty_response_gives_empty_plan() {
        let plan = parse_image_plan("nothing structured here");
        assert!(plan.header_prompt.is_empty());
        assert!(plan.supplemental_prompts.is_empty());
    }

    #[test]
    fn test_list_item_text() {
        assert_eq!(list_item_text("- a prompt"), Some("a prompt".to_string()));
        assert_eq!(list_item_text("2. another"), Some("another".to_string()));
        assert_eq!(list_item_text("plain line"), None);
    }

    #[tokio::test]
    async fn test_plan_images_parses_response() {
        let plan = coordinator(false)
            .plan_images("Title", "content", &["A".to_string()])
            .await
            .expect("plan succeeds");
        assert!(!plan.header_prompt.is_empty());
        assert_eq!(plan.supplemental_prompts.len(), 2);
    }

    #[tokio::test]
    async fn test_generate_images_success() {
        let coordinator = coordinator(false);
        let plan = coordinator
            .plan_images("Title", "content", &[])
            .await
            .expect("plan succeeds");
        let assets = coordinator.generate_images(&plan).await;

        assert_eq!(assets.len(), 3);
        assert_eq!(assets[0].kind, ImageKind::Header);
        assert!(assets.iter().all(|a| !a.urls.is_empty()));
        assert!(assets.iter().all(|a| a.placeholder.is_none()));
    }

    #[tokio::test]
    async fn test_generate_images_degrades_to_placeholders() {
        let coordinator = coordinator(true);
        let plan = ImagePlan {
            header_prompt: "header".to_string(),
            supplemental_prompts: vec!["supp".to_string()],
            style_notes: String::new(),
        };
        let assets = coordinator.generate_images(&plan).await;

        assert_eq!(assets.len(), 2);
        assert!(assets.iter().all(|a| a.urls.is_empty()));
        assert!(assets[0]
            .placeholder
            .as_deref()
            .unwrap()
            .starts_with("[HEADER_IMAGE:"));
        assert!(assets[1]
            .placeholder
            .as_deref()
            .unwrap()
            .starts_with("[SUPPLEMENTAL_IMAGE:"));
    }

    #[tokio::test]
    async fn test_generate_images_caps_at_budget() {
        let mut config = AppConfig::default();
        config.image.max_images_per_post = 2;
        let coordinator = ImageCoordinator::new(
            Arc::new(FixedGenerator {
                response: PLAN_RESPONSE.to_string(),
            }),
            Arc::new(FixedImages { fail: false }),
            &config,
        );

        let plan = ImagePlan {
            header_prompt: "header".to_string(),
            supplemental_prompts: vec!["a".to_string(), "b".to_string(), "c".to_string()],
            style_notes: String::new(),
        };
        let assets = coordinator.generate_images(&plan).await;
        assert_eq!(assets.len(), 2);
    }
}
