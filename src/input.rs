use anyhow::{Context, Result};
use std::path::Path;
use tracing::{info, warn};

use crate::config::{ModelsConfig, DEFAULT_MODELS};
use crate::error::SubmitError;

pub const PROMPT_MAX_CHARS: usize = 500;

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptPreset {
    Detail,
    Objects,
}

impl PromptPreset {
    pub const ALL: [PromptPreset; 2] = [PromptPreset::Detail, PromptPreset::Objects];

    pub fn text(self) -> &'static str {
        match self {
            PromptPreset::Detail => "Describe this image in detail.",
            PromptPreset::Objects => "What objects are present in this image?",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PromptPreset::Detail => "Describe this image in detail",
            PromptPreset::Objects => "What objects are in this image?",
        }
    }
}

/// An image picked by the user, kept byte-for-byte as read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAttachment {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageAttachment {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        ImageAttachment {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Reads the file off the UI thread.
    pub async fn from_path(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read image {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        let content_type = sniff_content_type(path, &bytes);
        Ok(ImageAttachment::new(file_name, content_type, bytes))
    }

    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }
}

/// Content type from the bytes first, then the extension.
fn sniff_content_type(path: &Path, bytes: &[u8]) -> String {
    image::guess_format(bytes)
        .or_else(|_| image::ImageFormat::from_path(path))
        .map(|format| format.to_mime_type().to_string())
        .unwrap_or_else(|_| FALLBACK_CONTENT_TYPE.to_string())
}

/// The set of model identifiers the user may pick from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelCatalog {
    models: Vec<String>,
    default: String,
}

impl ModelCatalog {
    pub fn from_config(config: &ModelsConfig) -> Self {
        let models: Vec<String> = if config.available.is_empty() {
            DEFAULT_MODELS.iter().map(|m| m.to_string()).collect()
        } else {
            config.available.clone()
        };
        let default = if models.contains(&config.default) {
            config.default.clone()
        } else {
            models[0].clone()
        };
        ModelCatalog { models, default }
    }

    pub fn contains(&self, model: &str) -> bool {
        self.models.iter().any(|m| m == model)
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    pub fn default_model(&self) -> &str {
        &self.default
    }
}

impl Default for ModelCatalog {
    fn default() -> Self {
        ModelCatalog::from_config(&ModelsConfig::default())
    }
}

/// What the user has entered so far. Not cleared after a submission.
#[derive(Debug, Clone)]
pub struct InputState {
    image: Option<ImageAttachment>,
    prompt: String,
    model: String,
    catalog: ModelCatalog,
}

/// Borrowed view of an [`InputState`] that passed validation. Only
/// [`InputState::validate_for_submit`] can produce one.
#[derive(Debug, Clone, Copy)]
pub struct ValidatedInput<'a> {
    image: &'a ImageAttachment,
    prompt: &'a str,
    model: &'a str,
}

impl<'a> ValidatedInput<'a> {
    pub fn image(&self) -> &'a ImageAttachment {
        self.image
    }

    pub fn prompt(&self) -> &'a str {
        self.prompt
    }

    pub fn model(&self) -> &'a str {
        self.model
    }
}

impl InputState {
    pub fn new(catalog: ModelCatalog) -> Self {
        let model = catalog.default_model().to_string();
        InputState {
            image: None,
            prompt: String::new(),
            model,
            catalog,
        }
    }

    pub fn set_image(&mut self, image: ImageAttachment) {
        if image.is_image() {
            info!(
                file = %image.file_name,
                content_type = %image.content_type,
                size = image.bytes.len(),
                "Image attached"
            );
        } else {
            warn!(
                file = %image.file_name,
                content_type = %image.content_type,
                "Attached file does not look like an image; sending as-is"
            );
        }
        self.image = Some(image);
    }

    /// Keeps at most [`PROMPT_MAX_CHARS`] code points; the rest is dropped.
    pub fn set_prompt(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.prompt = match text.char_indices().nth(PROMPT_MAX_CHARS) {
            Some((cut, _)) => text[..cut].to_string(),
            None => text,
        };
    }

    pub fn apply_preset(&mut self, preset: PromptPreset) {
        self.set_prompt(preset.text());
    }

    pub fn set_model(&mut self, model: &str) -> Result<(), SubmitError> {
        if !self.catalog.contains(model) {
            return Err(SubmitError::UnknownModel(model.to_string()));
        }
        self.model = model.to_string();
        Ok(())
    }

    pub fn image(&self) -> Option<&ImageAttachment> {
        self.image.as_ref()
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn prompt_len(&self) -> usize {
        self.prompt.chars().count()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    /// The image check comes first, so a missing image masks a missing prompt.
    pub fn validate_for_submit(&self) -> Result<ValidatedInput<'_>, SubmitError> {
        let image = self.image.as_ref().ok_or(SubmitError::MissingImage)?;
        if self.prompt.trim().is_empty() {
            return Err(SubmitError::MissingPrompt);
        }
        Ok(ValidatedInput {
            image,
            prompt: &self.prompt,
            model: &self.model,
        })
    }
}

impl Default for InputState {
    fn default() -> Self {
        InputState::new(ModelCatalog::default())
    }
}
