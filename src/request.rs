use reqwest::multipart::{Form, Part};

use crate::input::ValidatedInput;

pub const PROMPT_FIELD: &str = "prompt";
pub const IMAGE_FIELD: &str = "image";
pub const MODEL_FIELD: &str = "model_name";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartBody {
    Text(String),
    File {
        file_name: String,
        content_type: String,
        bytes: Vec<u8>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormPart {
    pub name: &'static str,
    pub body: PartBody,
}

/// An owned multipart payload, ready to hand to a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptionRequest {
    parts: Vec<FormPart>,
    model: String,
}

impl DescriptionRequest {
    /// Parts in wire order: prompt, image, model_name.
    pub fn build(input: ValidatedInput<'_>) -> Self {
        let image = input.image();
        let parts = vec![
            FormPart {
                name: PROMPT_FIELD,
                body: PartBody::Text(input.prompt().to_string()),
            },
            FormPart {
                name: IMAGE_FIELD,
                body: PartBody::File {
                    file_name: image.file_name.clone(),
                    content_type: image.content_type.clone(),
                    bytes: image.bytes.clone(),
                },
            },
            FormPart {
                name: MODEL_FIELD,
                body: PartBody::Text(input.model().to_string()),
            },
        ];
        DescriptionRequest {
            parts,
            model: input.model().to_string(),
        }
    }

    pub fn parts(&self) -> &[FormPart] {
        &self.parts
    }

    /// The model identifier that was requested.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// A content type that does not parse as a mime type is left off the
    /// image part rather than failing the request.
    pub fn into_form(self) -> reqwest::Result<Form> {
        let mut form = Form::new();
        for part in self.parts {
            form = match part.body {
                PartBody::Text(text) => form.text(part.name, text),
                PartBody::File {
                    file_name,
                    content_type,
                    bytes,
                } => {
                    let file = Part::bytes(bytes).file_name(file_name);
                    let file = if content_type.parse::<mime::Mime>().is_ok() {
                        file.mime_str(&content_type)?
                    } else {
                        file
                    };
                    form.part(part.name, file)
                }
            };
        }
        Ok(form)
    }
}
