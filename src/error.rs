use thiserror::Error;

pub const GENERIC_FAILURE: &str = "Request failed";

/// Everything that can end a submission attempt. The `Display` text is what
/// the user sees.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("Please upload an image first.")]
    MissingImage,

    #[error("Please enter a prompt.")]
    MissingPrompt,

    #[error("Unknown model: {0}")]
    UnknownModel(String),

    #[error("A description is already being generated.")]
    Busy,

    /// The request never reached the server.
    #[error("{0}")]
    Transport(String),

    #[error("{message}")]
    Server { status: u16, message: String },

    /// 2xx with a body that is not the expected JSON.
    #[error("Request failed")]
    MalformedResponse,
}

impl SubmitError {
    pub fn kind(&self) -> &'static str {
        match self {
            SubmitError::MissingImage => "missing_image",
            SubmitError::MissingPrompt => "missing_prompt",
            SubmitError::UnknownModel(_) => "unknown_model",
            SubmitError::Busy => "busy",
            SubmitError::Transport(_) => "transport",
            SubmitError::Server { .. } => "server",
            SubmitError::MalformedResponse => "malformed_response",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(SubmitError::MissingImage.to_string(), "Please upload an image first.");
        assert_eq!(SubmitError::MissingPrompt.to_string(), "Please enter a prompt.");
        assert_eq!(SubmitError::MalformedResponse.to_string(), GENERIC_FAILURE);
        assert_eq!(
            SubmitError::Server { status: 400, message: "Invalid image format".into() }.to_string(),
            "Invalid image format"
        );
        assert_eq!(
            SubmitError::Transport("connection refused".into()).to_string(),
            "connection refused"
        );
    }

    #[test]
    fn test_kinds() {
        assert_eq!(SubmitError::MissingImage.kind(), "missing_image");
        assert_eq!(SubmitError::Busy.kind(), "busy");
        assert_eq!(SubmitError::Server { status: 500, message: String::new() }.kind(), "server");
    }
}
