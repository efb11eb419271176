use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{SubmitError, GENERIC_FAILURE};
use crate::history::{EntryId, HistoryEntry, HistoryStore};
use crate::input::InputState;
use crate::request::DescriptionRequest;
use crate::transport::{DescriptionTransport, RawResponse, TransportError};

/// Where the controller is in the submit cycle. `Succeeded` and `Failed`
/// accept a new submission just like `Idle`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Pending,
    Succeeded,
    Failed { message: String },
}

/// Terminal result of one in-flight request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Success { description: String, model_used: String },
    Failure(SubmitError),
}

#[derive(Deserialize)]
struct SuccessBody {
    description: String,
    #[serde(default)]
    model: Option<String>,
}

/// Turns whatever came back from the transport into an outcome.
pub fn interpret(result: Result<RawResponse, TransportError>, requested_model: &str) -> SubmissionOutcome {
    let response = match result {
        Ok(response) => response,
        Err(e) => return SubmissionOutcome::Failure(SubmitError::Transport(e.message)),
    };

    if !response.is_success() {
        return SubmissionOutcome::Failure(SubmitError::Server {
            status: response.status,
            message: error_detail(&response.body).unwrap_or_else(|| GENERIC_FAILURE.to_string()),
        });
    }

    match serde_json::from_slice::<SuccessBody>(&response.body) {
        Ok(body) => SubmissionOutcome::Success {
            description: body.description,
            model_used: body
                .model
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| requested_model.to_string()),
        },
        Err(_) => SubmissionOutcome::Failure(SubmitError::MalformedResponse),
    }
}

/// `detail` from an error body, when it is a non-empty string.
fn error_detail(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    match value.get("detail")? {
        Value::String(detail) if !detail.is_empty() => Some(detail.clone()),
        _ => None,
    }
}

/// A request that has been validated and built but not yet sent. Sending
/// consumes it, so each submission resolves exactly once.
pub struct PendingSubmission {
    transport: Arc<dyn DescriptionTransport>,
    request: DescriptionRequest,
}

impl PendingSubmission {
    pub async fn send(self) -> SubmissionOutcome {
        let model = self.request.model().to_string();
        let result = self.transport.send(self.request).await;
        interpret(result, &model)
    }
}

pub struct SubmissionController {
    transport: Arc<dyn DescriptionTransport>,
    phase: Phase,
}

impl SubmissionController {
    pub fn new(transport: Arc<dyn DescriptionTransport>) -> Self {
        SubmissionController {
            transport,
            phase: Phase::Idle,
        }
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn is_pending(&self) -> bool {
        self.phase == Phase::Pending
    }

    /// Validates and builds the request, then moves to `Pending`. On error
    /// the phase is left untouched and nothing is sent.
    pub fn begin(&mut self, input: &InputState) -> Result<PendingSubmission, SubmitError> {
        if self.is_pending() {
            return Err(SubmitError::Busy);
        }
        let validated = input.validate_for_submit()?;
        let request = DescriptionRequest::build(validated);

        info!(
            model = %request.model(),
            prompt_chars = input.prompt_len(),
            "Submitting image for description"
        );
        self.phase = Phase::Pending;

        Ok(PendingSubmission {
            transport: Arc::clone(&self.transport),
            request,
        })
    }

    /// Records the outcome. Only a success touches `history`.
    pub fn finish(&mut self, outcome: SubmissionOutcome, history: &mut HistoryStore) -> Result<EntryId, SubmitError> {
        match outcome {
            SubmissionOutcome::Success {
                description,
                model_used,
            } => {
                let entry = HistoryEntry::stamped_now(description, model_used);
                let id = entry.id();
                info!(id = id.get(), model = %entry.model(), "Description received");
                history.prepend(entry);
                self.phase = Phase::Succeeded;
                Ok(id)
            }
            SubmissionOutcome::Failure(err) => {
                warn!(kind = err.kind(), "Submission failed: {}", err);
                self.phase = Phase::Failed {
                    message: err.to_string(),
                };
                Err(err)
            }
        }
    }

    pub async fn submit(&mut self, input: &InputState, history: &mut HistoryStore) -> Result<EntryId, SubmitError> {
        let pending = self.begin(input)?;
        let outcome = pending.send().await;
        self.finish(outcome, history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::ImageAttachment;
    use crate::request::{PartBody, MODEL_FIELD};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeTransport {
        replies: Mutex<VecDeque<Result<RawResponse, TransportError>>>,
        sent: Mutex<Vec<DescriptionRequest>>,
    }

    impl FakeTransport {
        fn replying(replies: Vec<Result<RawResponse, TransportError>>) -> Arc<Self> {
            Arc::new(FakeTransport {
                replies: Mutex::new(replies.into()),
                sent: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.sent.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl DescriptionTransport for FakeTransport {
        async fn send(&self, request: DescriptionRequest) -> Result<RawResponse, TransportError> {
            self.sent.lock().unwrap().push(request);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(TransportError::new("no reply queued")))
        }
    }

    fn ok(description: &str, model: &str) -> Result<RawResponse, TransportError> {
        Ok(RawResponse::new(
            200,
            format!(r#"{{"description":"{description}","model":"{model}"}}"#),
        ))
    }

    fn ready_input(model: &str) -> InputState {
        let mut input = InputState::default();
        input.set_image(ImageAttachment::new("shoe.png", "image/png", b"fakepng".to_vec()));
        input.set_prompt("Describe this image in detail.");
        input.set_model(model).unwrap();
        input
    }

    #[tokio::test]
    async fn test_success_prepends_entry() {
        let transport = FakeTransport::replying(vec![ok("A red shoe.", "gpt-4o")]);
        let mut controller = SubmissionController::new(transport.clone());
        let mut history = HistoryStore::new();

        let id = controller
            .submit(&ready_input("gpt-4o"), &mut history)
            .await
            .unwrap();

        assert_eq!(controller.phase(), &Phase::Succeeded);
        assert_eq!(history.len(), 1);
        let entry = history.all().next().unwrap();
        assert_eq!(entry.id(), id);
        assert_eq!(entry.text(), "A red shoe.");
        assert_eq!(entry.model(), "gpt-4o");
        assert!(!entry.timestamp().is_empty());

        let sent = transport.sent.lock().unwrap();
        let model_part = sent[0].parts().iter().find(|p| p.name == MODEL_FIELD);
        assert_eq!(model_part.map(|p| &p.body), Some(&PartBody::Text("gpt-4o".into())));
    }

    #[tokio::test]
    async fn test_server_error_with_detail() {
        let transport = FakeTransport::replying(vec![Ok(RawResponse::new(
            400,
            r#"{"detail":"Invalid image format"}"#,
        ))]);
        let mut controller = SubmissionController::new(transport);
        let mut history = HistoryStore::new();

        let err = controller
            .submit(&ready_input("gpt-4o"), &mut history)
            .await
            .unwrap_err();

        assert_eq!(err, SubmitError::Server { status: 400, message: "Invalid image format".into() });
        assert_eq!(
            controller.phase(),
            &Phase::Failed { message: "Invalid image format".into() }
        );
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn test_server_error_without_body() {
        let transport = FakeTransport::replying(vec![Ok(RawResponse::new(500, ""))]);
        let mut controller = SubmissionController::new(transport);
        let mut history = HistoryStore::new();

        let err = controller
            .submit(&ready_input("gpt-4o"), &mut history)
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Request failed");
        assert_eq!(controller.phase(), &Phase::Failed { message: "Request failed".into() });
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn test_missing_image_never_calls_transport() {
        let transport = FakeTransport::replying(vec![ok("unused", "gpt-4o")]);
        let mut controller = SubmissionController::new(transport.clone());
        let mut history = HistoryStore::new();
        let mut input = InputState::default();
        input.set_prompt("x");

        let err = controller.submit(&input, &mut history).await.unwrap_err();

        assert_eq!(err, SubmitError::MissingImage);
        assert_eq!(controller.phase(), &Phase::Idle);
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_three_successes_newest_first() {
        let transport = FakeTransport::replying(vec![
            ok("D1", "gpt-4o"),
            ok("D2", "gpt-4o"),
            ok("D3", "gpt-4o"),
        ]);
        let mut controller = SubmissionController::new(transport);
        let mut history = HistoryStore::new();
        let input = ready_input("gpt-4o");

        for _ in 0..3 {
            controller.submit(&input, &mut history).await.unwrap();
        }

        let texts: Vec<&str> = history.all().map(|e| e.text()).collect();
        assert_eq!(texts, vec!["D3", "D2", "D1"]);
    }

    #[tokio::test]
    async fn test_busy_while_pending() {
        let transport = FakeTransport::replying(vec![ok("A red shoe.", "gpt-4o")]);
        let mut controller = SubmissionController::new(transport.clone());
        let mut history = HistoryStore::new();
        let input = ready_input("gpt-4o");

        let pending = controller.begin(&input).unwrap();
        assert!(controller.is_pending());
        assert_eq!(controller.begin(&input).err(), Some(SubmitError::Busy));

        let outcome = pending.send().await;
        controller.finish(outcome, &mut history).unwrap();
        assert!(!controller.is_pending());
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_resubmit_after_failure() {
        let transport = FakeTransport::replying(vec![
            Err(TransportError::new("Network error: connection refused")),
            ok("A red shoe.", "gpt-4o"),
        ]);
        let mut controller = SubmissionController::new(transport);
        let mut history = HistoryStore::new();
        let input = ready_input("gpt-4o");

        let err = controller.submit(&input, &mut history).await.unwrap_err();
        assert_eq!(err, SubmitError::Transport("Network error: connection refused".into()));
        assert!(history.is_empty());

        controller.submit(&input, &mut history).await.unwrap();
        assert_eq!(controller.phase(), &Phase::Succeeded);
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn test_validation_error_keeps_previous_phase() {
        let transport = FakeTransport::replying(vec![Ok(RawResponse::new(500, ""))]);
        let mut controller = SubmissionController::new(transport);
        let mut history = HistoryStore::new();

        let _ = controller.submit(&ready_input("gpt-4o"), &mut history).await;
        let mut blank = ready_input("gpt-4o");
        blank.set_prompt("   ");
        let err = controller.submit(&blank, &mut history).await.unwrap_err();

        assert_eq!(err, SubmitError::MissingPrompt);
        assert_eq!(controller.phase(), &Phase::Failed { message: "Request failed".into() });
    }

    #[tokio::test]
    async fn test_malformed_success_body_fails_submission() {
        let transport = FakeTransport::replying(vec![Ok(RawResponse::new(200, "<html>oops</html>"))]);
        let mut controller = SubmissionController::new(transport.clone());
        let mut history = HistoryStore::new();

        let err = controller
            .submit(&ready_input("gpt-4o"), &mut history)
            .await
            .unwrap_err();

        assert_eq!(err, SubmitError::MalformedResponse);
        assert_eq!(controller.phase(), &Phase::Failed { message: "Request failed".into() });
        assert!(history.is_empty());
        assert_eq!(transport.calls(), 1);
    }

    #[test]
    fn test_interpret_malformed_success_body() {
        let outcome = interpret(Ok(RawResponse::new(200, "<html>oops</html>")), "gpt-4o");
        assert_eq!(outcome, SubmissionOutcome::Failure(SubmitError::MalformedResponse));

        let outcome = interpret(Ok(RawResponse::new(200, r#"{"model":"gpt-4o"}"#)), "gpt-4o");
        assert_eq!(outcome, SubmissionOutcome::Failure(SubmitError::MalformedResponse));
    }

    #[test]
    fn test_interpret_ignores_extra_fields_and_fills_model() {
        let outcome = interpret(
            Ok(RawResponse::new(200, r#"{"description":"A cat.","tokens":12}"#)),
            "gpt-5-nano",
        );
        assert_eq!(
            outcome,
            SubmissionOutcome::Success {
                description: "A cat.".into(),
                model_used: "gpt-5-nano".into(),
            }
        );
    }

    #[test]
    fn test_interpret_non_string_detail() {
        let outcome = interpret(
            Ok(RawResponse::new(422, r#"{"detail":[{"loc":["body","image"],"msg":"field required"}]}"#)),
            "gpt-4o",
        );
        assert_eq!(
            outcome,
            SubmissionOutcome::Failure(SubmitError::Server { status: 422, message: "Request failed".into() })
        );
    }
}
