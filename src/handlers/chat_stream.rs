use axum::{
    extract::{Extension, State},
    http::StatusCode,
    response::sse::{Event, Sse},
    Json,
};
use futures_util::{Stream, StreamExt};
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{error, info};

use crate::models::{validation_error, ChatRequest, CurriculumContext, ErrorResponse, StreamFrame};
use crate::routes::auth_middleware::AuthUser;
use crate::services::llm_service::{extract_suggestions, LlmService};
use crate::AppState;

/// Streaming chat completion relayed to the browser as Server-Sent Events.
///
/// The provider stream lives inside the response stream: when the client
/// disconnects axum drops the stream, which drops the provider request with
/// it. No terminal event is emitted in that case.
pub async fn chat_stream(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<ChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, (StatusCode, Json<ErrorResponse>)>
{
    let errors = request.validate();
    if !errors.is_empty() {
        return Err(validation_error(errors));
    }

    info!("Streaming chat started for user {}", user.id);
    let frames = relay_frames(app_state.llm.clone(), request.message, request.context);
    let stream = frames.map(|frame| {
        let data = serde_json::to_string(&frame).unwrap_or_default();
        Ok(Event::default().data(data))
    });
    Ok(Sse::new(stream))
}

/// Relay the provider stream as wire frames: `start`, then any number of
/// `chunk`s, then exactly one of `end` or `error`. Never both, and never a
/// `chunk` after the terminal frame.
pub(crate) fn relay_frames(
    llm: LlmService,
    message: String,
    context: CurriculumContext,
) -> impl Stream<Item = StreamFrame> {
    async_stream::stream! {
        yield StreamFrame::Start {
            message: "Generating response...".to_string(),
        };

        let upstream = match llm.stream_response(&message, &context).await {
            Ok(upstream) => upstream,
            Err(e) => {
                error!("Provider stream failed to open: {}", e);
                yield StreamFrame::Error {
                    message: e.user_message().to_string(),
                };
                return;
            }
        };
        futures_util::pin_mut!(upstream);

        let mut full_message = String::new();
        while let Some(item) = upstream.next().await {
            match item {
                Ok(fragment) => {
                    full_message.push_str(&fragment);
                    yield StreamFrame::Chunk { content: fragment };
                }
                Err(e) => {
                    error!("Provider streaming error: {}", e);
                    yield StreamFrame::Error {
                        message: e.user_message().to_string(),
                    };
                    return;
                }
            }
        }

        // Suggestions are derived only once the full text is known
        let suggestions = extract_suggestions(&full_message, &context);
        info!("Streaming chat completed ({} chars)", full_message.chars().count());
        yield StreamFrame::End {
            suggestions,
            full_message,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::llm_service::{
        CompletionProvider, CompletionRequest, CompletionStream, LlmError,
    };
    use async_trait::async_trait;
    use futures_util::stream;

    enum Script {
        Chunks(Vec<&'static str>),
        FailAfter(Vec<&'static str>),
        FailToOpen,
    }

    struct ScriptedProvider {
        script: Script,
    }

    #[async_trait]
    impl CompletionProvider for ScriptedProvider {
        async fn complete(&self, _request: CompletionRequest) -> Result<String, LlmError> {
            match &self.script {
                Script::Chunks(chunks) => Ok(chunks.concat()),
                _ => Err(LlmError::Api("scripted failure".to_string())),
            }
        }

        async fn stream(&self, _request: CompletionRequest) -> Result<CompletionStream, LlmError> {
            match &self.script {
                Script::Chunks(chunks) => {
                    let items: Vec<Result<String, LlmError>> =
                        chunks.iter().map(|c| Ok(c.to_string())).collect();
                    Ok(Box::pin(stream::iter(items)))
                }
                Script::FailAfter(chunks) => {
                    let mut items: Vec<Result<String, LlmError>> =
                        chunks.iter().map(|c| Ok(c.to_string())).collect();
                    items.push(Err(LlmError::RateLimited));
                    Ok(Box::pin(stream::iter(items)))
                }
                Script::FailToOpen => Err(LlmError::RateLimited),
            }
        }
    }

    fn service(script: Script) -> LlmService {
        LlmService::new(Arc::new(ScriptedProvider { script }))
    }

    async fn collect(script: Script) -> Vec<StreamFrame> {
        relay_frames(
            service(script),
            "plan a course".to_string(),
            CurriculumContext::default(),
        )
        .collect()
        .await
    }

    fn terminal_count(frames: &[StreamFrame]) -> usize {
        frames
            .iter()
            .filter(|f| matches!(f, StreamFrame::End { .. } | StreamFrame::Error { .. }))
            .count()
    }

    #[tokio::test]
    async fn chunks_are_relayed_in_order_and_end_carries_the_concatenation() {
        let frames = collect(Script::Chunks(vec!["Hel", "lo ", "world"])).await;

        assert!(matches!(frames[0], StreamFrame::Start { .. }));
        let chunks: Vec<&str> = frames
            .iter()
            .filter_map(|f| match f {
                StreamFrame::Chunk { content } => Some(content.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(chunks, vec!["Hel", "lo ", "world"]);

        match frames.last().unwrap() {
            StreamFrame::End { full_message, .. } => assert_eq!(full_message, "Hello world"),
            other => panic!("expected end frame, got {:?}", other),
        }
        assert_eq!(terminal_count(&frames), 1);
    }

    #[tokio::test]
    async fn empty_stream_still_emits_exactly_one_terminal_frame() {
        let frames = collect(Script::Chunks(vec![])).await;
        assert_eq!(frames.len(), 2);
        assert!(matches!(frames[0], StreamFrame::Start { .. }));
        match &frames[1] {
            StreamFrame::End { full_message, suggestions } => {
                assert_eq!(full_message, "");
                // short output yields no suggestions
                assert!(suggestions.is_empty());
            }
            other => panic!("expected end frame, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn mid_stream_failure_ends_with_error_and_no_end() {
        let frames = collect(Script::FailAfter(vec!["partial"])).await;

        assert!(matches!(frames[0], StreamFrame::Start { .. }));
        assert!(matches!(frames[1], StreamFrame::Chunk { .. }));
        match frames.last().unwrap() {
            StreamFrame::Error { message } => {
                assert!(message.contains("rate limit"));
            }
            other => panic!("expected error frame, got {:?}", other),
        }
        assert!(!frames.iter().any(|f| matches!(f, StreamFrame::End { .. })));
        assert_eq!(terminal_count(&frames), 1);
    }

    #[tokio::test]
    async fn failure_to_open_emits_error_without_chunks() {
        let frames = collect(Script::FailToOpen).await;
        assert_eq!(frames.len(), 2);
        assert!(matches!(frames[0], StreamFrame::Start { .. }));
        assert!(matches!(frames[1], StreamFrame::Error { .. }));
    }

    #[tokio::test]
    async fn long_replies_carry_suggestions() {
        let chunk: &'static str =
            "This outline spans several sessions and covers the fundamentals in depth, \
             including hands-on practice with current tooling and a capstone project.";
        let frames = collect(Script::Chunks(vec![chunk])).await;
        match frames.last().unwrap() {
            StreamFrame::End { suggestions, .. } => assert_eq!(suggestions.len(), 3),
            other => panic!("expected end frame, got {:?}", other),
        }
    }
}
