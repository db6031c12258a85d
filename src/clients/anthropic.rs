use futures_util::StreamExt;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use crate::config::Config;
use crate::services::llm_service::{
    CompletionProvider, CompletionRequest, CompletionStream, LlmError,
};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// HTTP client for the Anthropic messages API
#[derive(Debug, Clone)]
pub struct AnthropicClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: String,
}

impl AnthropicClient {
    pub fn new(base_url: String, api_key: String, model: String, max_tokens: u32) -> Self {
        // Only the connect phase is bounded: streaming responses stay open
        // for as long as the completion runs.
        let client = Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("Failed to build reqwest client");

        Self {
            client,
            base_url,
            api_key,
            model,
            max_tokens,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.anthropic_base_url.clone(),
            config.anthropic_api_key.clone().unwrap_or_default(),
            config.anthropic_model.clone(),
            config.anthropic_max_tokens,
        )
    }

    async fn send(
        &self,
        request: &CompletionRequest,
        stream: bool,
    ) -> Result<reqwest::Response, LlmError> {
        let body = json!({
            "model": &self.model,
            "max_tokens": self.max_tokens,
            "temperature": 0.7,
            "system": &request.system,
            "messages": &request.messages,
            "stream": stream,
        });

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let payload = response.text().await.unwrap_or_default();
        error!("Provider request failed with status {}: {}", status, payload);
        Err(classify_error(status, &payload))
    }
}

#[async_trait::async_trait]
impl CompletionProvider for AnthropicClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
        let response = self.send(&request, false).await?;
        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| LlmError::MalformedResponse(e.to_string()))?;

        match parsed.content.iter().find(|b| b.block_type == "text") {
            Some(block) => {
                info!("Provider response generated successfully");
                Ok(block.text.clone())
            }
            None => Err(LlmError::MalformedResponse(
                "no text content block in response".to_string(),
            )),
        }
    }

    async fn stream(&self, request: CompletionRequest) -> Result<CompletionStream, LlmError> {
        let response = self.send(&request, true).await?;
        let byte_stream = response.bytes_stream();

        let stream = async_stream::stream! {
            futures_util::pin_mut!(byte_stream);
            let mut buffer = String::new();

            while let Some(chunk) = byte_stream.next().await {
                let bytes = match chunk {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        yield Err(LlmError::Transport(e));
                        return;
                    }
                };
                buffer.push_str(&String::from_utf8_lossy(&bytes));

                // SSE frames are separated by a blank line; a frame may span
                // several network chunks.
                while let Some(pos) = buffer.find("\n\n") {
                    let frame = buffer[..pos].to_string();
                    buffer.drain(..pos + 2);
                    match parse_stream_frame(&frame) {
                        Ok(Some(SseEvent::Text(text))) => yield Ok(text),
                        Ok(Some(SseEvent::Stop)) => {
                            info!("Provider streaming response completed");
                            return;
                        }
                        Ok(None) => {}
                        Err(e) => {
                            yield Err(e);
                            return;
                        }
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

/// Map a non-success provider status to the error taxonomy
pub(crate) fn classify_error(status: StatusCode, payload: &str) -> LlmError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return LlmError::RateLimited;
    }
    if status == StatusCode::PAYMENT_REQUIRED {
        return LlmError::QuotaExceeded;
    }

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(payload) {
        let error_type = value["error"]["type"].as_str().unwrap_or_default();
        let message = value["error"]["message"].as_str().unwrap_or_default();
        if error_type == "rate_limit_error" || message.contains("rate_limit") {
            return LlmError::RateLimited;
        }
        if message.contains("quota") {
            return LlmError::QuotaExceeded;
        }
        if !message.is_empty() {
            return LlmError::Api(message.to_string());
        }
    }
    LlmError::Api(format!("provider returned status {}", status))
}

#[derive(Debug, PartialEq)]
pub(crate) enum SseEvent {
    Text(String),
    Stop,
}

/// Parse one SSE frame from the provider stream
pub(crate) fn parse_stream_frame(frame: &str) -> Result<Option<SseEvent>, LlmError> {
    let data: String = frame
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(str::trim_start)
        .collect::<Vec<_>>()
        .join("");

    if data.is_empty() {
        return Ok(None);
    }

    let value: serde_json::Value = serde_json::from_str(&data)
        .map_err(|e| LlmError::MalformedResponse(format!("bad stream frame: {}", e)))?;

    match value["type"].as_str() {
        Some("content_block_delta") => {
            if value["delta"]["type"].as_str() == Some("text_delta") {
                let text = value["delta"]["text"].as_str().unwrap_or_default();
                Ok(Some(SseEvent::Text(text.to_string())))
            } else {
                Ok(None)
            }
        }
        Some("message_stop") => Ok(Some(SseEvent::Stop)),
        Some("error") => {
            let error_type = value["error"]["type"].as_str().unwrap_or_default();
            let message = value["error"]["message"]
                .as_str()
                .unwrap_or("stream error")
                .to_string();
            if error_type == "rate_limit_error" {
                Err(LlmError::RateLimited)
            } else {
                Err(LlmError::Api(message))
            }
        }
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChatTurn;
    use futures_util::StreamExt;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> CompletionRequest {
        CompletionRequest {
            system: "You are a curriculum assistant.".to_string(),
            messages: vec![ChatTurn {
                role: "user".to_string(),
                content: "Plan a course".to_string(),
            }],
        }
    }

    fn client(base_url: String) -> AnthropicClient {
        AnthropicClient::new(base_url, "test-key".to_string(), "test-model".to_string(), 256)
    }

    #[test]
    fn text_delta_frames_are_parsed() {
        let frame = "event: content_block_delta\ndata: {\"type\":\"content_block_delta\",\"delta\":{\"type\":\"text_delta\",\"text\":\"Hel\"}}";
        assert_eq!(
            parse_stream_frame(frame).unwrap(),
            Some(SseEvent::Text("Hel".to_string()))
        );
    }

    #[test]
    fn non_text_frames_are_skipped() {
        let frame = "event: message_start\ndata: {\"type\":\"message_start\"}";
        assert_eq!(parse_stream_frame(frame).unwrap(), None);
        assert_eq!(parse_stream_frame(": ping").unwrap(), None);
    }

    #[test]
    fn message_stop_ends_the_stream() {
        let frame = "data: {\"type\":\"message_stop\"}";
        assert_eq!(parse_stream_frame(frame).unwrap(), Some(SseEvent::Stop));
    }

    #[test]
    fn stream_error_frames_map_to_taxonomy() {
        let frame = "data: {\"type\":\"error\",\"error\":{\"type\":\"rate_limit_error\",\"message\":\"slow down\"}}";
        assert!(matches!(
            parse_stream_frame(frame),
            Err(LlmError::RateLimited)
        ));
    }

    #[test]
    fn status_classification_covers_taxonomy() {
        assert!(matches!(
            classify_error(StatusCode::TOO_MANY_REQUESTS, ""),
            LlmError::RateLimited
        ));
        assert!(matches!(
            classify_error(StatusCode::PAYMENT_REQUIRED, ""),
            LlmError::QuotaExceeded
        ));
        assert!(matches!(
            classify_error(
                StatusCode::BAD_REQUEST,
                "{\"error\":{\"type\":\"invalid_request_error\",\"message\":\"quota exhausted\"}}"
            ),
            LlmError::QuotaExceeded
        ));
        assert!(matches!(
            classify_error(StatusCode::INTERNAL_SERVER_ERROR, "oops"),
            LlmError::Api(_)
        ));
    }

    #[tokio::test]
    async fn complete_returns_first_text_block() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content": [{"type": "text", "text": "A four-week outline"}]
            })))
            .mount(&server)
            .await;

        let text = client(server.uri()).complete(request()).await.unwrap();
        assert_eq!(text, "A four-week outline");
    }

    #[tokio::test]
    async fn complete_maps_rate_limit_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let result = client(server.uri()).complete(request()).await;
        assert!(matches!(result, Err(LlmError::RateLimited)));
    }

    #[tokio::test]
    async fn stream_yields_fragments_in_order() {
        let body = concat!(
            "event: message_start\n",
            "data: {\"type\":\"message_start\"}\n\n",
            "data: {\"type\":\"content_block_delta\",\"delta\":{\"type\":\"text_delta\",\"text\":\"Hel\"}}\n\n",
            "data: {\"type\":\"content_block_delta\",\"delta\":{\"type\":\"text_delta\",\"text\":\"lo \"}}\n\n",
            "data: {\"type\":\"content_block_delta\",\"delta\":{\"type\":\"text_delta\",\"text\":\"world\"}}\n\n",
            "data: {\"type\":\"message_stop\"}\n\n",
        );
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(&server)
            .await;

        let stream = client(server.uri()).stream(request()).await.unwrap();
        let fragments: Vec<String> = stream.map(|item| item.unwrap()).collect().await;
        assert_eq!(fragments, vec!["Hel", "lo ", "world"]);
    }
}
