//! OpenRouter chat-completions client (OpenAI-compatible wire format).
//!
//! One client covers the three call shapes the agent needs: plain
//! completions, completions with tool definitions, and SSE streaming with
//! text deltas forwarded over a channel while tool calls are assembled
//! from their interleaved argument fragments.

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::{AgentError, Result};
use crate::sse::SseDecoder;
use crate::tool::ToolDefinition;

const OPENROUTER_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// A base64-encoded image to attach to a user message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageSource {
    pub media_type: String,
    pub base64: String,
}

impl ImageSource {
    fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.base64)
    }
}

/// One part of a multimodal message body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrlPart },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageUrlPart {
    pub url: String,
}

/// Message content: plain text for most turns, content parts when images
/// are attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// A single message in chat-completions wire format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderMessage {
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<MessageContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<WireToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ProviderMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: Some(MessageContent::Text(content.into())),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: Some(MessageContent::Text(content.into())),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// User message carrying images ahead of the text, mirroring how the
    /// upstream APIs want mixed content ordered.
    pub fn user_with_images(text: impl Into<String>, images: &[ImageSource]) -> Self {
        let mut parts: Vec<ContentPart> = images
            .iter()
            .map(|img| ContentPart::ImageUrl {
                image_url: ImageUrlPart {
                    url: img.to_data_url(),
                },
            })
            .collect();
        parts.push(ContentPart::Text { text: text.into() });
        Self {
            role: "user".into(),
            content: Some(MessageContent::Parts(parts)),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn assistant(content: Option<String>, tool_calls: &[ToolCall]) -> Self {
        let wire_calls = if tool_calls.is_empty() {
            None
        } else {
            Some(tool_calls.iter().map(WireToolCall::from).collect())
        };
        Self {
            role: "assistant".into(),
            content: content.map(MessageContent::Text),
            tool_calls: wire_calls,
            tool_call_id: None,
        }
    }

    pub fn tool_result(call_id: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            role: "tool".into(),
            content: Some(MessageContent::Text(output.into())),
            tool_calls: None,
            tool_call_id: Some(call_id.into()),
        }
    }
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    /// Raw JSON argument string as sent by the model
    pub arguments: String,
}

/// The assembled outcome of one model turn.
#[derive(Debug, Clone, Default)]
pub struct CompletedTurn {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
}

impl CompletedTurn {
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Chat-completions client for OpenRouter.
#[derive(Clone)]
pub struct LlmClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl LlmClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    /// Build a client from `OPENROUTER_API_KEY` and (optionally)
    /// `OPENROUTER_MODEL`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENROUTER_API_KEY")
            .map_err(|_| AgentError::ProviderError("OPENROUTER_API_KEY not set".to_string()))?;
        let model =
            std::env::var("OPENROUTER_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        Ok(Self::new(api_key, model))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn send(
        &self,
        messages: &[ProviderMessage],
        tools: &[ToolDefinition],
        stream: bool,
    ) -> Result<reqwest::Response> {
        let body = ChatCompletionRequest {
            model: self.model.clone(),
            messages: messages.to_vec(),
            tools: if tools.is_empty() {
                None
            } else {
                Some(tools.iter().map(WireTool::from).collect())
            },
            stream,
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(OPENROUTER_API_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response
                .text()
                .await
                .unwrap_or_else(|e| format!("(failed to read body: {e})"));
            return Err(AgentError::ProviderError(format!(
                "LLM API error {status}: {text}"
            )));
        }
        Ok(response)
    }

    /// Non-streaming completion.
    pub async fn complete(
        &self,
        messages: &[ProviderMessage],
        tools: &[ToolDefinition],
    ) -> Result<CompletedTurn> {
        let response = self.send(messages, tools, false).await?;
        let result: ChatCompletionResponse = response.json().await?;

        let choice = result
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::ProviderError("No choices in response".to_string()))?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| ToolCall {
                id: tc.id,
                name: tc.function.name,
                arguments: tc.function.arguments,
            })
            .collect();

        Ok(CompletedTurn {
            content: choice.message.content.filter(|c| !c.is_empty()),
            tool_calls,
        })
    }

    /// Streaming completion. Text deltas are forwarded over `tx` as they
    /// arrive; the assembled turn (full text plus any tool calls) is
    /// returned once the stream closes.
    pub async fn stream(
        &self,
        messages: &[ProviderMessage],
        tools: &[ToolDefinition],
        tx: mpsc::Sender<String>,
    ) -> Result<CompletedTurn> {
        let response = self.send(messages, tools, true).await?;

        // In-flight tool calls tracked by stream index: argument fragments
        // for parallel calls arrive interleaved.
        struct InFlightCall {
            id: String,
            name: String,
            args: String,
        }
        let mut in_flight: HashMap<usize, InFlightCall> = HashMap::new();
        let mut content = String::new();

        let mut byte_stream = response.bytes_stream();
        let mut decoder = SseDecoder::new();

        while let Some(chunk) = byte_stream.next().await {
            let chunk = chunk?;
            for frame in decoder.push(&chunk) {
                if frame.is_done() {
                    continue;
                }
                let Some(chunk_data) = frame.try_parse::<ChatStreamChunk>() else {
                    debug!("Skipping unparseable stream frame");
                    continue;
                };

                for choice in chunk_data.choices {
                    if let Some(delta_text) = choice.delta.content {
                        if !delta_text.is_empty() {
                            content.push_str(&delta_text);
                            // Receiver going away just means the client hung
                            // up; keep draining so the turn still assembles.
                            let _ = tx.send(delta_text).await;
                        }
                    }

                    for tc in choice.delta.tool_calls.unwrap_or_default() {
                        let call = in_flight.entry(tc.index).or_insert_with(|| InFlightCall {
                            id: String::new(),
                            name: String::new(),
                            args: String::new(),
                        });
                        if let Some(id) = tc.id {
                            call.id = id;
                        }
                        if let Some(function) = tc.function {
                            if let Some(name) = function.name {
                                call.name = name;
                            }
                            if let Some(args) = function.arguments {
                                call.args.push_str(&args);
                            }
                        }
                    }
                }
            }
        }

        let mut indices: Vec<usize> = in_flight.keys().copied().collect();
        indices.sort_unstable();
        let tool_calls = indices
            .into_iter()
            .filter_map(|i| in_flight.remove(&i))
            .filter(|c| !c.name.is_empty())
            .map(|c| ToolCall {
                id: c.id,
                name: c.name,
                arguments: c.args,
            })
            .collect();

        Ok(CompletedTurn {
            content: (!content.is_empty()).then_some(content),
            tool_calls,
        })
    }
}

// ============================================================================
// Wire types (OpenAI-compatible chat completions)
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ProviderMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<WireTool>>,
    stream: bool,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct WireTool {
    #[serde(rename = "type")]
    tool_type: String,
    function: WireFunction,
}

impl From<&ToolDefinition> for WireTool {
    fn from(def: &ToolDefinition) -> Self {
        Self {
            tool_type: "function".into(),
            function: WireFunction {
                name: def.name.clone(),
                description: def.description.clone(),
                parameters: def.parameters.clone(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct WireFunction {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub call_type: String,
    pub function: WireToolCallFunction,
}

impl From<&ToolCall> for WireToolCall {
    fn from(tc: &ToolCall) -> Self {
        Self {
            id: tc.id.clone(),
            call_type: "function".into(),
            function: WireToolCallFunction {
                name: tc.name.clone(),
                arguments: tc.arguments.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireToolCallFunction {
    pub name: String,
    pub arguments: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ChatStreamChunk {
    choices: Vec<ChatStreamChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatStreamChoice {
    delta: ChatStreamDelta,
}

#[derive(Debug, Deserialize)]
struct ChatStreamDelta {
    content: Option<String>,
    tool_calls: Option<Vec<ChatStreamToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ChatStreamToolCall {
    #[serde(default)]
    index: usize,
    id: Option<String>,
    function: Option<ChatStreamFunction>,
}

#[derive(Debug, Deserialize)]
struct ChatStreamFunction {
    name: Option<String>,
    arguments: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_with_images_orders_images_first() {
        let images = vec![ImageSource {
            media_type: "image/jpeg".into(),
            base64: "abc123".into(),
        }];
        let msg = ProviderMessage::user_with_images("what happened here?", &images);

        let Some(MessageContent::Parts(parts)) = msg.content else {
            panic!("expected content parts");
        };
        assert_eq!(parts.len(), 2);
        assert!(matches!(parts[0], ContentPart::ImageUrl { .. }));
        assert!(matches!(parts[1], ContentPart::Text { .. }));

        let json = serde_json::to_value(&parts[0]).unwrap();
        assert_eq!(json["type"], "image_url");
        assert_eq!(json["image_url"]["url"], "data:image/jpeg;base64,abc123");
    }

    #[test]
    fn test_tool_result_message_shape() {
        let msg = ProviderMessage::tool_result("call_1", "{\"found\":true}");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "tool");
        assert_eq!(json["tool_call_id"], "call_1");
        assert_eq!(json["content"], "{\"found\":true}");
    }

    #[test]
    fn test_assistant_message_skips_empty_tool_calls() {
        let msg = ProviderMessage::assistant(Some("done".into()), &[]);
        let json = serde_json::to_value(&msg).unwrap();
        assert!(json.get("tool_calls").is_none());
    }

    #[test]
    fn test_stream_chunk_parses() {
        let raw = r#"{"choices":[{"delta":{"content":null,"tool_calls":[{"index":0,"id":"call_9","function":{"name":"assess_risk","arguments":"{\"claim"}}]}}]}"#;
        let chunk: ChatStreamChunk = serde_json::from_str(raw).unwrap();
        let tc = &chunk.choices[0].delta.tool_calls.as_ref().unwrap()[0];
        assert_eq!(tc.index, 0);
        assert_eq!(tc.function.as_ref().unwrap().name.as_deref(), Some("assess_risk"));
    }
}
