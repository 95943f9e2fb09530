//! The tool-dispatch conversation loop.
//!
//! One `chat` call covers a full user turn: the model is invoked with the
//! transcript and tool definitions, any tool calls it makes are dispatched
//! against the registry and fed back as `tool`-role messages, and the loop
//! repeats until the model answers in text or the round bound is hit.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::context::{ChatRole, Context};
use crate::error::Result;
use crate::provider::{ImageSource, LlmClient, ProviderMessage};
use crate::tool::ToolRegistry;

const DEFAULT_MAX_TOOL_ROUNDS: usize = 8;

/// Events emitted during a streamed turn, relayed by web handlers as SSE.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    Start,
    Delta { content: String },
    ToolStart { name: String, call_id: String },
    ToolResult { name: String, call_id: String },
    Done { content: String },
    Error { message: String },
}

/// A conversational agent: provider client + tool registry + persona.
pub struct Agent {
    client: LlmClient,
    tools: Arc<ToolRegistry>,
    system_prompt: String,
    max_tool_rounds: usize,
}

pub struct AgentBuilder {
    client: LlmClient,
    tools: Arc<ToolRegistry>,
    system_prompt: String,
    max_tool_rounds: usize,
}

impl AgentBuilder {
    pub fn new(client: LlmClient) -> Self {
        Self {
            client,
            tools: Arc::new(ToolRegistry::new()),
            system_prompt: String::new(),
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
        }
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn tools(mut self, tools: Arc<ToolRegistry>) -> Self {
        self.tools = tools;
        self
    }

    pub fn max_tool_rounds(mut self, rounds: usize) -> Self {
        self.max_tool_rounds = rounds;
        self
    }

    pub fn build(self) -> Agent {
        Agent {
            client: self.client,
            tools: self.tools,
            system_prompt: self.system_prompt,
            max_tool_rounds: self.max_tool_rounds,
        }
    }
}

impl Agent {
    pub fn builder(client: LlmClient) -> AgentBuilder {
        AgentBuilder::new(client)
    }

    pub fn model(&self) -> &str {
        self.client.model()
    }

    /// Seed the provider message list: system prompt, prior transcript,
    /// then the current user input (with any attached images).
    async fn build_messages(
        &self,
        context: &Context,
        user_text: &str,
        images: &[ImageSource],
    ) -> Vec<ProviderMessage> {
        let mut messages = vec![ProviderMessage::system(&self.system_prompt)];

        for turn in context.all_messages().await {
            match turn.role {
                ChatRole::User => messages.push(ProviderMessage::user(turn.content)),
                ChatRole::Assistant => {
                    messages.push(ProviderMessage::assistant(Some(turn.content), &[]))
                }
                ChatRole::System => messages.push(ProviderMessage::system(turn.content)),
            }
        }

        if images.is_empty() {
            messages.push(ProviderMessage::user(user_text));
        } else {
            messages.push(ProviderMessage::user_with_images(user_text, images));
        }
        messages
    }

    fn parse_args(raw: &str) -> Value {
        serde_json::from_str(raw).unwrap_or_else(|_| json!({}))
    }

    /// Run one full user turn and return the assistant's final text.
    pub async fn chat(
        &self,
        context: &Context,
        user_text: impl Into<String>,
        images: &[ImageSource],
    ) -> Result<String> {
        let user_text = user_text.into();
        let mut messages = self.build_messages(context, &user_text, images).await;
        let definitions = self.tools.definitions();

        let mut final_content = String::new();
        for round in 0..self.max_tool_rounds {
            let turn = self.client.complete(&messages, &definitions).await?;

            if !turn.has_tool_calls() {
                final_content = turn.content.unwrap_or_default();
                break;
            }

            info!(round = round + 1, calls = turn.tool_calls.len(), "Model requested tools");
            messages.push(ProviderMessage::assistant(
                turn.content.clone(),
                &turn.tool_calls,
            ));
            for tc in &turn.tool_calls {
                let output = self
                    .tools
                    .dispatch(&tc.name, context, Self::parse_args(&tc.arguments))
                    .await;
                messages.push(ProviderMessage::tool_result(&tc.id, output));
            }
        }

        if final_content.is_empty() {
            warn!("Turn ended without text content (tool round limit?)");
        }

        // Only the user text and the final answer enter the transcript; the
        // intermediate tool traffic is rebuilt fresh each turn.
        context.add_user_message(&user_text).await;
        context.add_assistant_message(&final_content).await;

        Ok(final_content)
    }

    /// Streamed variant of [`Agent::chat`]. Emits `AgentEvent`s on `tx`,
    /// always terminating with either `Done` or `Error`.
    pub async fn chat_stream(
        &self,
        context: &Context,
        user_text: impl Into<String>,
        images: &[ImageSource],
        tx: mpsc::Sender<AgentEvent>,
    ) {
        let user_text = user_text.into();
        let _ = tx.send(AgentEvent::Start).await;

        let mut messages = self.build_messages(context, &user_text, images).await;
        let definitions = self.tools.definitions();

        let mut final_content = String::new();
        for round in 0..self.max_tool_rounds {
            // Forward raw text deltas from the provider as Delta events.
            let (delta_tx, mut delta_rx) = mpsc::channel::<String>(100);
            let event_tx = tx.clone();
            let forwarder = tokio::spawn(async move {
                while let Some(content) = delta_rx.recv().await {
                    let _ = event_tx.send(AgentEvent::Delta { content }).await;
                }
            });

            let turn = match self.client.stream(&messages, &definitions, delta_tx).await {
                Ok(turn) => turn,
                Err(e) => {
                    let _ = tx.send(AgentEvent::Error { message: e.to_string() }).await;
                    return;
                }
            };
            let _ = forwarder.await;

            if !turn.has_tool_calls() {
                final_content = turn.content.unwrap_or_default();
                break;
            }

            info!(round = round + 1, calls = turn.tool_calls.len(), "Model requested tools");
            messages.push(ProviderMessage::assistant(
                turn.content.clone(),
                &turn.tool_calls,
            ));
            for tc in &turn.tool_calls {
                let _ = tx
                    .send(AgentEvent::ToolStart {
                        name: tc.name.clone(),
                        call_id: tc.id.clone(),
                    })
                    .await;
                let output = self
                    .tools
                    .dispatch(&tc.name, context, Self::parse_args(&tc.arguments))
                    .await;
                messages.push(ProviderMessage::tool_result(&tc.id, output));
                let _ = tx
                    .send(AgentEvent::ToolResult {
                        name: tc.name.clone(),
                        call_id: tc.id.clone(),
                    })
                    .await;
            }
        }

        context.add_user_message(&user_text).await;
        context.add_assistant_message(&final_content).await;

        let _ = tx
            .send(AgentEvent::Done {
                content: final_content,
            })
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_args_tolerates_garbage() {
        assert_eq!(Agent::parse_args("{\"a\":1}"), json!({"a":1}));
        assert_eq!(Agent::parse_args("not json"), json!({}));
        assert_eq!(Agent::parse_args(""), json!({}));
    }

    #[test]
    fn test_agent_event_serialization() {
        let event = AgentEvent::Delta {
            content: "hel".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "delta");
        assert_eq!(json["content"], "hel");

        let event = AgentEvent::ToolStart {
            name: "lookup_client_by_policy".into(),
            call_id: "call_1".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "tool_start");
    }

    #[tokio::test]
    async fn test_build_messages_includes_history_and_system() {
        let client = LlmClient::new("test-key", "test-model");
        let agent = Agent::builder(client)
            .system_prompt("You are a claims assistant.")
            .build();

        let context = Context::new();
        context.add_user_message("hi").await;
        context.add_assistant_message("hello, how can I help?").await;

        let messages = agent.build_messages(&context, "my car was keyed", &[]).await;
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[1].role, "user");
        assert_eq!(messages[2].role, "assistant");
        assert_eq!(messages[3].role, "user");
    }
}
