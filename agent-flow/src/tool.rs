use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{info, warn};

use crate::{context::Context, error::Result};

/// Wire-format description of a tool, in the OpenAI function schema the
/// chat-completions API expects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON schema for the tool arguments
    pub parameters: Value,
}

/// A callable capability the model can invoke during a conversation.
///
/// Tools receive the conversation [`Context`] so they can record what they
/// found (e.g. a client lookup storing the matched record) for later turns
/// and for session summaries.
#[async_trait]
pub trait Tool: Send + Sync {
    fn definition(&self) -> ToolDefinition;

    async fn call(&self, context: &Context, args: Value) -> Result<Value>;
}

/// Name-indexed set of tools with dispatch.
#[derive(Default)]
pub struct ToolRegistry {
    tools: DashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.definition().name, tool);
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|entry| entry.definition()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Execute a tool by name and return its output as a JSON string.
    ///
    /// Failures are folded into an `{"error": ...}` payload rather than
    /// propagated: the model sees the error text and can recover in
    /// conversation, instead of the whole request aborting.
    pub async fn dispatch(&self, name: &str, context: &Context, args: Value) -> String {
        let Some(tool) = self.tools.get(name).map(|entry| entry.clone()) else {
            warn!(tool = %name, "Unknown tool requested by model");
            return json!({ "error": format!("Unknown tool: {name}") }).to_string();
        };

        info!(tool = %name, "Dispatching tool call");
        match tool.call(context, args).await {
            Ok(value) => {
                serde_json::to_string(&value).unwrap_or_else(|e| {
                    json!({ "error": format!("Tool result serialization error: {e}") }).to_string()
                })
            }
            Err(e) => {
                warn!(tool = %name, error = %e, "Tool execution failed");
                json!({ "error": format!("Tool execution error: {e}") }).to_string()
            }
        }
    }
}
