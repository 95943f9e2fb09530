pub mod agent;
pub mod context;
pub mod error;
pub mod provider;
pub mod sse;
pub mod storage;
pub mod tool;

// Re-export commonly used types
pub use agent::{Agent, AgentBuilder, AgentEvent};
pub use context::{ChatRole, ChatTurn, Context};
pub use error::{AgentError, Result};
pub use provider::{
    CompletedTurn, ContentPart, ImageSource, LlmClient, ProviderMessage, ToolCall,
};
pub use storage::{InMemorySessionStorage, PostgresSessionStorage, Session, SessionStorage};
pub use tool::{Tool, ToolDefinition, ToolRegistry};

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::sync::Arc;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition {
                name: "echo".to_string(),
                description: "Echo the input back".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "text": { "type": "string" }
                    },
                    "required": ["text"]
                }),
            }
        }

        async fn call(&self, _context: &Context, args: Value) -> Result<Value> {
            let text = args["text"].as_str().unwrap_or_default();
            Ok(json!({ "echoed": text }))
        }
    }

    #[tokio::test]
    async fn test_registry_dispatch() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));

        let context = Context::new();
        let result = registry
            .dispatch("echo", &context, json!({ "text": "hello" }))
            .await;

        let parsed: Value = serde_json::from_str(&result).unwrap();
        assert_eq!(parsed["echoed"], "hello");
    }

    #[tokio::test]
    async fn test_registry_unknown_tool() {
        let registry = ToolRegistry::new();
        let context = Context::new();

        let result = registry.dispatch("missing", &context, json!({})).await;
        let parsed: Value = serde_json::from_str(&result).unwrap();
        assert!(parsed["error"].as_str().unwrap().contains("missing"));
    }

    #[tokio::test]
    async fn test_session_storage_roundtrip() {
        let storage = InMemorySessionStorage::new();

        let session = Session::new("session1".to_string());
        session.context.set("claim_type", "collision").await;
        storage.save(session).await.unwrap();

        let loaded = storage.get("session1").await.unwrap().unwrap();
        let claim_type: String = loaded.context.get("claim_type").await.unwrap();
        assert_eq!(claim_type, "collision");

        storage.delete("session1").await.unwrap();
        assert!(storage.get("session1").await.unwrap().is_none());
    }
}
