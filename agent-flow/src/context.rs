use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Role of a recorded conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// A single turn of the conversation transcript
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }
}

/// Shared conversation state: a typed key/value store plus the ordered
/// chat transcript. Cloning is cheap; clones share the same data.
#[derive(Clone, Debug, Default)]
pub struct Context {
    data: Arc<DashMap<String, Value>>,
    transcript: Arc<RwLock<Vec<ChatTurn>>>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set(&self, key: impl Into<String>, value: impl Serialize) {
        let value = serde_json::to_value(value).expect("Failed to serialize value");
        self.data.insert(key.into(), value);
    }

    pub async fn get<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get_sync(key)
    }

    /// Synchronous variant for non-async call sites such as edge conditions.
    pub fn get_sync<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.data
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub async fn remove(&self, key: &str) -> Option<Value> {
        self.data.remove(key).map(|(_, v)| v)
    }

    pub async fn clear(&self) {
        self.data.clear();
        self.transcript.write().unwrap().clear();
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Snapshot of the key/value store, for session summaries.
    pub fn data_snapshot(&self) -> HashMap<String, Value> {
        self.data
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    pub async fn add_user_message(&self, content: impl Into<String>) {
        self.transcript.write().unwrap().push(ChatTurn::user(content));
    }

    pub async fn add_assistant_message(&self, content: impl Into<String>) {
        self.transcript
            .write()
            .unwrap()
            .push(ChatTurn::assistant(content));
    }

    pub async fn all_messages(&self) -> Vec<ChatTurn> {
        self.transcript.read().unwrap().clone()
    }

    pub async fn last_messages(&self, n: usize) -> Vec<ChatTurn> {
        let transcript = self.transcript.read().unwrap();
        let start = transcript.len().saturating_sub(n);
        transcript[start..].to_vec()
    }

    pub async fn user_turn_count(&self) -> usize {
        self.transcript
            .read()
            .unwrap()
            .iter()
            .filter(|t| t.role == ChatRole::User)
            .count()
    }
}

/// Flat form used for persistence.
#[derive(Serialize, Deserialize)]
struct ContextSnapshot {
    data: HashMap<String, Value>,
    transcript: Vec<ChatTurn>,
}

impl Serialize for Context {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let snapshot = ContextSnapshot {
            data: self.data_snapshot(),
            transcript: self.transcript.read().unwrap().clone(),
        };
        snapshot.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Context {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let snapshot = ContextSnapshot::deserialize(deserializer)?;
        let data = DashMap::new();
        for (k, v) in snapshot.data {
            data.insert(k, v);
        }
        Ok(Self {
            data: Arc::new(data),
            transcript: Arc::new(RwLock::new(snapshot.transcript)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_remove() {
        let context = Context::new();
        context.set("tier", "Premium").await;

        let tier: String = context.get("tier").await.unwrap();
        assert_eq!(tier, "Premium");

        context.remove("tier").await;
        assert!(context.get::<String>("tier").await.is_none());
    }

    #[tokio::test]
    async fn test_transcript_ordering() {
        let context = Context::new();
        context.add_user_message("hello").await;
        context.add_assistant_message("hi, how can I help?").await;
        context.add_user_message("I crashed my car").await;

        let all = context.all_messages().await;
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].role, ChatRole::User);
        assert_eq!(all[1].role, ChatRole::Assistant);
        assert_eq!(context.user_turn_count().await, 2);

        let last = context.last_messages(2).await;
        assert_eq!(last.len(), 2);
        assert_eq!(last[1].content, "I crashed my car");
    }

    #[tokio::test]
    async fn test_serde_roundtrip() {
        let context = Context::new();
        context.set("claim_type", "theft").await;
        context.add_user_message("my car was stolen").await;

        let json = serde_json::to_string(&context).unwrap();
        let restored: Context = serde_json::from_str(&json).unwrap();

        let claim_type: String = restored.get("claim_type").await.unwrap();
        assert_eq!(claim_type, "theft");
        assert_eq!(restored.all_messages().await.len(), 1);
    }
}
