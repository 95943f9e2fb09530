use agent_flow::{Context, Result, Tool, ToolDefinition};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::info;

use crate::clients::{ClientDirectory, ClientRecord};

use super::session_keys;

fn client_payload(record: &ClientRecord) -> Value {
    json!({
        "found": true,
        "client_id": record.id,
        "name": record.full_name(),
        "address": record.address,
        "country": record.country,
        "tier": record.tier,
        "policy_number": record.policy_number,
    })
}

/// Look up a client by exact policy number.
pub struct LookupClientByPolicyTool {
    directory: Arc<ClientDirectory>,
}

impl LookupClientByPolicyTool {
    pub fn new(directory: Arc<ClientDirectory>) -> Self {
        Self { directory }
    }
}

#[derive(Deserialize)]
struct PolicyArgs {
    policy_number: String,
}

#[async_trait]
impl Tool for LookupClientByPolicyTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "lookup_client_by_policy".to_string(),
            description: "Look up a client in the database using their policy number. Returns client information including name, tier, address, and country.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "policy_number": {
                        "type": "string",
                        "description": "The policy number to search for (e.g., POL-12345678-A)"
                    }
                },
                "required": ["policy_number"]
            }),
        }
    }

    async fn call(&self, context: &Context, args: Value) -> Result<Value> {
        let args: PolicyArgs = serde_json::from_value(args)?;
        let wanted = args.policy_number.trim().to_uppercase();

        match self.directory.find_by_policy(&wanted) {
            Some(record) => {
                info!(policy = %record.policy_number, "Client found by policy number");
                let payload = client_payload(record);
                context.set(session_keys::CLIENT, payload.clone()).await;
                Ok(payload)
            }
            None => Ok(json!({
                "found": false,
                "error": format!("No client found with policy number: {wanted}"),
                "suggestion": "Please verify the policy number format (e.g., POL-12345678-A)"
            })),
        }
    }
}

/// Look up a client by first, last, or partial name.
pub struct LookupClientByNameTool {
    directory: Arc<ClientDirectory>,
}

impl LookupClientByNameTool {
    pub fn new(directory: Arc<ClientDirectory>) -> Self {
        Self { directory }
    }
}

#[derive(Deserialize)]
struct NameArgs {
    name: String,
}

#[async_trait]
impl Tool for LookupClientByNameTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "lookup_client_by_name".to_string(),
            description: "Look up a client in the database using their name. Can search by first name, last name, or full name.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "name": {
                        "type": "string",
                        "description": "The client's name to search for"
                    }
                },
                "required": ["name"]
            }),
        }
    }

    async fn call(&self, context: &Context, args: Value) -> Result<Value> {
        let args: NameArgs = serde_json::from_value(args)?;
        let matches = self.directory.find_by_name(&args.name);

        match matches.as_slice() {
            [] => Ok(json!({
                "found": false,
                "error": format!("No client found with name matching: {}", args.name.trim()),
            })),
            [record] => {
                info!(policy = %record.policy_number, "Client found by name");
                let payload = client_payload(record);
                // Only an unambiguous single match enters the session context
                context.set(session_keys::CLIENT, payload.clone()).await;
                Ok(payload)
            }
            multiple => {
                let clients: Vec<Value> = multiple
                    .iter()
                    .map(|r| {
                        json!({
                            "name": r.full_name(),
                            "policy_number": r.policy_number,
                            "tier": r.tier,
                        })
                    })
                    .collect();
                Ok(json!({
                    "found": true,
                    "multiple_matches": true,
                    "count": clients.len(),
                    "clients": clients,
                    "message": "Multiple clients found. Please specify the policy number."
                }))
            }
        }
    }
}
