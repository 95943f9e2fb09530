use agent_flow::{Context, Result, Tool, ToolDefinition};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::policy::{GENERAL_EXCLUSIONS, Tier, schedule};

/// Full coverage schedule for a tier, plus the general exclusions.
pub struct GetCoverageDetailsTool;

#[derive(Deserialize)]
struct Args {
    tier: String,
}

#[async_trait]
impl Tool for GetCoverageDetailsTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "get_coverage_details".to_string(),
            description: "Get detailed coverage information for a specific policy tier (Simple, Advanced, or Premium). Returns all coverage limits, deductibles, and included benefits.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "tier": {
                        "type": "string",
                        "description": "The policy tier (Simple, Advanced, or Premium)"
                    }
                },
                "required": ["tier"]
            }),
        }
    }

    async fn call(&self, _context: &Context, args: Value) -> Result<Value> {
        let args: Args = serde_json::from_value(args)?;

        let tier: Tier = match args.tier.parse() {
            Ok(tier) => tier,
            Err(message) => return Ok(json!({ "error": message })),
        };

        let mut payload = serde_json::to_value(schedule(tier))?;
        payload["general_exclusions"] = json!(GENERAL_EXCLUSIONS);
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_premium_details() {
        let context = Context::new();
        let result = GetCoverageDetailsTool
            .call(&context, json!({ "tier": "premium" }))
            .await
            .unwrap();

        assert_eq!(result["collision_deductible"], "$250");
        assert_eq!(result["gap_insurance"], "Included");
        assert_eq!(result["general_exclusions"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_unknown_tier_is_error_payload() {
        let context = Context::new();
        let result = GetCoverageDetailsTool
            .call(&context, json!({ "tier": "gold" }))
            .await
            .unwrap();
        assert!(result["error"].as_str().unwrap().contains("Unknown tier"));
    }
}
