use agent_flow::{Context, Result, Tool, ToolDefinition};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::policy::{ClaimKind, Tier};

/// Investigation plan tailored to the claim type and tier.
#[derive(Debug, Serialize, Deserialize)]
pub struct InvestigationChecklist {
    pub required_documents: Vec<String>,
    pub investigation_steps: Vec<String>,
    pub follow_up_questions: Vec<String>,
    pub timeline: Map<String, Value>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn build_checklist(claim_type: &str, tier: Tier, injuries_reported: bool) -> InvestigationChecklist {
    let mut documents = strings(&[
        "Completed claim form",
        "Copy of driver's license",
        "Copy of vehicle registration",
        "Photos of damage (minimum 4 angles)",
    ]);
    let mut steps;
    let questions;

    let kind = ClaimKind::parse(claim_type);
    match kind {
        ClaimKind::Collision => {
            documents.extend(strings(&[
                "Police report (if applicable)",
                "Other driver's insurance information",
                "Witness statements",
                "Repair estimate from approved shop",
            ]));
            steps = strings(&[
                "Verify policy was active at time of incident",
                "Confirm driver was authorized under policy",
                "Review accident description for coverage determination",
                "Obtain repair estimates from network shop",
                "Verify no exclusions apply (racing, rideshare, etc.)",
            ]);
            questions = strings(&[
                "What was the exact date and time of the accident?",
                "What was the location (street address/intersection)?",
                "Who was driving the vehicle?",
                "Was anyone injured?",
                "Were there any witnesses?",
                "Was a police report filed? If so, what is the report number?",
                "Has the vehicle been moved from the accident scene?",
                "What is the extent of damage to your vehicle?",
                "Was the other driver at fault? Do you have their information?",
            ]);
        }
        ClaimKind::Theft => {
            documents.extend(strings(&[
                "Police report (REQUIRED)",
                "Proof of ownership",
                "List of personal items in vehicle (if applicable)",
                "Last known location documentation",
            ]));
            steps = strings(&[
                "Verify police report filed",
                "Confirm all keys accounted for",
                "Review for any suspicious circumstances",
                "Check if vehicle had tracking device",
                "Verify no prior theft claims",
            ]);
            questions = strings(&[
                "When did you last see the vehicle?",
                "Where was the vehicle parked?",
                "Were all keys in your possession?",
                "Did the vehicle have an alarm or tracking system?",
                "Were there any signs of forced entry?",
                "What personal items were in the vehicle?",
            ]);
        }
        ClaimKind::Vandalism => {
            documents.extend(strings(&[
                "Police report (recommended)",
                "Photos showing extent of vandalism",
                "Witness statements if available",
            ]));
            steps = strings(&[
                "Review photos for damage assessment",
                "Check for security camera footage",
                "Verify no disputes with neighbors/others",
                "Obtain repair estimate",
            ]);
            questions = strings(&[
                "When did you discover the vandalism?",
                "Where was the vehicle when vandalized?",
                "Are there security cameras in the area?",
                "Do you know of anyone who might have done this?",
                "Have you experienced vandalism before?",
            ]);
        }
        ClaimKind::Fire => {
            documents.extend(strings(&[
                "Fire department report",
                "Police report",
                "Photos of fire damage",
            ]));
            steps = strings(&[
                "Obtain fire marshal report if available",
                "Determine origin and cause of fire",
                "Verify no arson indicators",
                "Assess total loss vs. repairable",
            ]);
            questions = strings(&[
                "How did the fire start?",
                "Where was the vehicle when the fire occurred?",
                "Was the vehicle running or parked?",
                "When was the last maintenance performed?",
                "Was there anyone in or near the vehicle?",
            ]);
        }
        ClaimKind::Glass => {
            // Glass claims are lightweight; the common document set does
            // not apply.
            documents = strings(&[
                "Photos of glass damage",
                "Repair/replacement estimate",
            ]);
            steps = strings(&[
                "Determine if damage is chip or full replacement",
                "Verify approved glass repair vendor",
                "Confirm coverage based on tier",
            ]);
            questions = strings(&[
                "How did the glass get damaged?",
                "Is this a chip or crack?",
                "What is the size of the damage?",
                "Is the damage in the driver's line of sight?",
            ]);
        }
        ClaimKind::Weather => {
            documents.extend(strings(&[
                "Weather report for date of incident",
                "Photos of weather-related damage",
            ]));
            steps = strings(&[
                "Verify weather event occurred in area",
                "Assess extent of damage",
                "Determine repair vs. total loss",
            ]);
            questions = strings(&[
                "What date did the weather event occur?",
                "Where was the vehicle during the event?",
                "Was the vehicle in a covered or open area?",
                "What type of damage occurred (dents, flooding, etc.)?",
            ]);
        }
        _ => {
            steps = strings(&[
                "Gather complete incident details",
                "Determine applicable coverage",
                "Request supporting documentation",
            ]);
            questions = strings(&[
                "What type of incident occurred?",
                "When did it happen?",
                "Where did it happen?",
                "What is the extent of the damage?",
                "Was anyone injured?",
            ]);
        }
    }

    if tier == Tier::Premium {
        steps.insert(0, "Assign to Concierge Claims team".to_string());
        if matches!(kind, ClaimKind::Collision | ClaimKind::Theft) {
            steps.push("Coordinate Valet Service if requested".to_string());
        }
    }

    let timeline = if injuries_reported {
        json!({
            "initial_contact": "Within 4 hours",
            "documentation_deadline": "5 business days",
            "investigation_complete": "15-30 business days",
            "resolution_target": "30-45 business days"
        })
    } else {
        json!({
            "initial_contact": "Within 24 hours",
            "documentation_deadline": "7 business days",
            "investigation_complete": "7-14 business days",
            "resolution_target": "14-21 business days"
        })
    };
    let timeline = match timeline {
        Value::Object(map) => map,
        _ => Map::new(),
    };

    InvestigationChecklist {
        required_documents: documents,
        investigation_steps: steps,
        follow_up_questions: questions,
        timeline,
    }
}

pub struct GenerateInvestigationChecklistTool;

#[derive(Deserialize)]
struct Args {
    claim_type: String,
    tier: String,
    #[serde(default)]
    claim_details: ChecklistDetails,
}

#[derive(Default, Deserialize)]
struct ChecklistDetails {
    #[serde(default)]
    injuries_reported: bool,
}

#[async_trait]
impl Tool for GenerateInvestigationChecklistTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "generate_investigation_checklist".to_string(),
            description: "Generate a customized investigation checklist based on the claim type and tier. Includes required documents, investigation steps, follow-up questions, and timeline.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "claim_type": {
                        "type": "string",
                        "description": "Type of claim (e.g., collision, theft, vandalism)"
                    },
                    "tier": {
                        "type": "string",
                        "description": "The policy tier (Simple, Advanced, or Premium)"
                    },
                    "claim_details": {
                        "type": "object",
                        "description": "Object with claim details including injuries_reported"
                    }
                },
                "required": ["claim_type", "tier", "claim_details"]
            }),
        }
    }

    async fn call(&self, _context: &Context, args: Value) -> Result<Value> {
        let args: Args = serde_json::from_value(args)?;

        let tier: Tier = match args.tier.parse() {
            Ok(tier) => tier,
            Err(message) => return Ok(json!({ "error": message })),
        };

        let checklist =
            build_checklist(&args.claim_type, tier, args.claim_details.injuries_reported);
        Ok(serde_json::to_value(checklist)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_theft_requires_police_report() {
        let checklist = build_checklist("theft", Tier::Advanced, false);
        assert!(checklist
            .required_documents
            .iter()
            .any(|d| d == "Police report (REQUIRED)"));
        assert_eq!(checklist.timeline["initial_contact"], "Within 24 hours");
    }

    #[test]
    fn test_glass_replaces_common_documents() {
        let checklist = build_checklist("windshield", Tier::Advanced, false);
        assert_eq!(
            checklist.required_documents,
            vec!["Photos of glass damage", "Repair/replacement estimate"]
        );
    }

    #[test]
    fn test_premium_collision_gets_concierge_and_valet() {
        let checklist = build_checklist("collision", Tier::Premium, false);
        assert_eq!(checklist.investigation_steps[0], "Assign to Concierge Claims team");
        assert_eq!(
            checklist.investigation_steps.last().map(String::as_str),
            Some("Coordinate Valet Service if requested")
        );
    }

    #[test]
    fn test_injuries_tighten_timeline() {
        let checklist = build_checklist("collision", Tier::Advanced, true);
        assert_eq!(checklist.timeline["initial_contact"], "Within 4 hours");
        assert_eq!(checklist.timeline["resolution_target"], "30-45 business days");
    }

    #[test]
    fn test_unknown_type_gets_generic_plan() {
        let checklist = build_checklist("mystery", Tier::Simple, false);
        assert_eq!(checklist.investigation_steps[0], "Gather complete incident details");
        assert_eq!(checklist.follow_up_questions.len(), 5);
    }

    #[tokio::test]
    async fn test_tool_handles_missing_details() {
        let context = Context::new();
        let result = GenerateInvestigationChecklistTool
            .call(
                &context,
                json!({ "claim_type": "fire", "tier": "Simple", "claim_details": {} }),
            )
            .await
            .unwrap();
        assert!(result["required_documents"]
            .as_array()
            .unwrap()
            .iter()
            .any(|d| d == "Fire department report"));
    }
}
