use agent_flow::{Context, Result, Tool, ToolDefinition};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value, json};

const REQUIRED_FIELDS: &[(&str, &str)] = &[
    ("policy_number", "What is your policy number?"),
    ("incident_date", "When did the incident occur?"),
    ("incident_location", "Where did the incident occur?"),
    (
        "claim_type",
        "What type of incident was this (collision, theft, vandalism, etc.)?",
    ),
    ("description", "Can you describe what happened?"),
    (
        "estimated_damage",
        "Do you have an estimate of the damage amount?",
    ),
    ("injuries", "Were there any injuries?"),
];

const OPTIONAL_FIELDS: &[(&str, &str)] = &[
    (
        "police_report",
        "Was a police report filed? If so, what is the report number?",
    ),
    ("photos", "Do you have photos of the damage?"),
    ("witnesses", "Were there any witnesses?"),
    (
        "other_party_info",
        "If another party was involved, do you have their contact/insurance information?",
    ),
];

/// A field counts as present only when it holds a non-empty value. False,
/// zero, empty strings, and empty collections all count as missing.
fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
    }
}

pub fn audit(claim_data: &Map<String, Value>) -> Value {
    let mut missing_required = Vec::new();
    let mut questions_to_ask = Vec::new();
    for (field, question) in REQUIRED_FIELDS {
        if !is_present(claim_data.get(*field)) {
            missing_required.push(*field);
            questions_to_ask.push(*question);
        }
    }

    let missing_optional: Vec<&str> = OPTIONAL_FIELDS
        .iter()
        .filter(|(field, _)| !is_present(claim_data.get(*field)))
        .map(|(field, _)| *field)
        .collect();

    let completeness =
        (1.0 - missing_required.len() as f64 / REQUIRED_FIELDS.len() as f64) * 100.0;

    json!({
        "missing_required": missing_required,
        "missing_optional": missing_optional,
        "questions_to_ask": questions_to_ask,
        "is_complete": missing_required.is_empty(),
        "completeness_percentage": completeness.round() as u32,
    })
}

pub struct GetMissingInformationTool;

#[derive(Deserialize)]
struct Args {
    #[serde(default)]
    claim_data: Map<String, Value>,
}

#[async_trait]
impl Tool for GetMissingInformationTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "get_missing_information".to_string(),
            description: "Identify what information is still needed to process a claim. Returns list of missing required and optional fields with questions to ask.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "claim_data": {
                        "type": "object",
                        "description": "Object with the claim information collected so far (policy_number, incident_date, incident_location, claim_type, description, estimated_damage, injuries, police_report, photos, witnesses, other_party_info)"
                    }
                },
                "required": ["claim_data"]
            }),
        }
    }

    async fn call(&self, _context: &Context, args: Value) -> Result<Value> {
        let args: Args = serde_json::from_value(args)?;
        Ok(audit(&args.claim_data))
    }
}
