use agent_flow::{Context, Result, Tool, ToolDefinition};
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashSet;
use std::sync::LazyLock;

use super::session_keys;

static POLICY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Z]{2,3}-\d{8}-[A-Z]").unwrap());

static DATE_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        // MM/DD/YYYY or M/D/YY
        Regex::new(r"\d{1,2}/\d{1,2}/\d{2,4}").unwrap(),
        // MM-DD-YYYY
        Regex::new(r"\d{1,2}-\d{1,2}-\d{2,4}").unwrap(),
        // Month DD, YYYY
        Regex::new(r"(?i)(?:Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)[a-z]* \d{1,2},? \d{4}")
            .unwrap(),
        // YYYY-MM-DD
        Regex::new(r"\d{4}-\d{2}-\d{2}").unwrap(),
    ]
});

static AMOUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$[\d,]+(?:\.\d{2})?").unwrap());

static WORDED_AMOUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d{1,3}(?:,\d{3})*(?:\.\d{2})?)\s*(?:dollars?|USD)").unwrap()
});

static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\+?1[-.\s]?)?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}").unwrap()
});

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").unwrap()
});

static VEHICLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:19|20)\d{2}\s+[A-Z][a-zA-Z]+(?:\s+[A-Z][a-zA-Z]+)?").unwrap()
});

/// Entities pulled out of free-form claim text with fixed patterns.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ExtractedEntities {
    pub policy_numbers: Vec<String>,
    pub dates: Vec<String>,
    pub amounts: Vec<String>,
    /// No pattern fills these two yet; the keys stay in the payload so
    /// the tool output shape is stable for consumers.
    pub names: Vec<String>,
    pub locations: Vec<String>,
    pub phone_numbers: Vec<String>,
    pub emails: Vec<String>,
    pub vehicle_info: Vec<String>,
}

fn dedupe(values: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    values.into_iter().filter(|v| seen.insert(v.clone())).collect()
}

fn find_all(re: &Regex, text: &str) -> Vec<String> {
    re.find_iter(text).map(|m| m.as_str().to_string()).collect()
}

pub fn extract(text: &str) -> ExtractedEntities {
    let mut entities = ExtractedEntities {
        policy_numbers: find_all(&POLICY_RE, &text.to_uppercase()),
        ..Default::default()
    };

    for re in DATE_RES.iter() {
        entities.dates.extend(find_all(re, text));
    }

    entities.amounts = find_all(&AMOUNT_RE, text);
    for caps in WORDED_AMOUNT_RE.captures_iter(text) {
        entities.amounts.push(format!("${}", &caps[1]));
    }

    entities.phone_numbers = find_all(&PHONE_RE, text);
    entities.emails = find_all(&EMAIL_RE, text);
    entities.vehicle_info = find_all(&VEHICLE_RE, text);

    entities.policy_numbers = dedupe(entities.policy_numbers);
    entities.dates = dedupe(entities.dates);
    entities.amounts = dedupe(entities.amounts);
    entities.phone_numbers = dedupe(entities.phone_numbers);
    entities.emails = dedupe(entities.emails);
    entities.vehicle_info = dedupe(entities.vehicle_info);

    entities
}

pub struct ExtractEntitiesTool;

#[derive(Deserialize)]
struct Args {
    text: String,
}

#[async_trait]
impl Tool for ExtractEntitiesTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "extract_entities".to_string(),
            description: "Extract key entities from text including policy numbers, dates, dollar amounts, phone numbers, and email addresses.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "text": {
                        "type": "string",
                        "description": "The text to extract entities from"
                    }
                },
                "required": ["text"]
            }),
        }
    }

    async fn call(&self, context: &Context, args: Value) -> Result<Value> {
        let args: Args = serde_json::from_value(args)?;
        let payload = serde_json::to_value(extract(&args.text))?;
        context
            .set(session_keys::EXTRACTED_ENTITIES, payload.clone())
            .await;
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_numbers_case_insensitive() {
        let entities = extract("my policy is pol-12345678-a, also HME-87654321-X");
        assert_eq!(
            entities.policy_numbers,
            vec!["POL-12345678-A", "HME-87654321-X"]
        );
    }

    #[test]
    fn test_date_formats() {
        let entities = extract("crashed on 3/14/2025, reported March 15, 2025 and again 2025-03-16");
        assert!(entities.dates.contains(&"3/14/2025".to_string()));
        assert!(entities.dates.contains(&"March 15, 2025".to_string()));
        assert!(entities.dates.contains(&"2025-03-16".to_string()));
    }

    #[test]
    fn test_amounts_with_and_without_sign() {
        let entities = extract("estimate was $4,250.00 but the shop said 5,000 dollars");
        assert!(entities.amounts.contains(&"$4,250.00".to_string()));
        assert!(entities.amounts.contains(&"$5,000".to_string()));
    }

    #[test]
    fn test_contact_info() {
        let entities = extract("reach me at (555) 123-4567 or jane.doe@example.com");
        assert_eq!(entities.phone_numbers, vec!["(555) 123-4567"]);
        assert_eq!(entities.emails, vec!["jane.doe@example.com"]);
    }

    #[test]
    fn test_vehicle_info() {
        let entities = extract("I drive a 2021 Honda Civic, it was parked outside");
        assert_eq!(entities.vehicle_info, vec!["2021 Honda Civic"]);
    }

    #[test]
    fn test_duplicates_removed() {
        let entities = extract("POL-11111111-A then again POL-11111111-A");
        assert_eq!(entities.policy_numbers.len(), 1);
    }

    #[tokio::test]
    async fn test_tool_records_entities() {
        let context = Context::new();
        let result = ExtractEntitiesTool
            .call(&context, json!({ "text": "policy POL-12345678-A on 1/2/2024" }))
            .await
            .unwrap();
        assert_eq!(result["policy_numbers"][0], "POL-12345678-A");
        assert!(context.contains_key(session_keys::EXTRACTED_ENTITIES));
    }

    #[test]
    fn test_payload_always_carries_every_entity_group() {
        let json = serde_json::to_value(extract("nothing to see")).unwrap();
        for key in [
            "policy_numbers",
            "dates",
            "amounts",
            "names",
            "locations",
            "phone_numbers",
            "emails",
            "vehicle_info",
        ] {
            assert!(json[key].as_array().is_some_and(Vec::is_empty), "missing {key}");
        }
    }
}
