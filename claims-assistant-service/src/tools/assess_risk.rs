use agent_flow::{Context, Result, Tool, ToolDefinition};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;

use super::session_keys;

const SUSPICIOUS_KEYWORDS: &[&str] = &[
    "total loss",
    "totaled",
    "stolen",
    "break-in",
    "hit and run",
    "unwitnessed",
];

/// Claim facts the model has gathered so far. Everything is optional;
/// absent fields score as if the answer were "no".
#[derive(Debug, Default, Deserialize)]
pub struct ClaimFacts {
    #[serde(default)]
    pub estimated_amount: Option<Value>,
    #[serde(default)]
    pub claim_type: String,
    #[serde(default)]
    pub injuries_reported: bool,
    #[serde(default)]
    pub police_report: bool,
    #[serde(default)]
    pub witnesses: bool,
    #[serde(default)]
    pub photos_provided: bool,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub days_since_incident: i64,
}

impl ClaimFacts {
    /// Amount may arrive as a number or a formatted string like "$12,500".
    fn amount(&self) -> f64 {
        match &self.estimated_amount {
            Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
            Some(Value::String(s)) => s
                .replace('$', "")
                .replace(',', "")
                .trim()
                .parse()
                .unwrap_or(0.0),
            _ => 0.0,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub risk_level: String,
    pub risk_score: u32,
    pub risk_factors: Vec<String>,
    pub recommendations: Vec<String>,
    pub requires_siu: bool,
}

pub fn assess(facts: &ClaimFacts) -> RiskAssessment {
    let mut score: u32 = 0;
    let mut factors = Vec::new();
    let mut recommendations = Vec::new();

    let amount = facts.amount();
    let claim_type = facts.claim_type.to_lowercase();
    let description = facts.description.to_lowercase();

    if amount > 50_000.0 {
        score += 30;
        factors.push("High-value claim (>$50,000)".to_string());
        recommendations.push("Requires senior adjuster review".to_string());
    } else if amount > 20_000.0 {
        score += 20;
        factors.push("Significant claim amount ($20,000-$50,000)".to_string());
    } else if amount > 10_000.0 {
        score += 10;
        factors.push("Moderate claim amount ($10,000-$20,000)".to_string());
    }

    if facts.injuries_reported {
        score += 25;
        factors.push("Injuries reported".to_string());
        recommendations.push("Coordinate with medical review team".to_string());
        recommendations.push("Request medical documentation".to_string());
    }

    let police_report_expected = matches!(
        claim_type.as_str(),
        "theft" | "vandalism" | "collision" | "hit and run"
    );
    if !facts.police_report && police_report_expected {
        score += 15;
        factors.push("No police report filed".to_string());
        recommendations.push("Request police report number".to_string());
    }

    if !facts.photos_provided {
        score += 10;
        factors.push("No photos provided".to_string());
        recommendations.push("Request photos of damage".to_string());
    }

    if !facts.witnesses && matches!(claim_type.as_str(), "collision" | "hit and run") {
        score += 5;
        factors.push("No witnesses identified".to_string());
        recommendations.push("Request witness contact information if available".to_string());
    }

    if facts.days_since_incident > 30 {
        score += 20;
        factors.push("Claim filed more than 30 days after incident".to_string());
        recommendations.push("Investigate reason for delayed reporting".to_string());
    } else if facts.days_since_incident > 7 {
        score += 10;
        factors.push("Claim filed more than 7 days after incident".to_string());
    }

    for keyword in SUSPICIOUS_KEYWORDS {
        if description.contains(keyword) {
            score += 5;
        }
    }

    let risk_level = if score >= 50 {
        recommendations.insert(
            0,
            "Flag for Special Investigation Unit (SIU) review".to_string(),
        );
        "HIGH"
    } else if score >= 30 {
        recommendations.insert(
            0,
            "Standard investigation with additional documentation".to_string(),
        );
        "MEDIUM"
    } else {
        recommendations.insert(0, "Standard processing pathway".to_string());
        "LOW"
    };

    RiskAssessment {
        risk_level: risk_level.to_string(),
        risk_score: score,
        risk_factors: factors,
        recommendations,
        requires_siu: score >= 50,
    }
}

pub struct AssessRiskTool;

#[derive(Deserialize)]
struct Args {
    claim_details: ClaimFacts,
}

#[async_trait]
impl Tool for AssessRiskTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "assess_risk".to_string(),
            description: "Assess the risk level of a claim based on various factors. Returns risk score, risk factors, and recommendations.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "claim_details": {
                        "type": "object",
                        "description": "Object containing claim details including: estimated_amount, claim_type, injuries_reported, police_report, witnesses, photos_provided, description, days_since_incident"
                    }
                },
                "required": ["claim_details"]
            }),
        }
    }

    async fn call(&self, context: &Context, args: Value) -> Result<Value> {
        let args: Args = serde_json::from_value(args)?;
        let assessment = assess(&args.claim_details);
        info!(
            risk_level = %assessment.risk_level,
            risk_score = assessment.risk_score,
            "Risk assessment complete"
        );

        let payload = serde_json::to_value(assessment)?;
        context
            .set(session_keys::RISK_ASSESSMENT, payload.clone())
            .await;
        Ok(payload)
    }
}
