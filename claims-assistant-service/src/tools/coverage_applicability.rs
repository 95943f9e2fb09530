use agent_flow::{Context, Result, Tool, ToolDefinition};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;

use crate::policy::{ClaimKind, CoverageSchedule, Tier, schedule};

use super::session_keys;

/// Coverage decision for one claim against one tier.
#[derive(Debug, Serialize, Deserialize)]
pub struct CoverageAnalysis {
    pub tier: String,
    pub claim_type: String,
    pub analysis: Vec<String>,
    pub covered: bool,
    pub deductible: Option<String>,
    pub coverage_limit: Option<String>,
    pub warnings: Vec<String>,
    pub next_steps: Vec<String>,
}

impl CoverageAnalysis {
    fn new(tier: Tier, claim_type: &str) -> Self {
        Self {
            tier: tier.to_string(),
            claim_type: claim_type.to_string(),
            analysis: Vec::new(),
            covered: false,
            deductible: None,
            coverage_limit: None,
            warnings: Vec::new(),
            next_steps: Vec::new(),
        }
    }

    fn note(&mut self, line: impl Into<String>) {
        self.analysis.push(line.into());
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// The rule table itself. Exclusion keywords are checked against the
/// incident description first; racing and intentional acts short-circuit
/// as excluded regardless of claim type.
pub fn analyze(tier: Tier, claim_type: &str, claim_details: &str) -> CoverageAnalysis {
    let coverage: CoverageSchedule = schedule(tier);
    let mut result = CoverageAnalysis::new(tier, claim_type);
    let details = claim_details.to_lowercase();

    if contains_any(&details, &["uber", "lyft", "doordash", "delivery"]) {
        result.warnings.push(
            "ALERT: Ridesharing/delivery use detected. This may void coverage unless specific endorsement was purchased."
                .to_string(),
        );
    }

    if contains_any(&details, &["racing", "track", "competition"]) {
        result.note("EXCLUDED: Racing or competitive events are not covered under any tier.");
        return result;
    }

    if contains_any(&details, &["intentional", "on purpose", "deliberately"]) {
        result.note("EXCLUDED: Intentional acts are not covered under any tier.");
        return result;
    }

    let kind = ClaimKind::parse(claim_type);
    match kind {
        ClaimKind::Collision => {
            if tier == Tier::Simple {
                result.note("Collision coverage is NOT included in the Simple tier.");
                result.note(
                    "The policyholder is responsible for all vehicle damage from collisions.",
                );
                result
                    .warnings
                    .push("Consider upgrading to Advanced tier for collision coverage.".to_string());
            } else {
                result.covered = true;
                result.deductible = coverage.collision_deductible.clone();
                let deductible = result.deductible.as_deref().unwrap_or("unknown");
                result.note(format!(
                    "Collision coverage is included with {deductible} deductible."
                ));
                if tier == Tier::Premium {
                    result.note("Diminished Value protection is included.");
                    result.note("OEM parts will be used for all repairs.");
                }
            }
        }
        ClaimKind::Theft => {
            result.covered = true;
            result.deductible = Some(coverage.comprehensive_deductible.clone());
            result.note("Theft is covered under comprehensive coverage.");
            result.note(format!("Deductible: {}", coverage.comprehensive_deductible));
            if tier == Tier::Simple {
                result.note("Note: Simple tier covers theft as a named peril.");
            }
        }
        ClaimKind::Fire => {
            result.covered = true;
            result.deductible = Some(coverage.comprehensive_deductible.clone());
            result.note("Fire damage is covered under all tiers.");
            result.note(format!("Deductible: {}", coverage.comprehensive_deductible));
        }
        ClaimKind::Vandalism => {
            if tier == Tier::Simple {
                result.note("Vandalism is NOT covered under the Simple tier.");
                result.note("Simple tier only covers: Fire, Lightning, Theft, Attempted Theft.");
            } else {
                result.covered = true;
                result.deductible = Some(coverage.comprehensive_deductible.clone());
                result.note(format!(
                    "Vandalism is covered with {} deductible.",
                    coverage.comprehensive_deductible
                ));
            }
        }
        ClaimKind::Weather => {
            if tier == Tier::Simple {
                result.note("Weather damage (hail, flood) is NOT covered under the Simple tier.");
            } else {
                result.covered = true;
                result.deductible = Some(coverage.comprehensive_deductible.clone());
                result.note(format!(
                    "Weather damage is covered with {} deductible.",
                    coverage.comprehensive_deductible
                ));
            }
        }
        ClaimKind::Glass => match tier {
            Tier::Simple => {
                result.note(
                    "Glass damage is NOT covered unless caused by a named peril (fire, theft).",
                );
            }
            Tier::Advanced => {
                result.covered = true;
                result.note("Chip repairs are FREE. Full replacement has $100 deductible.");
                result.deductible =
                    Some("$100 for full replacement, $0 for chip repair".to_string());
            }
            Tier::Premium => {
                result.covered = true;
                result.deductible = Some("$0".to_string());
                result.note("Full glass coverage with $0 deductible.");
            }
        },
        ClaimKind::BodilyInjury => {
            result.covered = true;
            result.coverage_limit = Some(coverage.bodily_injury_liability.clone());
            result.note(format!(
                "Bodily injury liability coverage: {}",
                coverage.bodily_injury_liability
            ));
            result.note(format!(
                "Medical payments coverage: {}",
                coverage.medical_payments
            ));
        }
        ClaimKind::PropertyDamage => {
            result.covered = true;
            result.coverage_limit = Some(coverage.property_damage_liability.clone());
            result.note(format!(
                "Property damage liability coverage: {}",
                coverage.property_damage_liability
            ));
        }
        ClaimKind::UninsuredMotorist => {
            result.covered = true;
            result.coverage_limit = Some(coverage.uninsured_motorist.clone());
            result.note(format!(
                "Uninsured motorist coverage: {}",
                coverage.uninsured_motorist
            ));
        }
        ClaimKind::AnimalStrike => {
            if tier == Tier::Simple {
                result.note("Animal strikes are NOT covered under the Simple tier.");
            } else {
                result.covered = true;
                result.deductible = Some(coverage.comprehensive_deductible.clone());
                result.note(format!(
                    "Animal strikes are covered with {} deductible.",
                    coverage.comprehensive_deductible
                ));
            }
        }
        ClaimKind::Unknown => {
            result.note(format!("Claim type '{claim_type}' needs manual review."));
            result.warnings.push(
                "Unable to automatically determine coverage. Please consult policy details."
                    .to_string(),
            );
        }
    }

    if result.covered {
        match tier {
            Tier::Premium => {
                result
                    .next_steps
                    .push("Contact 24/7 Concierge Claims Line for priority service.".to_string());
                if details.contains("total") || details.contains("totaled") {
                    result.note("Gap Insurance is included if vehicle is totaled.");
                    result.note("New Car Replacement available if within first 3 years.");
                }
            }
            Tier::Advanced => {
                result
                    .next_steps
                    .push("File claim via App or Web Portal.".to_string());
                result
                    .next_steps
                    .push("Digital inspection available for faster processing.".to_string());
            }
            Tier::Simple => {
                result
                    .next_steps
                    .push("File claim via App or Web Portal.".to_string());
            }
        }
    }

    if result.covered && matches!(kind, ClaimKind::Collision | ClaimKind::Theft) {
        let rental = &coverage.rental_car_reimbursement;
        if rental != "Not Included" {
            result.note(format!("Rental car reimbursement: {rental}"));
        }
    }

    result
}

pub struct AnalyzeCoverageApplicabilityTool;

#[derive(Deserialize)]
struct Args {
    tier: String,
    claim_type: String,
    #[serde(default)]
    claim_details: String,
}

#[async_trait]
impl Tool for AnalyzeCoverageApplicabilityTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "analyze_coverage_applicability".to_string(),
            description: "Analyze whether a specific claim is covered under the client's policy tier. Checks claim type against coverage rules, identifies exclusions, and provides deductible information.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "tier": {
                        "type": "string",
                        "description": "The client's policy tier (Simple, Advanced, or Premium)"
                    },
                    "claim_type": {
                        "type": "string",
                        "description": "The type of claim (collision, theft, fire, vandalism, weather, glass, bodily injury, property damage, uninsured, animal)"
                    },
                    "claim_details": {
                        "type": "string",
                        "description": "Description of the incident for exclusion checking"
                    }
                },
                "required": ["tier", "claim_type", "claim_details"]
            }),
        }
    }

    async fn call(&self, context: &Context, args: Value) -> Result<Value> {
        let args: Args = serde_json::from_value(args)?;

        let tier: Tier = match args.tier.parse() {
            Ok(tier) => tier,
            Err(message) => return Ok(json!({ "error": message })),
        };

        let analysis = analyze(tier, &args.claim_type, &args.claim_details);
        info!(
            tier = %analysis.tier,
            claim_type = %analysis.claim_type,
            covered = analysis.covered,
            "Coverage analysis complete"
        );

        let payload = serde_json::to_value(analysis)?;
        context
            .set(session_keys::COVERAGE_ANALYSIS, payload.clone())
            .await;
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_tier_excludes_collision() {
        let result = analyze(Tier::Simple, "collision", "rear-ended at a stop light");
        assert!(!result.covered);
        assert!(result.warnings.iter().any(|w| w.contains("upgrading")));
    }

    #[test]
    fn test_racing_short_circuits() {
        let result = analyze(Tier::Premium, "collision", "crashed during a track day");
        assert!(!result.covered);
        assert!(result.analysis[0].contains("EXCLUDED: Racing"));
        assert!(result.next_steps.is_empty());
    }

    #[test]
    fn test_rideshare_warning_does_not_deny() {
        let result = analyze(Tier::Advanced, "collision", "hit while driving for Uber");
        assert!(result.covered);
        assert!(result.warnings[0].contains("Ridesharing"));
    }

    #[test]
    fn test_premium_glass_zero_deductible() {
        let result = analyze(Tier::Premium, "windshield", "cracked windshield from gravel");
        assert!(result.covered);
        assert_eq!(result.deductible.as_deref(), Some("$0"));
    }

    #[test]
    fn test_premium_totaled_collision_mentions_gap() {
        let result = analyze(Tier::Premium, "crash", "the car was totaled on the highway");
        assert!(result.covered);
        assert!(result.analysis.iter().any(|a| a.contains("Gap Insurance")));
        assert!(result.analysis.iter().any(|a| a.contains("Rental car")));
        assert!(result.next_steps[0].contains("Concierge"));
    }

    #[test]
    fn test_rental_note_covers_all_collision_and_theft_synonyms() {
        // Rental reimbursement keys on the claim kind, so every synonym
        // of a covered collision or theft gets the same answer.
        for claim_type in ["collision", "crash", "accident", "hit", "theft", "stolen", "break-in"] {
            let result = analyze(Tier::Advanced, claim_type, "happened yesterday");
            assert!(
                result.analysis.iter().any(|a| a.contains("Rental car reimbursement")),
                "no rental note for {claim_type}"
            );
        }
        let fire = analyze(Tier::Advanced, "fire", "engine fire");
        assert!(!fire.analysis.iter().any(|a| a.contains("Rental car")));
    }

    #[test]
    fn test_unknown_claim_type_flags_manual_review() {
        let result = analyze(Tier::Advanced, "meteor strike", "a rock fell from the sky");
        assert!(!result.covered);
        assert!(result.analysis[0].contains("manual review"));
    }

    #[tokio::test]
    async fn test_tool_records_analysis_in_context() {
        let context = Context::new();
        let result = AnalyzeCoverageApplicabilityTool
            .call(
                &context,
                json!({
                    "tier": "Advanced",
                    "claim_type": "theft",
                    "claim_details": "car stolen from driveway overnight"
                }),
            )
            .await
            .unwrap();

        assert_eq!(result["covered"], true);
        assert_eq!(result["deductible"], "$500");
        assert!(context.contains_key(session_keys::COVERAGE_ANALYSIS));
    }
}
