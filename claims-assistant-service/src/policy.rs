//! Static policy-tier rules for Apex Auto Assurance.
//!
//! Three tiers, fixed deductibles. These tables are the source of truth
//! the coverage tools read from; there is no per-client variation beyond
//! the tier named on the client record.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// General exclusions that apply to every tier.
pub const GENERAL_EXCLUSIONS: &[&str] = &[
    "Ridesharing (Uber, Lyft, delivery services) - unless specific endorsement purchased",
    "Intentional Acts - damage caused on purpose by the insured",
    "Racing - any loss while vehicle used on track or competitive event",
    "Wear and Tear - mechanical breakdown, rust, tire wear, electrical failure not caused by accident",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tier {
    Simple,
    Advanced,
    Premium,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Simple, Tier::Advanced, Tier::Premium];
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "simple" => Ok(Tier::Simple),
            "advanced" => Ok(Tier::Advanced),
            "premium" => Ok(Tier::Premium),
            other => Err(format!(
                "Unknown tier: {other}. Valid tiers are: Simple, Advanced, Premium"
            )),
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Simple => write!(f, "Simple"),
            Tier::Advanced => write!(f, "Advanced"),
            Tier::Premium => write!(f, "Premium"),
        }
    }
}

/// Full coverage schedule for one tier. Optional fields are only present
/// on the tiers that carry the benefit; the serialized form keeps them out
/// of tool output entirely for the other tiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageSchedule {
    pub tier_name: String,
    pub bodily_injury_liability: String,
    pub property_damage_liability: String,
    pub collision_coverage: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collision_deductible: Option<String>,
    pub comprehensive: String,
    pub comprehensive_deductible: String,
    pub uninsured_motorist: String,
    pub medical_payments: String,
    pub roadside_assistance: String,
    pub rental_car_reimbursement: String,
    pub new_car_replacement: String,
    pub personal_effects: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub glass_coverage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub windshield_repair: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gap_insurance: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oem_parts_guarantee: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pet_injury_coverage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worldwide_coverage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valet_service: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diminished_value_protection: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concierge_claims: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub restrictions: Vec<String>,
    pub covered_perils: Vec<String>,
    pub excluded_perils: Vec<String>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// The coverage schedule for a tier.
pub fn schedule(tier: Tier) -> CoverageSchedule {
    match tier {
        Tier::Simple => CoverageSchedule {
            tier_name: "Simple (Basic Liability & Catastrophe)".into(),
            bodily_injury_liability: "$25k per person / $50k per accident".into(),
            property_damage_liability: "$25,000".into(),
            collision_coverage: "Not Included".into(),
            collision_deductible: None,
            comprehensive: "Fire & Theft Only".into(),
            comprehensive_deductible: "$1,500".into(),
            uninsured_motorist: "$25k / $50k".into(),
            medical_payments: "$1,000".into(),
            roadside_assistance: "Pay-per-use".into(),
            rental_car_reimbursement: "Not Included".into(),
            new_car_replacement: "Not Included".into(),
            personal_effects: "Not Included".into(),
            glass_coverage: Some("Not covered unless caused by named peril".into()),
            windshield_repair: None,
            gap_insurance: None,
            oem_parts_guarantee: None,
            pet_injury_coverage: None,
            worldwide_coverage: None,
            valet_service: None,
            diminished_value_protection: None,
            concierge_claims: None,
            restrictions: strings(&[
                "Only designated drivers listed on policy are covered (No Permissive Use)",
                "Glass damage not covered unless caused by named peril",
            ]),
            covered_perils: strings(&["Fire", "Lightning", "Theft", "Attempted Theft"]),
            excluded_perils: strings(&[
                "Hail",
                "Flood",
                "Falling Objects",
                "Collision",
                "Vandalism",
            ]),
        },
        Tier::Advanced => CoverageSchedule {
            tier_name: "Advanced (Standard Comprehensive)".into(),
            bodily_injury_liability: "$100k per person / $300k per accident".into(),
            property_damage_liability: "$100,000".into(),
            collision_coverage: "Included ($1,000 deductible)".into(),
            collision_deductible: Some("$1,000".into()),
            comprehensive: "Full (Fire, Theft, Vandalism, Weather)".into(),
            comprehensive_deductible: "$500".into(),
            uninsured_motorist: "$100k / $300k".into(),
            medical_payments: "$5,000".into(),
            roadside_assistance: "Included (15-mile tow limit)".into(),
            rental_car_reimbursement: "$30/day (Max 30 days)".into(),
            new_car_replacement: "Not Included".into(),
            personal_effects: "Up to $200".into(),
            glass_coverage: None,
            windshield_repair: Some(
                "Chip repairs free, full replacement $100 deductible".into(),
            ),
            gap_insurance: None,
            oem_parts_guarantee: None,
            pet_injury_coverage: None,
            worldwide_coverage: None,
            valet_service: None,
            diminished_value_protection: None,
            concierge_claims: None,
            restrictions: Vec::new(),
            covered_perils: strings(&[
                "Fire",
                "Lightning",
                "Theft",
                "Attempted Theft",
                "Flood",
                "Hail",
                "Animal Strikes",
                "Vandalism",
            ]),
            excluded_perils: strings(&["Standard wear and tear"]),
        },
        Tier::Premium => CoverageSchedule {
            tier_name: "Premium (All-Inclusive Elite)".into(),
            bodily_injury_liability: "$500k per person / $1M per accident".into(),
            property_damage_liability: "$250,000".into(),
            collision_coverage: "Included ($250 deductible)".into(),
            collision_deductible: Some("$250".into()),
            comprehensive: "Full + Zero Deductible Glass".into(),
            comprehensive_deductible: "$250".into(),
            uninsured_motorist: "$500k / $1M".into(),
            medical_payments: "$25,000".into(),
            roadside_assistance: "Included (100-mile tow limit + Trip Interruption)".into(),
            rental_car_reimbursement: "$75/day (Max 45 days) or Valet Service".into(),
            new_car_replacement: "Included (First 3 Years)".into(),
            personal_effects: "Up to $1,500".into(),
            glass_coverage: Some("$0 deductible on windshield replacement".into()),
            windshield_repair: None,
            gap_insurance: Some("Included".into()),
            oem_parts_guarantee: Some("Always OEM parts, never aftermarket".into()),
            pet_injury_coverage: Some("Up to $1,000".into()),
            worldwide_coverage: Some("Up to 30 days in foreign countries".into()),
            valet_service: Some("Included".into()),
            diminished_value_protection: Some("Included".into()),
            concierge_claims: Some("24/7 Dedicated Concierge Claims Line".into()),
            restrictions: Vec::new(),
            covered_perils: strings(&["All Perils"]),
            excluded_perils: strings(&["Standard wear and tear"]),
        },
    }
}

/// Claim categories the coverage rules distinguish, parsed from the
/// free-text claim type the model supplies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimKind {
    Collision,
    Theft,
    Fire,
    Vandalism,
    Weather,
    Glass,
    BodilyInjury,
    PropertyDamage,
    UninsuredMotorist,
    AnimalStrike,
    Unknown,
}

impl ClaimKind {
    pub fn parse(claim_type: &str) -> Self {
        match claim_type.trim().to_lowercase().as_str() {
            "collision" | "crash" | "accident" | "hit" => ClaimKind::Collision,
            "theft" | "stolen" | "break-in" => ClaimKind::Theft,
            "fire" | "burn" | "arson" => ClaimKind::Fire,
            "vandalism" | "keyed" | "graffiti" => ClaimKind::Vandalism,
            "hail" | "flood" | "weather" | "storm" => ClaimKind::Weather,
            "glass" | "windshield" | "window" => ClaimKind::Glass,
            "bodily injury" | "injury" | "medical" => ClaimKind::BodilyInjury,
            "property damage" | "property" => ClaimKind::PropertyDamage,
            "uninsured" | "hit and run" => ClaimKind::UninsuredMotorist,
            "animal" | "deer" | "wildlife" => ClaimKind::AnimalStrike,
            _ => ClaimKind::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_parsing_is_lenient() {
        assert_eq!(" premium ".parse::<Tier>().unwrap(), Tier::Premium);
        assert_eq!("SIMPLE".parse::<Tier>().unwrap(), Tier::Simple);
        assert!("platinum".parse::<Tier>().is_err());
    }

    #[test]
    fn test_schedule_optional_fields() {
        let simple = schedule(Tier::Simple);
        assert!(simple.collision_deductible.is_none());
        assert!(simple.gap_insurance.is_none());
        assert_eq!(simple.restrictions.len(), 2);

        let premium = schedule(Tier::Premium);
        assert_eq!(premium.collision_deductible.as_deref(), Some("$250"));
        assert!(premium.concierge_claims.is_some());

        // Absent benefits stay out of the serialized form
        let json = serde_json::to_value(&simple).unwrap();
        assert!(json.get("gap_insurance").is_none());
        assert!(json.get("restrictions").is_some());
    }

    #[test]
    fn test_claim_kind_synonyms() {
        assert_eq!(ClaimKind::parse("Crash"), ClaimKind::Collision);
        assert_eq!(ClaimKind::parse("hit and run"), ClaimKind::UninsuredMotorist);
        assert_eq!(ClaimKind::parse("deer"), ClaimKind::AnimalStrike);
        assert_eq!(ClaimKind::parse("meteor strike"), ClaimKind::Unknown);
    }
}
