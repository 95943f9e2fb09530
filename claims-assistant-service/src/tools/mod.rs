//! Claim-processing tools exposed to the model.
//!
//! Tool names and argument schemas are the assistant's public contract
//! with the model; the lookup and analysis tools also record what they
//! found into the session context so claim progress can be reported.

pub mod assess_risk;
pub mod coverage_applicability;
pub mod coverage_details;
pub mod extract_entities;
pub mod investigation_checklist;
pub mod lookup_client;
pub mod missing_information;

pub use assess_risk::AssessRiskTool;
pub use coverage_applicability::AnalyzeCoverageApplicabilityTool;
pub use coverage_details::GetCoverageDetailsTool;
pub use extract_entities::ExtractEntitiesTool;
pub use investigation_checklist::GenerateInvestigationChecklistTool;
pub use lookup_client::{LookupClientByNameTool, LookupClientByPolicyTool};
pub use missing_information::GetMissingInformationTool;

use crate::clients::ClientDirectory;
use agent_flow::ToolRegistry;
use std::sync::Arc;

/// Context keys the tools and the session summary agree on.
pub mod session_keys {
    pub const CLAIM_REFERENCE: &str = "claim_reference";
    pub const CLIENT: &str = "client";
    pub const EXTRACTED_ENTITIES: &str = "extracted_entities";
    pub const COVERAGE_ANALYSIS: &str = "coverage_analysis";
    pub const RISK_ASSESSMENT: &str = "risk_assessment";
    pub const IMAGES_UPLOADED: &str = "images_uploaded";
}

/// Build the registry with every claims tool wired up.
pub fn claims_tool_registry(directory: Arc<ClientDirectory>) -> Arc<ToolRegistry> {
    let registry = ToolRegistry::new();
    registry.register(Arc::new(LookupClientByPolicyTool::new(directory.clone())));
    registry.register(Arc::new(LookupClientByNameTool::new(directory)));
    registry.register(Arc::new(GetCoverageDetailsTool));
    registry.register(Arc::new(AnalyzeCoverageApplicabilityTool));
    registry.register(Arc::new(ExtractEntitiesTool));
    registry.register(Arc::new(AssessRiskTool));
    registry.register(Arc::new(GenerateInvestigationChecklistTool));
    registry.register(Arc::new(GetMissingInformationTool));
    Arc::new(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_has_all_tools() {
        let directory = Arc::new(ClientDirectory::new(Vec::new()));
        let registry = claims_tool_registry(directory);
        assert_eq!(registry.len(), 8);

        let mut names: Vec<String> = registry
            .definitions()
            .into_iter()
            .map(|d| d.name)
            .collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "analyze_coverage_applicability",
                "assess_risk",
                "extract_entities",
                "generate_investigation_checklist",
                "get_coverage_details",
                "get_missing_information",
                "lookup_client_by_name",
                "lookup_client_by_policy",
            ]
        );
    }
}
