//! Goal text built from the project wizard form

use serde::{Deserialize, Serialize};

/// Answers from the "create project" wizard
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectForm {
    pub description: String,
    #[serde(default, alias = "projectType")]
    pub project_type: String,
    #[serde(default, alias = "launchStyle")]
    pub launch_style: String,
    #[serde(default, alias = "supplyModel")]
    pub supply_model: String,
    #[serde(default, alias = "liquidityBudget")]
    pub liquidity_budget: String,
    #[serde(default, alias = "governanceEnabled")]
    pub governance_enabled: bool,
}

impl ProjectForm {
    /// Goal text sent to the orchestration backend
    pub fn to_goal(&self) -> String {
        let governance = if self.governance_enabled {
            "Enabled"
        } else {
            "Disabled"
        };

        [
            "Project goal (user prompt):".to_string(),
            self.description.trim().to_string(),
            String::new(),
            "Token / Launch configuration:".to_string(),
            format!("- Project type: {}", self.project_type),
            format!("- Launch style: {}", self.launch_style),
            format!("- Supply model: {}", self.supply_model),
            format!("- Liquidity budget (USD): {}", self.liquidity_budget),
            format!("- Governance module: {governance}"),
            String::new(),
            "Deliverables:".to_string(),
            "1) Smart program(s) for Vara (Rust),".to_string(),
            "2) Frontend UI (React),".to_string(),
            "3) Server/API (FastAPI),".to_string(),
            "4) Optional indexer,".to_string(),
            "5) Economy analysis (cost/efficiency + tokenomics suggestions).".to_string(),
        ]
        .join("\n")
    }
}
