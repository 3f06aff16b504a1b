//! Agent identities and per-agent view state

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One of the fixed agent roles the orchestrator can run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentName {
    SmartProgram,
    Frontend,
    Server,
    Indexer,
    Economy,
}

/// Every agent, in display order
pub const ALL_AGENTS: [AgentName; 5] = [
    AgentName::SmartProgram,
    AgentName::Frontend,
    AgentName::Server,
    AgentName::Indexer,
    AgentName::Economy,
];

impl AgentName {
    /// Wire name (`smart_program`, ...)
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentName::SmartProgram => "smart_program",
            AgentName::Frontend => "frontend",
            AgentName::Server => "server",
            AgentName::Indexer => "indexer",
            AgentName::Economy => "economy",
        }
    }

    /// Card title
    pub fn title(&self) -> &'static str {
        match self {
            AgentName::SmartProgram => "Smart Program",
            AgentName::Frontend => "Frontend",
            AgentName::Server => "Server",
            AgentName::Indexer => "Indexer",
            AgentName::Economy => "Economy (Cost / Efficiency)",
        }
    }

    /// Lowercase label used in status lines
    pub fn label(&self) -> String {
        self.as_str().replace('_', " ")
    }
}

impl fmt::Display for AgentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_AGENTS
            .iter()
            .copied()
            .find(|agent| agent.as_str() == s)
            .ok_or_else(|| format!("unknown agent: {s}"))
    }
}

/// Lifecycle of a single agent within one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    #[default]
    Idle,
    Queued,
    Running,
    Done,
    Error,
}

impl AgentStatus {
    /// Badge text
    pub fn badge(&self) -> &'static str {
        match self {
            AgentStatus::Idle => "Idle",
            AgentStatus::Queued => "Queued",
            AgentStatus::Running => "Running",
            AgentStatus::Done => "Done",
            AgentStatus::Error => "Error",
        }
    }

    /// Queued or running
    pub fn is_working(&self) -> bool {
        matches!(self, AgentStatus::Queued | AgentStatus::Running)
    }
}

/// What the dashboard knows about one agent
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AgentViewState {
    pub status: AgentStatus,
    pub summary: Option<String>,
    pub error: Option<String>,
    pub result: Option<serde_json::Value>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Elapsed seconds reported by the backend while running
    pub live_elapsed_s: Option<f64>,
}

impl AgentViewState {
    /// Fresh idle state
    pub fn idle() -> Self {
        Self::default()
    }

    /// Wall time spent so far (or in total, once finished)
    pub fn duration(&self, now: DateTime<Utc>) -> Option<chrono::Duration> {
        let started = self.started_at?;
        let end = self.finished_at.unwrap_or(now);
        Some((end - started).max(chrono::Duration::zero()))
    }

    /// Time column text: live elapsed while running, else measured duration
    pub fn time_label(&self, now: DateTime<Utc>) -> String {
        if self.status == AgentStatus::Running {
            if let Some(live) = self.live_elapsed_s {
                return format!("{live:.1}s");
            }
        }

        match self.duration(now) {
            None => "—".to_string(),
            Some(d) => {
                let ms = d.num_milliseconds();
                if ms < 1000 {
                    format!("{ms}ms")
                } else {
                    format!("{:.1}s", ms as f64 / 1000.0)
                }
            }
        }
    }
}
