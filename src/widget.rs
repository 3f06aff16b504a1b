//! Per-agent cards derived from session state
//!
//! Pure view code: nothing here mutates the session.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::agent::{AgentName, AgentStatus, AgentViewState};
use crate::session::SessionState;

/// Main panel of a card
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardBody {
    /// Agent failed with this message
    Error(String),
    /// Pretty-printed result
    Result(String),
    /// Placeholder while there is no result
    Pending(&'static str),
}

/// Render-ready view of one agent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentCard {
    pub agent: AgentName,
    pub title: &'static str,
    pub badge: &'static str,
    pub time_label: String,
    pub summary: String,
    /// Show the working indicator
    pub working: bool,
    /// Offer the "Create PR" action
    pub pr_action: bool,
    pub body: CardBody,
}

impl AgentCard {
    pub fn from_state(
        agent: AgentName,
        state: &AgentViewState,
        pr_draft_present: bool,
        now: DateTime<Utc>,
    ) -> Self {
        let body = if let Some(error) = &state.error {
            CardBody::Error(error.clone())
        } else if let Some(result) = &state.result {
            let pretty = serde_json::to_string_pretty(result).unwrap_or_else(|_| result.to_string());
            CardBody::Result(pretty)
        } else if state.status == AgentStatus::Queued {
            CardBody::Pending("Queued…")
        } else {
            CardBody::Pending("Waiting for result…")
        };

        Self {
            agent,
            title: agent.title(),
            badge: state.status.badge(),
            time_label: state.time_label(now),
            summary: state
                .summary
                .clone()
                .unwrap_or_else(|| "No summary yet.".to_string()),
            working: state.status.is_working(),
            pr_action: agent == AgentName::SmartProgram && pr_draft_present,
            body,
        }
    }
}

impl fmt::Display for AgentCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "┌ {} [{}] {}", self.title, self.badge, self.time_label)?;
        writeln!(f, "│ {}", self.summary)?;
        if self.working {
            writeln!(f, "│ Working…")?;
        }
        if self.pr_action {
            writeln!(f, "│ PR draft ready")?;
        }
        match &self.body {
            CardBody::Error(error) => {
                writeln!(f, "│ Error:")?;
                for line in error.lines() {
                    writeln!(f, "│   {line}")?;
                }
            }
            CardBody::Result(result) => {
                for line in result.lines() {
                    writeln!(f, "│   {line}")?;
                }
            }
            CardBody::Pending(text) => writeln!(f, "│ {text}")?,
        }
        write!(f, "└")
    }
}

/// One card per agent, in store order
pub fn render_cards(state: &SessionState, now: DateTime<Utc>) -> Vec<AgentCard> {
    let has_draft = state.pr_draft.is_some();
    state
        .agents
        .iter()
        .map(|(agent, view)| AgentCard::from_state(agent, view, has_draft, now))
        .collect()
}
