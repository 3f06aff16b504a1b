//! Orchestration events as they arrive on the stream
//!
//! Every frame body is a JSON object discriminated by its `type` field.
//! Discriminants this crate does not know decode to [`StreamEvent::Unknown`]
//! so newer backends keep working against older clients.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::agent::{AgentName, AgentStatus};
use crate::error::RelayError;

/// Per-agent entry of a progress tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentProgress {
    pub status: AgentStatus,
    #[serde(default)]
    pub elapsed_s: Option<f64>,
}

/// A single message emitted by the orchestration backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Router picked the agents that will run next
    RouterUpdate {
        #[serde(default)]
        trace_id: String,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        goal_preview: Option<String>,
        /// Raw agent names; unknown names are tolerated here
        #[serde(default, skip_serializing_if = "Option::is_none")]
        targets: Option<Vec<String>>,
    },

    /// Liveness only
    Heartbeat {
        #[serde(default)]
        trace_id: String,
        ts: f64,
    },

    /// Periodic fan-out status of every running agent
    ProgressTick {
        #[serde(default)]
        trace_id: String,
        elapsed_s: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        /// Keyed by raw agent name; unknown names are tolerated here
        #[serde(default)]
        agents: BTreeMap<String, AgentProgress>,
    },

    AgentStart {
        #[serde(default)]
        trace_id: String,
        agent: AgentName,
    },

    AgentDone {
        #[serde(default)]
        trace_id: String,
        agent: AgentName,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        summary: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<serde_json::Value>,
    },

    AgentError {
        #[serde(default)]
        trace_id: String,
        agent: AgentName,
        error: String,
    },

    /// Whole run finished
    #[serde(rename = "done")]
    StreamDone {
        #[serde(default)]
        trace_id: String,
    },

    /// Discriminant added by a newer backend
    #[serde(other)]
    Unknown,
}

impl StreamEvent {
    /// Decode a frame body
    pub fn decode(raw: &str) -> Result<Self, RelayError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Correlation token, if the variant carries one
    pub fn trace_id(&self) -> Option<&str> {
        match self {
            StreamEvent::RouterUpdate { trace_id, .. }
            | StreamEvent::Heartbeat { trace_id, .. }
            | StreamEvent::ProgressTick { trace_id, .. }
            | StreamEvent::AgentStart { trace_id, .. }
            | StreamEvent::AgentDone { trace_id, .. }
            | StreamEvent::AgentError { trace_id, .. }
            | StreamEvent::StreamDone { trace_id } => Some(trace_id.as_str()),
            StreamEvent::Unknown => None,
        }
    }

    /// Wire discriminant
    pub fn kind(&self) -> &'static str {
        match self {
            StreamEvent::RouterUpdate { .. } => "router_update",
            StreamEvent::Heartbeat { .. } => "heartbeat",
            StreamEvent::ProgressTick { .. } => "progress_tick",
            StreamEvent::AgentStart { .. } => "agent_start",
            StreamEvent::AgentDone { .. } => "agent_done",
            StreamEvent::AgentError { .. } => "agent_error",
            StreamEvent::StreamDone { .. } => "done",
            StreamEvent::Unknown => "unknown",
        }
    }
}
